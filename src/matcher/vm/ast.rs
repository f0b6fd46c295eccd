// Module: AST
// Sum type for compiled pattern programs. `dump` renders the canonical
// tab-indented representation used by the parser tests.

use super::token::Token;

const INDENT_STEP: &str = "\t";

/// A call argument: either a literal (number or string, kept raw) or a
/// nested call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Value(Token),
    Call(Call),
}

impl Node {
    pub fn dump(&self, indent: &str) -> String {
        match self {
            Node::Value(token) => format!("{}Value {}\n", indent, token.literal),
            Node::Call(call) => call.dump(indent),
        }
    }
}

/// One `identifier(args...)` invocation. A compiled program is an ordered
/// sequence of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: Token,
    pub args: Vec<Node>,
}

impl Call {
    pub fn dump(&self, indent: &str) -> String {
        let mut out = format!("{}Function {}\n", indent, self.name.literal);
        let deeper = format!("{}{}", indent, INDENT_STEP);
        for arg in &self.args {
            out.push_str(&arg.dump(&deeper));
        }
        out
    }
}
