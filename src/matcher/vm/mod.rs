// Module: VM
// Compiles a pattern expression source into a runnable program.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

use serde_json::Value;

use crate::matcher::MatchError;

use interpreter::{Interpreter, PredicateTable};
use lexer::Lexer;
use parser::Parser;

/// A compiled pattern program bound to its predicate table.
#[derive(Debug)]
pub struct Program {
    interpreter: Interpreter,
}

impl Program {
    pub fn run(&self, value: &Value) -> Result<(), MatchError> {
        self.interpreter.run(value)
    }
}

/// Lexes, parses and binds `source` to `table`. Compilation errors
/// surface the first parse failure.
pub fn build_program_matcher(source: &str, table: PredicateTable) -> Result<Program, MatchError> {
    let program = Parser::new(Lexer::new(source)).parse()?;
    Ok(Program {
        interpreter: Interpreter::new(program, table),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::interpreter::{Arg, PredicateFn};
    use serde_json::json;

    fn nop(_value: &Value, _args: &[Arg]) -> Result<(), MatchError> {
        Ok(())
    }

    #[test]
    fn test_build_and_run() {
        let table = PredicateTable::from([
            ("oneOf", nop as PredicateFn),
            ("contains", nop as PredicateFn),
            ("maxLength", nop as PredicateFn),
            ("startsWith", nop as PredicateFn),
            ("IsEmail", nop as PredicateFn),
        ]);
        let program = build_program_matcher(
            ".oneOf(contains(-23.6), maxLength(12), startsWith('abc')).IsEmail()",
            table,
        )
        .expect("program must build");
        assert!(program.run(&json!("anything")).is_ok());
    }

    #[test]
    fn test_build_failure_surfaces_parse_error() {
        let err = build_program_matcher(".oneOf(", PredicateTable::new()).unwrap_err();
        assert!(matches!(err, MatchError::BadToken { .. }));
    }
}
