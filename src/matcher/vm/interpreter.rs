// Module: Interpreter
// Runs a compiled program against a value through an injected predicate
// table. Nested calls are not composed as booleans: their evaluated
// outcome is handed to the parent as an argument, so combinators like
// oneOf can inspect "did this child succeed" without rerunning it.

use std::collections::HashMap;

use serde_json::Value;

use crate::matcher::MatchError;

use super::ast::{Call, Node};

/// Argument handed to a predicate.
#[derive(Debug)]
pub enum Arg {
    /// A raw literal from the program source (numbers stay unparsed).
    Literal(String),
    /// The evaluated result of a nested call; `None` means it succeeded.
    Outcome(Option<MatchError>),
}

pub type PredicateFn = fn(&Value, &[Arg]) -> Result<(), MatchError>;
pub type PredicateTable = HashMap<&'static str, PredicateFn>;

#[derive(Debug)]
pub struct Interpreter {
    program: Vec<Call>,
    table: PredicateTable,
}

impl Interpreter {
    pub fn new(program: Vec<Call>, table: PredicateTable) -> Self {
        Self { program, table }
    }

    /// Executes the top-level calls left to right, stopping at the first
    /// failure.
    pub fn run(&self, value: &Value) -> Result<(), MatchError> {
        for call in &self.program {
            self.run_call(value, call)?;
        }
        Ok(())
    }

    fn run_call(&self, value: &Value, call: &Call) -> Result<(), MatchError> {
        let predicate = self
            .table
            .get(call.name.literal.as_str())
            .ok_or_else(|| MatchError::MissingFunc(call.name.literal.clone()))?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match arg {
                Node::Value(token) => args.push(Arg::Literal(token.literal.clone())),
                Node::Call(inner) => args.push(Arg::Outcome(self.run_call(value, inner).err())),
            }
        }
        predicate(value, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::vm::lexer::Lexer;
    use crate::matcher::vm::parser::Parser;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn nop(_value: &Value, _args: &[Arg]) -> Result<(), MatchError> {
        Ok(())
    }

    fn failing(_value: &Value, _args: &[Arg]) -> Result<(), MatchError> {
        Err(MatchError::OneOf)
    }

    fn counting(_value: &Value, _args: &[Arg]) -> Result<(), MatchError> {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    // Succeeds only when its single argument is a nested call outcome.
    fn not(_value: &Value, args: &[Arg]) -> Result<(), MatchError> {
        match args {
            [Arg::Outcome(Some(_))] => Ok(()),
            [Arg::Outcome(None)] => Err(MatchError::OneOf),
            _ => Err(MatchError::InvalidParameters {
                predicate: "not",
                reason: "want exactly one function argument".to_string(),
            }),
        }
    }

    fn interpret(source: &str, table: PredicateTable) -> Result<(), MatchError> {
        let program = Parser::new(Lexer::new(source)).parse().expect("must parse");
        Interpreter::new(program, table).run(&json!("subject"))
    }

    #[test]
    fn test_run_all_calls_in_order() {
        let table = PredicateTable::from([("a", nop as PredicateFn), ("b", nop as PredicateFn)]);
        assert!(interpret(".a().b()", table).is_ok());
    }

    #[test]
    fn test_missing_function() {
        let err = interpret(".unknown()", PredicateTable::new()).unwrap_err();
        assert_eq!(err, MatchError::MissingFunc("unknown".to_string()));
    }

    #[test]
    fn test_short_circuit_on_first_failure() {
        CALLS.store(0, Ordering::SeqCst);
        let table = PredicateTable::from([
            ("fails", failing as PredicateFn),
            ("counts", counting as PredicateFn),
        ]);
        let err = interpret(".fails().counts()", table).unwrap_err();
        assert_eq!(err, MatchError::OneOf);
        assert_eq!(CALLS.load(Ordering::SeqCst), 0, "counts must never run");
    }

    #[test]
    fn test_nested_call_result_is_passed_as_argument() {
        let table = PredicateTable::from([
            ("not", not as PredicateFn),
            ("fails", failing as PredicateFn),
            ("nop", nop as PredicateFn),
        ]);
        // Inner failure makes `not` succeed.
        assert!(interpret(".not(fails())", table.clone()).is_ok());
        // Inner success makes `not` fail.
        assert!(interpret(".not(nop())", table.clone()).is_err());
        // A literal argument is a caller mistake.
        let err = interpret(".not(12)", table).unwrap_err();
        assert!(matches!(err, MatchError::InvalidParameters { .. }));
    }
}
