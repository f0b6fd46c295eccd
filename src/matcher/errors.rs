//! Kinds de erro do matcher.
//!
//! Todas as camadas da linguagem de padrões (lexer, parser, interpretador,
//! predicados e o próprio dispatcher) reportam através deste enum, de modo
//! que um chamador consegue testar a identidade do erro com `matches!`
//! em vez de comparar mensagens.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    // Compilação do programa de padrão.
    /// Byte fora do alfabeto da linguagem encontrado no programa.
    #[error("illegal token '{literal}' in pattern program")]
    IllegalToken { literal: String },

    /// O lookahead do parser não bate com a gramática.
    #[error("bad token in pattern program: expected {expected}, got {got}")]
    BadToken { expected: String, got: String },

    /// Identificador não registrado na tabela de predicados.
    #[error("unknown function '{0}' in pattern program")]
    MissingFunc(String),

    // Predicados.
    #[error("{predicate}: invalid parameters: {reason}")]
    InvalidParameters {
        predicate: &'static str,
        reason: String,
    },

    #[error("provided value is not a string, got: {got}")]
    NotString { got: String },

    #[error("provided value is not a number, got: {got}")]
    NotNumber { got: String },

    #[error("provided value is not an array, got: {got}")]
    NotSlice { got: String },

    #[error("provided value is not a boolean, got: {got}")]
    NotBool { got: String },

    #[error("provided value is not a v4 uuid, got: {got}")]
    NotUuid { got: String },

    #[error("'{value}' does not start with '{prefix}'")]
    NotStartsWith { value: String, prefix: String },

    #[error("'{value}' does not end with '{suffix}'")]
    NotEndsWith { value: String, suffix: String },

    #[error("'{value}' does not contain '{needle}'")]
    NotContains { value: String, needle: String },

    #[error("'{value}' contains '{needle}' but should not")]
    Contains { value: String, needle: String },

    #[error("'{0}' is not a datetime")]
    NotDateTime(String),

    #[error("'{0}' is not an email")]
    NotEmail(String),

    #[error("'{0}' is not an absolute url")]
    NotUrl(String),

    #[error("'{0}' is not empty")]
    NotEmpty(String),

    #[error("the provided string is empty")]
    Empty,

    #[error("'{value}' does not match regex '{regex}'")]
    NotMatchRegex { value: String, regex: String },

    #[error("invalid regex '{0}'")]
    InvalidRegex(String),

    /// `greaterThan` falhou: o valor é menor do que deveria.
    #[error("{got} is lower than {limit}")]
    GreaterThan { got: f64, limit: f64 },

    /// `lowerThan` falhou: o valor é maior do que deveria.
    #[error("{got} is greater than {limit}")]
    LowerThan { got: f64, limit: f64 },

    #[error("'{value}' is not before '{reference}'")]
    DateBefore { value: String, reference: String },

    #[error("'{value}' is not after '{reference}'")]
    DateAfter { value: String, reference: String },

    #[error("none of the alternatives given to oneOf matched")]
    OneOf,

    // Dispatcher.
    #[error("invalid pattern '{0}'")]
    InvalidPattern(String),

    #[error("provided value is not what was expected: got {got}, want {want}")]
    InvalidValue { got: String, want: String },

    #[error("unhandled expected value type: {0}")]
    UnhandledType(String),
}
