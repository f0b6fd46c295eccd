//! # Matcher - Dispatcher de Padrões
//!
//! Classifica o valor esperado e decide como compará-lo com o valor real:
//!
//! 1. **Esperado não é string** → igualdade literal.
//! 2. **String sem o formato `@...@...@`** (menos de três pedaços ao
//!    dividir por `@`) → igualdade literal com a string.
//! 3. **Primeiro pedaço não vazio** → padrão de texto interpolado: cada
//!    placeholder `@tipo@` vira seu regex equivalente, o resto é
//!    escapado, e o regex roda sobre o sujeito inteiro (não ancorado).
//! 4. **Primeiro pedaço vazio** → padrão tipado: o segundo pedaço é a
//!    tag de tipo e o resto é um programa executado pelo interpretador
//!    com a tabela de predicados daquele tipo.
//!
//! A regra de desambiguação é só essa; nenhuma camada abaixo tenta um
//! segundo parse.

pub mod errors;
pub mod functions;
pub mod vm;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub use errors::MatchError;

use vm::interpreter::{PredicateFn, PredicateTable};

// ============================================================================
// REGEX FIXAS
// ============================================================================

const UUID_V4_PATTERN: &str =
    "[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-4[a-fA-F0-9]{3}-[89abAB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}";

static UUID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", UUID_V4_PATTERN)).expect("valid uuid regex"));

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("@(string|number|double|integer|uuid)@").expect("valid placeholder regex"));

// ============================================================================
// PONTO DE ENTRADA
// ============================================================================

/// Compara um valor decodificado com um valor esperado, que pode ser um
/// literal ou um padrão.
pub fn match_values(actual: &Value, expected: &Value) -> Result<(), MatchError> {
    match expected.as_str() {
        Some(pattern) => match_pattern(actual, pattern),
        None => match_literal(actual, expected),
    }
}

fn match_literal(actual: &Value, expected: &Value) -> Result<(), MatchError> {
    if matches!(expected, Value::Object(_) | Value::Array(_)) {
        // Containers são assunto do comparator, não do matcher.
        return Err(MatchError::UnhandledType(expected.to_string()));
    }
    if actual != expected {
        return Err(MatchError::InvalidValue {
            got: actual.to_string(),
            want: expected.to_string(),
        });
    }
    Ok(())
}

fn match_pattern(actual: &Value, pattern: &str) -> Result<(), MatchError> {
    let pieces: Vec<&str> = pattern.split('@').collect();
    if pieces.len() < 3 {
        return match_literal(actual, &Value::String(pattern.to_string()));
    }
    if !pieces[0].is_empty() {
        return match_interpolated(actual, pattern);
    }

    let program = pieces[2..].join("@");
    match pieces[1] {
        "string" => match_string(actual, &program),
        "number" | "double" | "integer" => match_number(actual, &program),
        "boolean" => match_bool(actual),
        "uuid" => match_uuid(actual),
        "array" => match_array(actual, &program),
        _ => Err(MatchError::InvalidPattern(pattern.to_string())),
    }
}

// ============================================================================
// PADRÕES INTERPOLADOS
// ============================================================================

fn placeholder_regex(tag: &str) -> &'static str {
    match tag {
        "number" | "double" => r"-?\d+(?:\.\d+)?",
        "integer" => r"-?\d+",
        "uuid" => UUID_V4_PATTERN,
        // "string" e qualquer coisa que PLACEHOLDER_RE deixasse passar.
        _ => ".+",
    }
}

fn match_interpolated(actual: &Value, pattern: &str) -> Result<(), MatchError> {
    let subject = actual.as_str().ok_or_else(|| MatchError::NotString {
        got: actual.to_string(),
    })?;

    let mut source = String::with_capacity(pattern.len());
    let mut last = 0;
    for captures in PLACEHOLDER_RE.captures_iter(pattern) {
        let whole = captures.get(0).expect("group 0 always present");
        source.push_str(&regex::escape(&pattern[last..whole.start()]));
        source.push_str(placeholder_regex(&captures[1]));
        last = whole.end();
    }
    source.push_str(&regex::escape(&pattern[last..]));

    let regex =
        Regex::new(&source).map_err(|_| MatchError::InvalidPattern(pattern.to_string()))?;
    if !regex.is_match(subject) {
        return Err(MatchError::InvalidValue {
            got: subject.to_string(),
            want: pattern.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// PADRÕES TIPADOS
// ============================================================================
// Um programa vazio depois da tag significa "só cheque o tipo".

fn match_string(actual: &Value, program: &str) -> Result<(), MatchError> {
    if !actual.is_string() {
        return Err(MatchError::NotString {
            got: actual.to_string(),
        });
    }
    if program.is_empty() {
        return Ok(());
    }
    vm::build_program_matcher(program, string_table())?.run(actual)
}

fn match_number(actual: &Value, program: &str) -> Result<(), MatchError> {
    let is_numeric = match actual {
        Value::Number(n) => n.as_f64().is_some(),
        Value::String(s) => s.parse::<f64>().is_ok(),
        _ => false,
    };
    if !is_numeric {
        return Err(MatchError::NotNumber {
            got: actual.to_string(),
        });
    }
    if program.is_empty() {
        return Ok(());
    }
    vm::build_program_matcher(program, number_table())?.run(actual)
}

fn match_bool(actual: &Value) -> Result<(), MatchError> {
    if !actual.is_boolean() {
        return Err(MatchError::NotBool {
            got: actual.to_string(),
        });
    }
    Ok(())
}

fn match_uuid(actual: &Value) -> Result<(), MatchError> {
    let not_uuid = || MatchError::NotUuid {
        got: actual.to_string(),
    };
    let subject = actual.as_str().ok_or_else(not_uuid)?;
    if !UUID_RE.is_match(subject) {
        return Err(not_uuid());
    }
    Ok(())
}

fn match_array(actual: &Value, program: &str) -> Result<(), MatchError> {
    if !actual.is_array() {
        return Err(MatchError::NotSlice {
            got: actual.to_string(),
        });
    }
    if program.is_empty() {
        return Ok(());
    }
    vm::build_program_matcher(program, array_table())?.run(actual)
}

// ============================================================================
// TABELAS DE PREDICADOS POR TIPO
// ============================================================================

fn string_table() -> PredicateTable {
    PredicateTable::from([
        ("startsWith", functions::starts_with as PredicateFn),
        ("endsWith", functions::ends_with as PredicateFn),
        ("contains", functions::contains as PredicateFn),
        ("notContains", functions::not_contains as PredicateFn),
        ("isUrl", functions::is_url as PredicateFn),
        ("isDateTime", functions::is_date_time as PredicateFn),
        ("isEmail", functions::is_email as PredicateFn),
        ("isEmpty", functions::is_empty as PredicateFn),
        ("isNotEmpty", functions::is_not_empty as PredicateFn),
        ("matchRegex", functions::match_regex as PredicateFn),
        ("before", functions::before as PredicateFn),
        ("after", functions::after as PredicateFn),
        ("oneOf", functions::one_of as PredicateFn),
    ])
}

fn number_table() -> PredicateTable {
    PredicateTable::from([
        ("greaterThan", functions::greater_than as PredicateFn),
        ("lowerThan", functions::lower_than as PredicateFn),
        ("oneOf", functions::one_of as PredicateFn),
    ])
}

fn array_table() -> PredicateTable {
    PredicateTable::from([("repeat", functions::repeat as PredicateFn)])
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_string_expected_compares_by_equality() {
        assert!(match_values(&json!(42.0), &json!(42.0)).is_ok());
        assert!(match_values(&json!(true), &json!(true)).is_ok());
        assert!(matches!(
            match_values(&json!(42.0), &json!(43.0)),
            Err(MatchError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_plain_string_expected_compares_by_equality() {
        assert!(match_values(&json!("hello"), &json!("hello")).is_ok());
        // One '@' gives two pieces: still a literal.
        assert!(match_values(&json!("a@b"), &json!("a@b")).is_ok());
        assert!(matches!(
            match_values(&json!("hello"), &json!("world")),
            Err(MatchError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_string_type_check() {
        assert!(match_values(&json!("Bonjour !"), &json!("@string@")).is_ok());
        assert!(matches!(
            match_values(&json!(12.0), &json!("@string@")),
            Err(MatchError::NotString { .. })
        ));
    }

    #[test]
    fn test_number_type_check() {
        assert!(match_values(&json!(12.5), &json!("@number@")).is_ok());
        assert!(match_values(&json!("12.5"), &json!("@integer@")).is_ok());
        assert!(matches!(
            match_values(&json!("Bonjour !"), &json!("@number@")),
            Err(MatchError::NotNumber { .. })
        ));
    }

    #[test]
    fn test_boolean_type_check() {
        assert!(match_values(&json!(false), &json!("@boolean@")).is_ok());
        assert!(matches!(
            match_values(&json!("false"), &json!("@boolean@")),
            Err(MatchError::NotBool { .. })
        ));
    }

    #[test]
    fn test_uuid_type_check() {
        assert!(
            match_values(&json!("c7d3d4f5-25b5-4b80-9526-4e22e5f07c4e"), &json!("@uuid@")).is_ok()
        );
        // v1 uuid: version nibble is not 4.
        assert!(matches!(
            match_values(&json!("c7d3d4f5-25b5-1b80-9526-4e22e5f07c4e"), &json!("@uuid@")),
            Err(MatchError::NotUuid { .. })
        ));
        assert!(matches!(
            match_values(&json!(12.0), &json!("@uuid@")),
            Err(MatchError::NotUuid { .. })
        ));
    }

    #[test]
    fn test_array_tag() {
        assert!(match_values(&json!([1, 2]), &json!("@array@")).is_ok());
        assert!(match_values(&json!([1.0, 2.0]), &json!("@array@.repeat('@number@')")).is_ok());
        assert!(matches!(
            match_values(&json!("x"), &json!("@array@")),
            Err(MatchError::NotSlice { .. })
        ));
        assert!(matches!(
            match_values(&json!([1.0, "x"]), &json!("@array@.repeat('@number@')")),
            Err(MatchError::NotNumber { .. })
        ));
    }

    #[test]
    fn test_unknown_tag_is_an_invalid_pattern() {
        assert!(matches!(
            match_values(&json!("x"), &json!("@frobnicate@")),
            Err(MatchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_string_program() {
        assert!(
            match_values(&json!("jean.dupont@example.com"), &json!("@string@.isEmail()")).is_ok()
        );
        assert!(matches!(
            match_values(&json!("nope"), &json!("@string@.isEmail()")),
            Err(MatchError::NotEmail(_))
        ));
    }

    #[test]
    fn test_string_program_chains_short_circuit() {
        let err = match_values(
            &json!("2020-07-24T08:11:55.537Z"),
            &json!("@string@.isDateTime().before('2020-07-24T06:11:55.537Z')"),
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::DateBefore { .. }));
    }

    #[test]
    fn test_string_one_of() {
        let pattern = json!("@string@.oneOf(contains('abc'), startsWith('x'))");
        assert!(match_values(&json!("xyz"), &pattern).is_ok());
        assert!(match_values(&json!("zabcz"), &pattern).is_ok());
        assert!(matches!(
            match_values(&json!("nope"), &pattern),
            Err(MatchError::OneOf)
        ));
    }

    #[test]
    fn test_number_program() {
        assert!(match_values(&json!(12.0), &json!("@number@.greaterThan(10)")).is_ok());
        assert!(matches!(
            match_values(&json!(9.0), &json!("@number@.greaterThan(10)")),
            Err(MatchError::GreaterThan { .. })
        ));
    }

    #[test]
    fn test_program_with_unknown_function() {
        assert!(matches!(
            match_values(&json!(9.0), &json!("@number@.isEmail()")),
            Err(MatchError::MissingFunc(_))
        ));
    }

    #[test]
    fn test_interpolated_pattern() {
        let pattern = json!("id=@integer@ name=@string@");
        assert!(match_values(&json!("id=42 name=jean"), &pattern).is_ok());
        assert!(matches!(
            match_values(&json!("id=abc name=jean"), &pattern),
            Err(MatchError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_interpolated_pattern_is_unanchored() {
        // The pattern matches anywhere inside the subject.
        assert!(match_values(&json!("...id=42..."), &json!("id=@integer@")).is_ok());
    }

    #[test]
    fn test_interpolated_pattern_escapes_the_rest() {
        // '+' must be literal, not a regex quantifier.
        assert!(match_values(&json!("1+1=@integer@x"), &json!("1+1=@integer@x")).is_err());
        assert!(match_values(&json!("1+1=2x"), &json!("1+1=@integer@x")).is_ok());
    }

    #[test]
    fn test_interpolated_uuid_placeholder() {
        let pattern = json!("/users/@uuid@/profile");
        assert!(match_values(
            &json!("/users/c7d3d4f5-25b5-4b80-9526-4e22e5f07c4e/profile"),
            &pattern
        )
        .is_ok());
        assert!(match_values(&json!("/users/42/profile"), &pattern).is_err());
    }

    #[test]
    fn test_interpolated_subject_must_be_string() {
        assert!(matches!(
            match_values(&json!(42.0), &json!("id=@integer@")),
            Err(MatchError::NotString { .. })
        ));
    }

    #[test]
    fn test_expected_container_is_unhandled_here() {
        assert!(matches!(
            match_values(&json!("x"), &json!({"a": 1})),
            Err(MatchError::UnhandledType(_))
        ));
    }
}
