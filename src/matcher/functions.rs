//! # Biblioteca de Predicados
//!
//! Implementa as funções embutidas da linguagem de padrões. Todos os
//! predicados compartilham a mesma assinatura (`PredicateFn`): recebem o
//! valor sob teste e os argumentos já avaliados pelo interpretador, e
//! devolvem `Ok(())` ou o `MatchError` que descreve a violação.
//!
//! ## Regras comuns:
//!
//! - Cada predicado valida sua própria aridade e o tipo do valor.
//! - Argumentos literais chegam como strings cruas (números inclusive).
//! - Argumentos aninhados chegam como o resultado do predicado interno,
//!   o que permite combinadores como `oneOf` inspecionarem os filhos.
//! - Violações de aridade/tipo de argumento são sempre
//!   `InvalidParameters`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::vm::interpreter::Arg;
use super::MatchError;

// ============================================================================
// REGEX FIXAS
// ============================================================================

// Regex de email quase-RFC5322 (localpart/domínio); tratada como bytes
// fixos, não edite.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])"#,
    )
    .expect("valid email regex")
});

// ============================================================================
// HELPERS DE TIPO E ARIDADE
// ============================================================================

fn subject_string(value: &Value) -> Result<&str, MatchError> {
    value.as_str().ok_or_else(|| MatchError::NotString {
        got: value.to_string(),
    })
}

// Aceita números json de 64 bits e strings numéricas.
fn subject_number(value: &Value) -> Result<f64, MatchError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| MatchError::NotNumber {
        got: value.to_string(),
    })
}

fn expect_arity(predicate: &'static str, args: &[Arg], want: usize) -> Result<(), MatchError> {
    if args.len() != want {
        return Err(MatchError::InvalidParameters {
            predicate,
            reason: format!("want {} parameters, got {}", want, args.len()),
        });
    }
    Ok(())
}

fn literal_arg<'a>(
    predicate: &'static str,
    args: &'a [Arg],
    index: usize,
) -> Result<&'a str, MatchError> {
    match args.get(index) {
        Some(Arg::Literal(literal)) => Ok(literal),
        _ => Err(MatchError::InvalidParameters {
            predicate,
            reason: format!("param {} must be a literal", index),
        }),
    }
}

/// Formatos aceitos, na ordem: `%Y-%m-%dT%H:%M:%S%z` (offset numérico,
/// `+0000` inclusive), data simples `%Y-%m-%d` e RFC 3339. O primeiro
/// que parsear vence.
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

// Um argumento: instante absoluto. Dois argumentos: `now + n * unidade`.
fn reference_time(predicate: &'static str, args: &[Arg]) -> Result<DateTime<Utc>, MatchError> {
    match args.len() {
        1 => {
            let literal = literal_arg(predicate, args, 0)?;
            parse_datetime(literal).ok_or_else(|| MatchError::NotDateTime(literal.to_string()))
        }
        2 => {
            let count = literal_arg(predicate, args, 0)?;
            let unit = literal_arg(predicate, args, 1)?;
            let count: i64 = count.parse().map_err(|_| MatchError::InvalidParameters {
                predicate,
                reason: format!("cannot parse '{}' as an integer", count),
            })?;
            let offset = match unit {
                "day" => Duration::days(count),
                _ => {
                    return Err(MatchError::InvalidParameters {
                        predicate,
                        reason: format!("unknown unit '{}'", unit),
                    });
                }
            };
            Ok(Utc::now() + offset)
        }
        n => Err(MatchError::InvalidParameters {
            predicate,
            reason: format!("want 1 or 2 parameters, got {}", n),
        }),
    }
}

// ============================================================================
// PREDICADOS DE STRING
// ============================================================================

pub(crate) fn starts_with(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("startsWith", args, 1)?;
    let prefix = literal_arg("startsWith", args, 0)?;
    if !subject.starts_with(prefix) {
        return Err(MatchError::NotStartsWith {
            value: subject.to_string(),
            prefix: prefix.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn ends_with(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("endsWith", args, 1)?;
    let suffix = literal_arg("endsWith", args, 0)?;
    if !subject.ends_with(suffix) {
        return Err(MatchError::NotEndsWith {
            value: subject.to_string(),
            suffix: suffix.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn contains(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("contains", args, 1)?;
    let needle = literal_arg("contains", args, 0)?;
    if !subject.contains(needle) {
        return Err(MatchError::NotContains {
            value: subject.to_string(),
            needle: needle.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn not_contains(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("notContains", args, 1)?;
    let needle = literal_arg("notContains", args, 0)?;
    if subject.contains(needle) {
        return Err(MatchError::Contains {
            value: subject.to_string(),
            needle: needle.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn is_url(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("isUrl", args, 0)?;
    // Url::parse só aceita URIs absolutas, que é o contrato aqui.
    if Url::parse(subject).is_err() {
        return Err(MatchError::NotUrl(subject.to_string()));
    }
    Ok(())
}

pub(crate) fn is_date_time(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("isDateTime", args, 0)?;
    if parse_datetime(subject).is_none() {
        return Err(MatchError::NotDateTime(subject.to_string()));
    }
    Ok(())
}

pub(crate) fn is_email(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("isEmail", args, 0)?;
    if !EMAIL_RE.is_match(subject) {
        return Err(MatchError::NotEmail(subject.to_string()));
    }
    Ok(())
}

pub(crate) fn is_empty(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("isEmpty", args, 0)?;
    if !subject.is_empty() {
        return Err(MatchError::NotEmpty(subject.to_string()));
    }
    Ok(())
}

pub(crate) fn is_not_empty(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("isNotEmpty", args, 0)?;
    if subject.is_empty() {
        return Err(MatchError::Empty);
    }
    Ok(())
}

pub(crate) fn match_regex(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    expect_arity("matchRegex", args, 1)?;
    let source = literal_arg("matchRegex", args, 0)?;
    let regex = Regex::new(source).map_err(|_| MatchError::InvalidRegex(source.to_string()))?;
    if !regex.is_match(subject) {
        return Err(MatchError::NotMatchRegex {
            value: subject.to_string(),
            regex: source.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn before(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    let instant =
        parse_datetime(subject).ok_or_else(|| MatchError::NotDateTime(subject.to_string()))?;
    let reference = reference_time("before", args)?;
    if instant >= reference {
        return Err(MatchError::DateBefore {
            value: subject.to_string(),
            reference: reference.to_rfc3339(),
        });
    }
    Ok(())
}

pub(crate) fn after(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_string(value)?;
    let instant =
        parse_datetime(subject).ok_or_else(|| MatchError::NotDateTime(subject.to_string()))?;
    let reference = reference_time("after", args)?;
    if instant <= reference {
        return Err(MatchError::DateAfter {
            value: subject.to_string(),
            reference: reference.to_rfc3339(),
        });
    }
    Ok(())
}

// ============================================================================
// PREDICADOS NUMÉRICOS
// ============================================================================

fn numeric_limit(predicate: &'static str, args: &[Arg]) -> Result<f64, MatchError> {
    expect_arity(predicate, args, 1)?;
    let literal = literal_arg(predicate, args, 0)?;
    literal.parse().map_err(|_| MatchError::InvalidParameters {
        predicate,
        reason: format!("cannot parse '{}' as a float", literal),
    })
}

pub(crate) fn greater_than(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_number(value)?;
    let limit = numeric_limit("greaterThan", args)?;
    if subject < limit {
        return Err(MatchError::GreaterThan {
            got: subject,
            limit,
        });
    }
    Ok(())
}

pub(crate) fn lower_than(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let subject = subject_number(value)?;
    let limit = numeric_limit("lowerThan", args)?;
    if subject > limit {
        return Err(MatchError::LowerThan {
            got: subject,
            limit,
        });
    }
    Ok(())
}

// ============================================================================
// PREDICADOS DE ARRAY
// ============================================================================

/// Aplica o matcher recursivamente a cada elemento do array; o primeiro
/// elemento que falhar encerra.
pub(crate) fn repeat(value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    let items = value.as_array().ok_or_else(|| MatchError::NotSlice {
        got: value.to_string(),
    })?;
    expect_arity("repeat", args, 1)?;
    let pattern = Value::String(literal_arg("repeat", args, 0)?.to_string());
    for item in items {
        super::match_values(item, &pattern)?;
    }
    Ok(())
}

// ============================================================================
// COMBINADOR
// ============================================================================

/// Recebe os filhos já avaliados: passa se pelo menos um deles passou.
/// Um filho literal é erro de programação do padrão.
pub(crate) fn one_of(_value: &Value, args: &[Arg]) -> Result<(), MatchError> {
    for (index, arg) in args.iter().enumerate() {
        match arg {
            Arg::Outcome(None) => return Ok(()),
            Arg::Outcome(Some(_)) => {}
            Arg::Literal(literal) => {
                return Err(MatchError::InvalidParameters {
                    predicate: "oneOf",
                    reason: format!("argument {} must be a function, got '{}'", index, literal),
                });
            }
        }
    }
    Err(MatchError::OneOf)
}

// ============================================================================
// TESTES
// ============================================================================
