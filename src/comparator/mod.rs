//! # Comparator - Comparação Estrutural de JSON
//!
//! Compara recursivamente o corpo decodificado de uma resposta com a
//! árvore esperada, delegando cada folha ao matcher de padrões.
//!
//! ## O que este módulo faz?
//!
//! 1. **Mapas**: toda chave esperada deve existir no real (chaves com
//!    prefixo `?` são opcionais) e o real não pode ter chave extra.
//! 2. **Sequências**: viram mapas indexados por decimal e recaem no
//!    caso 1.
//! 3. **Recurso externo**: um array real comparado com uma string
//!    esperada carrega `<nome>.json` e exige que cada elemento case com
//!    o documento carregado.
//! 4. **Folhas**: delegadas ao matcher; a sintaxe `#nome={{payload}}`
//!    captura o valor real sob `nome` e casa contra `payload`.
//!
//! Todo erro sai embrulhado em `ComparatorError` com o caminho
//! percorrido até a falha (`at 'key.[recurso].1.subkey' : ...`). O
//! caminho é uma pilha: empilha antes de descer, desempilha em toda
//! saída limpa, e o erro materializa uma cópia estável da pilha.
//!
//! A comparação aborta na primeira falha; não há lista acumulada.

pub mod fileloader;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::matcher::{self, MatchError};

use fileloader::ResourceError;

// ============================================================================
// ERROS
// ============================================================================

/// Causa de uma falha de comparação.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareErrorKind {
    #[error("a key present in the expected json is missing in the content json: {0}")]
    MissingKey(String),

    #[error("a key should not be present in the content json: {0}")]
    ExtraKey(String),

    #[error("content does not match the pattern: {0}")]
    NotMatching(MatchError),

    #[error("actual type is not the expected one: got {got}, want {want}")]
    TypeNotMatching {
        got: &'static str,
        want: &'static str,
    },

    #[error("cannot load external resource '{name}': {reason}")]
    ResourceNotFound { name: String, reason: String },
}

/// Falha de comparação qualificada pelo caminho até o ponto da falha.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparatorError {
    pub path: Vec<String>,
    pub kind: CompareErrorKind,
}

impl fmt::Display for ComparatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at '{}' : {}", self.path.join("."), self.kind)
    }
}

impl std::error::Error for ComparatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CompareErrorKind::NotMatching(cause) => Some(cause),
            _ => None,
        }
    }
}

// ============================================================================
// COMPARATOR
// ============================================================================

pub type LoadExternalResource = Box<dyn Fn(&str) -> Result<Value, ResourceError> + Send + Sync>;

// Sintaxe de captura nas folhas esperadas: #nome={{payload}}.
static CAPTURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\#(.*?)=\{\{(.*?)\}\}").expect("valid capture regex"));

pub struct Comparator {
    load_external: LoadExternalResource,
    captured: HashMap<String, Value>,
    path: Vec<String>,
}

impl Comparator {
    /// Comparator de produção: recursos externos são resolvidos em
    /// `<group_dir>/responses/<nome>.json`.
    pub fn new(group_dir: impl Into<PathBuf>) -> Self {
        Self::with_loader(fileloader::file_loader(group_dir.into().join("responses")))
    }

    pub fn with_loader(load_external: LoadExternalResource) -> Self {
        Self {
            load_external,
            captured: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Esvazia o mapa de capturas. Deve ser chamado no início de cada
    /// teste unitário para evitar contaminação entre testes.
    pub fn reset(&mut self) {
        self.captured.clear();
    }

    pub fn captured(&self) -> &HashMap<String, Value> {
        &self.captured
    }

    /// Registra uma captura vinda de fora da comparação (grupos pcre).
    pub fn record_capture(&mut self, name: impl Into<String>, value: Value) {
        self.captured.insert(name.into(), value);
    }

    pub fn compare(&mut self, actual: &Value, expected: &Value) -> Result<(), ComparatorError> {
        match (actual, expected) {
            (Value::Object(a), Value::Object(e)) => self.compare_maps(a, e),
            (Value::Array(a), Value::Array(e)) => {
                self.compare_maps(&index_map(a), &index_map(e))
            }
            (Value::Array(a), Value::String(name)) => {
                self.compare_with_external_resource(a, name)
            }
            (Value::Object(_), _)
            | (_, Value::Object(_))
            | (Value::Array(_), _)
            | (_, Value::Array(_)) => Err(self.error(CompareErrorKind::TypeNotMatching {
                got: kind_of(actual),
                want: kind_of(expected),
            })),
            _ => self.match_and_capture(actual, expected),
        }
    }

    fn compare_maps(
        &mut self,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
    ) -> Result<(), ComparatorError> {
        self.check_expected_keys(actual, expected)?;
        self.check_extra_keys(actual, expected)
    }

    fn check_expected_keys(
        &mut self,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
    ) -> Result<(), ComparatorError> {
        for (key, expected_value) in expected {
            self.path.push(key.clone());
            let (real_key, optional) = match key.strip_prefix('?') {
                Some(rest) if !rest.is_empty() => (rest, true),
                _ => (key.as_str(), false),
            };
            match actual.get(real_key) {
                Some(actual_value) => self.compare(actual_value, expected_value)?,
                None if optional => {}
                None => {
                    return Err(self.error(CompareErrorKind::MissingKey(real_key.to_string())));
                }
            }
            self.path.pop();
        }
        Ok(())
    }

    fn check_extra_keys(
        &mut self,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
    ) -> Result<(), ComparatorError> {
        for key in actual.keys() {
            self.path.push(key.clone());
            if !expected.contains_key(key) && !expected.contains_key(&format!("?{}", key)) {
                return Err(self.error(CompareErrorKind::ExtraKey(key.clone())));
            }
            self.path.pop();
        }
        Ok(())
    }

    fn compare_with_external_resource(
        &mut self,
        actual: &[Value],
        name: &str,
    ) -> Result<(), ComparatorError> {
        let loaded = (self.load_external)(name);
        self.path.push(format!("[{}]", name));
        let expected = loaded.map_err(|err| {
            self.error(CompareErrorKind::ResourceNotFound {
                name: name.to_string(),
                reason: err.to_string(),
            })
        })?;
        for (index, item) in actual.iter().enumerate() {
            self.path.push(index.to_string());
            self.compare(item, &expected)?;
            self.path.pop();
        }
        self.path.pop();
        Ok(())
    }

    fn match_and_capture(
        &mut self,
        actual: &Value,
        expected: &Value,
    ) -> Result<(), ComparatorError> {
        let (name, effective) = split_capture(expected);
        matcher::match_values(actual, &effective)
            .map_err(|err| self.error(CompareErrorKind::NotMatching(err)))?;
        if let Some(name) = name {
            self.captured.insert(name, actual.clone());
        }
        Ok(())
    }

    fn error(&self, kind: CompareErrorKind) -> ComparatorError {
        ComparatorError {
            path: self.path.clone(),
            kind,
        }
    }
}

// Se a folha esperada usa a sintaxe de captura, devolve o nome (quando
// não vazio) e troca o esperado pelo payload interno.
fn split_capture(expected: &Value) -> (Option<String>, Value) {
    let Some(text) = expected.as_str() else {
        return (None, expected.clone());
    };
    let Some(captures) = CAPTURE_RE.captures(text) else {
        return (None, expected.clone());
    };
    let name = captures[1].to_string();
    let payload = Value::String(captures[2].to_string());
    if name.is_empty() {
        (None, payload)
    } else {
        (Some(name), payload)
    }
}

fn index_map(items: &[Value]) -> Map<String, Value> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item.clone()))
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// TESTES
// ============================================================================
