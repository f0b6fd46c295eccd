//! # Unit Tester - Execução de Um Teste
//!
//! Executa um único teste unitário, do começo ao fim:
//!
//! 1. **Substitui** `#var#` na url, nos headers e no corpo da requisição
//!    usando o ambiente atual.
//! 2. **Dispara** a requisição pelo `Requester` (ou, para a ação FILE,
//!    lê o arquivo local e usa os bytes como "resposta").
//! 3. **Valida** status e Content-Type da resposta.
//! 4. **Compara** o corpo: estrutural para json, byte a byte para o
//!    resto.
//! 5. **Captura**: roda a pcre opcional sobre o corpo cru e, por fim,
//!    mescla as capturas do comparator no ambiente, que fica visível
//!    para o próximo teste do cenário.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::comparator::{Comparator, ComparatorError};

use super::client::{ClientError, Request, Requester};
use super::config::{scalar_to_string, UnitTest};
use super::env;
use super::fileopener::FileOpener;

// ============================================================================
// ERROS
// ============================================================================

/// O que deu errado dentro de um teste unitário.
#[derive(Debug, thiserror::Error)]
pub enum TestFailure {
    #[error("wrong status: got {got} expected {expected}")]
    WrongStatus { got: u16, expected: u16 },

    #[error("wrong content type: got '{got}' expected '{expected}'")]
    WrongContentType { got: String, expected: String },

    #[error("raw body does not match the expected one")]
    RawBodyDontMatch,

    #[error("pcre '{0}' produced no result on the response body")]
    PcreNoResult(String),

    #[error("error while requesting: {0}")]
    Transport(#[from] ClientError),

    #[error("cannot read file: {0}")]
    File(#[from] std::io::Error),

    #[error("body is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Compare(#[from] ComparatorError),
}

/// Falha de um teste unitário com o contexto de diagnóstico completo.
#[derive(Debug)]
pub struct UnitTesterError {
    pub file: String,
    pub url: String,
    pub ct_out: String,
    /// Corpo recebido, quando ajuda no diagnóstico.
    pub body: Option<Vec<u8>>,
    pub kind: TestFailure,
}

impl fmt::Display for UnitTesterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in test : '{}' ({}), CtOut : {}\nErr : {}",
            self.file, self.url, self.ct_out, self.kind
        )?;
        if let Some(body) = &self.body {
            write!(f, "\ngot :\n{}", String::from_utf8_lossy(body))?;
        }
        Ok(())
    }
}

impl std::error::Error for UnitTesterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

// ============================================================================
// UNIT TESTER
// ============================================================================

/// Contrato consumido pelo scenario/suite tester; atrás de um trait para
/// que os orquestradores possam ser testados com fakes.
#[async_trait]
pub trait UnitRunner: Send {
    async fn run_single(&mut self, ut: &UnitTest) -> Result<(), UnitTesterError>;
    fn env(&self) -> &HashMap<String, String>;
    fn env_mut(&mut self) -> &mut HashMap<String, String>;
}

pub struct UnitTester {
    client: Box<dyn Requester>,
    comparator: Comparator,
    file_opener: Box<dyn FileOpener>,
    environment: HashMap<String, String>,
}

impl UnitTester {
    pub fn new(
        client: Box<dyn Requester>,
        comparator: Comparator,
        file_opener: Box<dyn FileOpener>,
    ) -> Self {
        Self {
            client,
            comparator,
            file_opener,
            environment: HashMap::new(),
        }
    }

    fn fail(
        &self,
        ut: &UnitTest,
        url: &str,
        body: Option<Vec<u8>>,
        kind: TestFailure,
    ) -> UnitTesterError {
        UnitTesterError {
            file: ut.file.clone(),
            url: url.to_string(),
            ct_out: ut.ct_out.clone(),
            body,
            kind,
        }
    }

    // ========================================================================
    // AÇÃO FILE: o arquivo local faz o papel da resposta; não há
    // requisição, nem checagem de status ou content-type.
    // ========================================================================
    fn run_file(&mut self, ut: &UnitTest) -> Result<(), UnitTesterError> {
        let bytes = self
            .file_opener
            .open(&ut.in_name)
            .map_err(|err| self.fail(ut, &ut.in_name, None, err.into()))?;

        if let Some(expected) = &ut.out_body {
            let content_type = if ut.ct_out.is_empty() {
                if ut.in_name.ends_with(".json") {
                    "application/json"
                } else {
                    ""
                }
            } else {
                ut.ct_out.as_str()
            };
            self.compare_body(ut, &ut.in_name, &bytes, expected, content_type)?;
        }
        if !ut.pcre.is_empty() {
            self.run_pcre(ut, &ut.in_name, &bytes)?;
        }
        self.merge_captured();
        Ok(())
    }

    // ========================================================================
    // CORPO: estrutural para json, byte a byte para o resto.
    // ========================================================================
    fn compare_body(
        &mut self,
        ut: &UnitTest,
        url: &str,
        actual: &[u8],
        expected: &[u8],
        content_type: &str,
    ) -> Result<(), UnitTesterError> {
        if content_type == "application/json" {
            self.comparator.reset();
            let actual_value: Value = serde_json::from_slice(actual)
                .map_err(|err| self.fail(ut, url, Some(actual.to_vec()), err.into()))?;
            let expected_value: Value = serde_json::from_slice(expected)
                .map_err(|err| self.fail(ut, url, Some(expected.to_vec()), err.into()))?;
            return self
                .comparator
                .compare(&actual_value, &expected_value)
                .map_err(|err| self.fail(ut, url, Some(actual.to_vec()), err.into()));
        }
        if actual != expected {
            return Err(self.fail(
                ut,
                url,
                Some(actual.to_vec()),
                TestFailure::RawBodyDontMatch,
            ));
        }
        Ok(())
    }

    // ========================================================================
    // PCRE: pelo menos um match; cada grupo vira pcre0, pcre1, ... no
    // mapa de capturas do comparator.
    // ========================================================================
    fn run_pcre(&mut self, ut: &UnitTest, url: &str, body: &[u8]) -> Result<(), UnitTesterError> {
        // Pcres inválidas são rejeitadas no carregamento da config.
        let Ok(regex) = regex::bytes::Regex::new(&ut.pcre) else {
            return Err(self.fail(ut, url, None, TestFailure::PcreNoResult(ut.pcre.clone())));
        };
        let Some(captures) = regex.captures(body) else {
            return Err(self.fail(
                ut,
                url,
                Some(body.to_vec()),
                TestFailure::PcreNoResult(ut.pcre.clone()),
            ));
        };
        for (index, group) in captures.iter().enumerate() {
            if let Some(matched) = group {
                self.comparator.record_capture(
                    format!("pcre{}", index),
                    Value::String(String::from_utf8_lossy(matched.as_bytes()).into_owned()),
                );
            }
        }
        Ok(())
    }

    // O comparator é dono do mapa de capturas; o ambiente só o consome
    // depois que a comparação inteira passou.
    fn merge_captured(&mut self) {
        for (name, value) in self.comparator.captured() {
            self.environment.insert(name.clone(), scalar_to_string(value));
        }
    }
}

fn effective_ct_out(ut: &UnitTest) -> &str {
    if ut.ct_out.is_empty() {
        "application/json"
    } else {
        &ut.ct_out
    }
}

#[async_trait]
impl UnitRunner for UnitTester {
    async fn run_single(&mut self, ut: &UnitTest) -> Result<(), UnitTesterError> {
        self.comparator.reset();
        if ut.action == "FILE" {
            return self.run_file(ut);
        }

        // ====================================================================
        // PASSO 1: SUBSTITUIÇÃO DE AMBIENTE
        // ====================================================================
        let url = env::replace_with_env_value(&ut.url, &self.environment);
        let mut headers = HashMap::with_capacity(ut.headers.len() + 1);
        headers.insert("Content-Type".to_string(), ut.ct_in.clone());
        for (key, value) in &ut.headers {
            headers.insert(
                key.clone(),
                env::replace_with_env_value(value, &self.environment),
            );
        }
        let body = ut
            .in_body
            .as_ref()
            .map(|bytes| env::replace_in_bytes(bytes, &self.environment));

        // ====================================================================
        // PASSO 2: REQUISIÇÃO
        // ====================================================================
        let start = Instant::now();
        tracing::debug!(method = %ut.action, url = %url, "issuing request");
        let response = self
            .client
            .make(Request {
                method: ut.action.clone(),
                url: url.clone(),
                headers,
                body,
            })
            .await
            .map_err(|err| self.fail(ut, &url, None, err.into()))?;
        tracing::info!(
            method = %ut.action,
            url = %url,
            status = response.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "request finished"
        );

        // ====================================================================
        // PASSO 3: STATUS E CONTENT-TYPE
        // ====================================================================
        if response.status != ut.status {
            return Err(self.fail(
                ut,
                &url,
                Some(response.body.clone()),
                TestFailure::WrongStatus {
                    got: response.status,
                    expected: ut.status,
                },
            ));
        }
        if !ut.ct_out.is_empty() && !response.content_type.starts_with(&ut.ct_out) {
            return Err(self.fail(
                ut,
                &url,
                None,
                TestFailure::WrongContentType {
                    got: response.content_type.clone(),
                    expected: ut.ct_out.clone(),
                },
            ));
        }

        // ====================================================================
        // PASSO 4: CORPO, PCRE E CAPTURAS
        // ====================================================================
        if let Some(expected) = &ut.out_body {
            self.compare_body(ut, &url, &response.body, expected, effective_ct_out(ut))?;
        }
        if !ut.pcre.is_empty() {
            self.run_pcre(ut, &url, &response.body)?;
        }
        self.merge_captured();
        Ok(())
    }

    fn env(&self) -> &HashMap<String, String> {
        &self.environment
    }

    fn env_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.environment
    }
}

// ============================================================================
// TESTES
// ============================================================================
