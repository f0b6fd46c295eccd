//! # Módulo de Configuração - Modelo e Carregamento
//!
//! Define as estruturas que descrevem uma suíte de testes e carrega o
//! manifesto raiz (YAML), os arquivos de teste por grupo, os payloads,
//! as respostas esperadas e o arquivo de ambiente (JSON).
//!
//! ## Estrutura em disco (relativa ao diretório do manifesto):
//!
//! ```text
//! madelyne.yml                  manifesto raiz (url + grupos)
//! <grupo>/
//!   configs/<teste>.yml         unit_tests e scenarios
//!   payloads/<nome>[.json]      corpos de requisição
//!   responses/<nome>[.json]     corpos esperados e recursos externos
//!   <env>.json                  variáveis iniciais do grupo
//! ```
//!
//! A ordem de declaração dos grupos no manifesto e dos cenários nos
//! arquivos de teste é preservada e dita a ordem de execução.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Famílias de método aceitas, na ordem em que os testes unitários de um
/// arquivo são coletados.
pub const METHOD_FAMILIES: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "FILE"];

// ============================================================================
// ERROS DE VALIDAÇÃO
// ============================================================================

/// Problemas estruturais detectados depois do parse, antes de executar.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("header '{0}' must have exactly one ':'")]
    MalformedHeader(String),

    #[error("{file}: action '{action}' is not a known method")]
    UnknownAction { file: String, action: String },

    #[error("{file}: pcre '{pcre}' is not a valid regex")]
    InvalidPcre { file: String, pcre: String },

    #[error("group '{group}': scenario '{scenario}' is listed in the run order but never defined")]
    UnknownScenario { group: String, scenario: String },
}

// ============================================================================
// MODELO EM MEMÓRIA
// ============================================================================

/// Um teste unitário: uma requisição e suas verificações. Imutável
/// depois do carregamento.
#[derive(Debug, Clone, Default)]
pub struct UnitTest {
    /// Identificador de diagnóstico (arquivo:ação ou arquivo:cenário:ação:índice).
    pub file: String,
    /// GET, POST, PUT, PATCH, DELETE ou FILE.
    pub action: String,
    /// Pode conter marcadores `#var#`.
    pub url: String,
    /// Status HTTP esperado (200 por padrão).
    pub status: u16,
    /// Valores podem conter marcadores `#var#`.
    pub headers: HashMap<String, String>,
    /// Corpo da requisição, já carregado de payloads/.
    pub in_body: Option<Vec<u8>>,
    /// Nome cru do campo `in`; para a ação FILE é o arquivo a ler.
    pub in_name: String,
    /// Corpo esperado, já carregado de responses/.
    pub out_body: Option<Vec<u8>>,
    /// Nome cru do campo `out`.
    pub out_name: String,
    /// Content-Type da requisição (application/json por padrão).
    pub ct_in: String,
    /// Content-Type esperado na resposta; vazio desliga a checagem.
    pub ct_out: String,
    /// Regex opcional rodada sobre o corpo cru da resposta.
    pub pcre: String,
}

/// Um grupo: testes unitários e cenários que compartilham setup/teardown
/// e um ambiente inicial.
#[derive(Debug, Clone, Default)]
pub struct TestGroup {
    pub name: String,
    pub global_setup_command: String,
    pub global_teardown_command: String,
    pub setup_command: String,
    pub teardown_command: String,
    /// Variáveis iniciais, carregadas do arquivo `environment` do grupo.
    pub environment: HashMap<String, String>,
    pub unit_tests: Vec<UnitTest>,
    /// Ordem de execução dos cenários (ordem de declaração).
    pub scenario_order: Vec<String>,
    /// Invariante: toda entrada de `scenario_order` é chave daqui.
    pub scenarios: HashMap<String, Vec<UnitTest>>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// URL base; as urls dos testes são concatenadas a ela.
    pub url: String,
    /// Diretório do manifesto; raiz de todos os caminhos relativos.
    pub root: PathBuf,
    pub groups_order: Vec<String>,
    pub groups: HashMap<String, TestGroup>,
}

// ============================================================================
// FORMAS CRUAS (YAML)
// ============================================================================

#[derive(Debug, Deserialize)]
struct YamlConfig {
    url: String,
    // Mapping preserva a ordem de declaração dos grupos.
    #[serde(default)]
    groups: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct YamlGroup {
    #[serde(rename = "globalSetupCommand")]
    global_setup_command: String,
    #[serde(rename = "globalTearDownCommand")]
    global_tear_down_command: String,
    #[serde(rename = "setupCommand")]
    setup_command: String,
    #[serde(rename = "teardownCommand")]
    teardown_command: String,
    environment: String,
    tests: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct YamlTestFile {
    unit_tests: HashMap<String, Vec<YamlUnitTest>>,
    // Mapping preserva a ordem de declaração dos cenários.
    scenario: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct YamlUnitTest {
    action: String,
    url: String,
    status: u16,
    headers: String,
    #[serde(rename = "in")]
    in_name: String,
    #[serde(rename = "out")]
    out_name: String,
    ct_in: String,
    ct_out: String,
    pcre: String,
}

// ============================================================================
// CARREGAMENTO
// ============================================================================

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let raw: YamlConfig = serde_yaml::from_str(&data)
        .with_context(|| format!("cannot unmarshal file {}", path.display()))?;

    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut groups_order = Vec::new();
    let mut groups = HashMap::new();
    for (key, value) in &raw.groups {
        let name = key
            .as_str()
            .context("group names must be strings")?
            .to_string();
        let raw_group: YamlGroup = serde_yaml::from_value(value.clone())
            .with_context(|| format!("invalid group '{}'", name))?;
        let group = load_group(&root, &name, &raw_group)
            .with_context(|| format!("while loading group '{}'", name))?;
        groups_order.push(name.clone());
        groups.insert(name, group);
    }

    let config = Config {
        url: raw.url,
        root,
        groups_order,
        groups,
    };
    validate(&config)?;
    Ok(config)
}

fn load_group(root: &Path, name: &str, raw: &YamlGroup) -> Result<TestGroup> {
    let environment = if raw.environment.is_empty() {
        HashMap::new()
    } else {
        load_env_file(&root.join(name).join(&raw.environment))
            .with_context(|| format!("while loading env of group '{}'", name))?
    };

    let mut group = TestGroup {
        name: name.to_string(),
        global_setup_command: raw.global_setup_command.clone(),
        global_teardown_command: raw.global_tear_down_command.clone(),
        setup_command: raw.setup_command.clone(),
        teardown_command: raw.teardown_command.clone(),
        environment,
        unit_tests: Vec::new(),
        scenario_order: Vec::new(),
        scenarios: HashMap::new(),
    };

    for file in &raw.tests {
        load_test_file(root, name, file, &mut group)
            .with_context(|| format!("while loading tests of group '{}'", name))?;
    }
    Ok(group)
}

fn load_test_file(root: &Path, group_name: &str, file: &str, group: &mut TestGroup) -> Result<()> {
    let path = root.join(group_name).join("configs").join(file);
    let data =
        fs::read_to_string(&path).with_context(|| format!("while loading {}", file))?;
    let parsed: YamlTestFile =
        serde_yaml::from_str(&data).with_context(|| format!("cannot unmarshal file {}", file))?;

    // Testes unitários: por família de método, depois por declaração.
    for action in METHOD_FAMILIES {
        let Some(tests) = parsed.unit_tests.get(action) else {
            continue;
        };
        for raw_test in tests {
            let diagnostic = format!("{}/configs/{}:{}", group_name, file, action);
            let mut unit = build_unit_test(raw_test, action, diagnostic)?;
            load_test_bodies(root, group_name, raw_test, &mut unit)?;
            group.unit_tests.push(unit);
        }
    }

    // Cenários: a ação vem do próprio passo.
    for (key, value) in &parsed.scenario {
        let scenario = key
            .as_str()
            .context("scenario names must be strings")?;
        let steps: Vec<YamlUnitTest> = serde_yaml::from_value(value.clone())
            .with_context(|| format!("invalid scenario '{}'", scenario))?;

        let full_name = format!("{}/configs/{}:{}", group_name, file, scenario);
        let mut units = Vec::with_capacity(steps.len());
        for (index, raw_test) in steps.iter().enumerate() {
            let diagnostic = format!(
                "{}/configs/{}:{}:{}:{}",
                group_name, file, scenario, raw_test.action, index
            );
            let mut unit = build_unit_test(raw_test, &raw_test.action, diagnostic)?;
            load_test_bodies(root, group_name, raw_test, &mut unit)?;
            units.push(unit);
        }
        group.scenario_order.push(full_name.clone());
        group.scenarios.insert(full_name, units);
    }
    Ok(())
}

fn build_unit_test(raw: &YamlUnitTest, action: &str, file: String) -> Result<UnitTest> {
    Ok(UnitTest {
        file,
        action: action.to_string(),
        url: raw.url.clone(),
        status: if raw.status == 0 { 200 } else { raw.status },
        headers: parse_headers(&raw.headers)?,
        in_body: None,
        in_name: raw.in_name.clone(),
        out_body: None,
        out_name: raw.out_name.clone(),
        ct_in: if raw.ct_in.is_empty() {
            "application/json".to_string()
        } else {
            raw.ct_in.clone()
        },
        ct_out: raw.ct_out.clone(),
        pcre: raw.pcre.clone(),
    })
}

fn load_test_bodies(
    root: &Path,
    group_name: &str,
    raw: &YamlUnitTest,
    unit: &mut UnitTest,
) -> Result<()> {
    // A ação FILE usa `in` como arquivo local a ler, não como payload.
    if !raw.in_name.is_empty() && unit.action != "FILE" {
        let name = format!("{}{}", raw.in_name, extension_for(&unit.ct_in));
        let path = root.join(group_name).join("payloads").join(&name);
        unit.in_body = Some(
            fs::read(&path).with_context(|| format!("while loading payload {}", name))?,
        );
    }
    if !raw.out_name.is_empty() {
        let name = format!("{}{}", raw.out_name, extension_for(&unit.ct_out));
        let path = root.join(group_name).join("responses").join(&name);
        unit.out_body = Some(
            fs::read(&path).with_context(|| format!("while loading response {}", name))?,
        );
    }
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    if content_type.is_empty() || content_type == "application/json" {
        ".json"
    } else {
        ""
    }
}

// Uma string "k : v; k2 : v2". Cada par deve ter exatamente um ':'.
fn parse_headers(headers: &str) -> Result<HashMap<String, String>, ValidationError> {
    let mut out = HashMap::new();
    for header in headers.split(';') {
        if header.is_empty() {
            continue;
        }
        let parts: Vec<&str> = header.split(':').collect();
        if parts.len() != 2 {
            return Err(ValidationError::MalformedHeader(header.to_string()));
        }
        out.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
    }
    Ok(out)
}

// Arquivo de ambiente: um objeto JSON de escalares, tudo vira string.
fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let values: HashMap<String, Value> = serde_json::from_str(&data)
        .with_context(|| format!("cannot unmarshal file {}", path.display()))?;
    Ok(values
        .into_iter()
        .map(|(key, value)| (key, scalar_to_string(&value)))
        .collect())
}

pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// VALIDAÇÃO
// ============================================================================

fn validate(config: &Config) -> Result<()> {
    for group in config.groups.values() {
        for name in &group.scenario_order {
            if !group.scenarios.contains_key(name) {
                return Err(ValidationError::UnknownScenario {
                    group: group.name.clone(),
                    scenario: name.clone(),
                }
                .into());
            }
        }
        let scenario_units = group.scenarios.values().flatten();
        for unit in group.unit_tests.iter().chain(scenario_units) {
            validate_unit(unit)?;
        }
    }
    Ok(())
}

fn validate_unit(unit: &UnitTest) -> Result<()> {
    if !METHOD_FAMILIES.contains(&unit.action.as_str()) {
        return Err(ValidationError::UnknownAction {
            file: unit.file.clone(),
            action: unit.action.clone(),
        }
        .into());
    }
    if !unit.pcre.is_empty() && Regex::new(&unit.pcre).is_err() {
        return Err(ValidationError::InvalidPcre {
            file: unit.file.clone(),
            pcre: unit.pcre.clone(),
        }
        .into());
    }
    Ok(())
}

// ============================================================================
// TESTES
// ============================================================================
