//! # Suite Tester - Orquestração de Grupos
//!
//! Percorre os grupos na ordem declarada. Cada grupo roda dentro do seu
//! setup/teardown global; cada teste unitário e cada cenário rodam
//! dentro do setup/teardown por teste:
//!
//! ```text
//! para cada grupo (em ordem):
//!   run( globalSetup, globalTeardown,
//!        para cada teste unitário: run( setup, teardown, teste )
//!        para cada cenário (em ordem): run( setup, teardown, cenário ) )
//! ```
//!
//! Invariante de `run(setup, teardown, corpo)`: uma vez tentado o
//! setup, o teardown roda exatamente uma vez em todo caminho de saída.
//! Falhas de teardown são engolidas (registradas em log de warn).
//!
//! O ambiente do grupo acumula: capturas feitas por um cenário ficam
//! visíveis para os cenários seguintes do mesmo grupo.

use std::collections::HashMap;
use std::future::Future;

use anyhow::{Context, Result};

use super::command::CommandLauncher;
use super::config::TestGroup;
use super::scenario::ScenarioRunner;
use super::unit::UnitRunner;

pub type UnitBuilder =
    Box<dyn Fn(&str, &HashMap<String, String>) -> Box<dyn UnitRunner> + Send + Sync>;
pub type ScenarioBuilder =
    Box<dyn Fn(&str, &HashMap<String, String>) -> Box<dyn ScenarioRunner> + Send + Sync>;
pub type ProgressLogger = Box<dyn Fn() + Send + Sync>;

pub struct SuiteTester {
    pub command_launcher: Box<dyn CommandLauncher>,
    pub unit_tester_builder: UnitBuilder,
    pub scenario_tester_builder: ScenarioBuilder,
    pub progress_logger: ProgressLogger,
}

impl SuiteTester {
    pub async fn run_suite(
        &self,
        order: &[String],
        groups: &HashMap<String, TestGroup>,
    ) -> Result<()> {
        for name in order {
            let group = groups
                .get(name)
                .with_context(|| format!("unknown group '{}'", name))?;
            tracing::debug!(group = %name, "running group");
            self.run_wrapped(
                &group.global_setup_command,
                &group.global_teardown_command,
                || self.run_group(group),
            )
            .await?;
        }
        Ok(())
    }

    async fn run_group(&self, group: &TestGroup) -> Result<()> {
        // Ambiente acumulado do grupo: os cenários escrevem de volta.
        let mut group_env = group.environment.clone();

        for unit in &group.unit_tests {
            let env = &group_env;
            self.run_wrapped(&group.setup_command, &group.teardown_command, || async move {
                let mut tester = (self.unit_tester_builder)(&group.name, env);
                tester.run_single(unit).await?;
                Ok(())
            })
            .await?;
        }

        for name in &group.scenario_order {
            let scenario = group
                .scenarios
                .get(name)
                .with_context(|| format!("unknown scenario '{}'", name))?;
            let env = &mut group_env;
            self.run_wrapped(&group.setup_command, &group.teardown_command, || async move {
                let mut tester = (self.scenario_tester_builder)(&group.name, env);
                tester.run_multiple(scenario).await?;
                for (key, value) in tester.env() {
                    env.insert(key.clone(), value.clone());
                }
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    // Uma vez tentado o setup, o teardown roda em todo caminho de saída.
    async fn run_wrapped<F, Fut>(&self, setup: &str, teardown: &str, body: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if let Err(err) = self.command_launcher.launch(setup).await {
            self.launch_teardown(teardown).await;
            return Err(err.context(format!("setup command '{}' failed", setup)));
        }
        if let Err(err) = body().await {
            self.launch_teardown(teardown).await;
            return Err(err);
        }
        self.launch_teardown(teardown).await;
        (self.progress_logger)();
        Ok(())
    }

    async fn launch_teardown(&self, teardown: &str) {
        if let Err(err) = self.command_launcher.launch(teardown).await {
            tracing::warn!(error = %err, command = %teardown, "teardown command failed");
        }
    }
}

// ============================================================================
// TESTES
// ============================================================================
