// Module: Scenario
// Runs an ordered list of unit tests that share an environment: each
// step gets a fresh unit tester seeded from the accumulated
// environment, and whatever the step captured is merged back for the
// next one.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use super::config::UnitTest;
use super::unit::{UnitRunner, UnitTesterError};

#[derive(Debug, Error)]
#[error("in step {step} : {source}")]
pub struct ScenarioError {
    /// Index of the failing step within the scenario.
    pub step: usize,
    #[source]
    pub source: UnitTesterError,
}

pub type UnitTesterFactory = Box<dyn Fn() -> Box<dyn UnitRunner> + Send + Sync>;

/// Contract consumed by the suite tester.
#[async_trait]
pub trait ScenarioRunner: Send {
    async fn run_multiple(&mut self, units: &[UnitTest]) -> Result<(), ScenarioError>;
    fn env(&self) -> &HashMap<String, String>;
    fn env_mut(&mut self) -> &mut HashMap<String, String>;
}

pub struct ScenarioTester {
    environment: HashMap<String, String>,
    build_unit_tester: UnitTesterFactory,
}

impl ScenarioTester {
    pub fn new(build_unit_tester: UnitTesterFactory) -> Self {
        Self {
            environment: HashMap::new(),
            build_unit_tester,
        }
    }
}

#[async_trait]
impl ScenarioRunner for ScenarioTester {
    async fn run_multiple(&mut self, units: &[UnitTest]) -> Result<(), ScenarioError> {
        for (step, unit) in units.iter().enumerate() {
            let mut tester = (self.build_unit_tester)();
            tester.env_mut().extend(
                self.environment
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            tester
                .run_single(unit)
                .await
                .map_err(|source| ScenarioError { step, source })?;
            self.environment.extend(
                tester
                    .env()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }
        Ok(())
    }

    fn env(&self) -> &HashMap<String, String> {
        &self.environment
    }

    fn env_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.environment
    }
}
