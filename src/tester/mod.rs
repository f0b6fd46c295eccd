// Module: Tester
// Wires config + http client + comparator + shell launcher + progress
// into a runnable suite.

pub mod client;
pub mod command;
pub mod config;
pub mod env;
pub mod fileopener;
pub mod progress;
pub mod scenario;
pub mod suite;
pub mod unit;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::comparator::Comparator;

use client::Client;
use command::{CommandLauncher, ShellLauncher};
use config::{Config, TestGroup};
use fileopener::DiskOpener;
use progress::TesterProgress;
use scenario::{ScenarioRunner, ScenarioTester};
use suite::{ProgressLogger, ScenarioBuilder, SuiteTester, UnitBuilder};
use unit::{UnitRunner, UnitTester};

pub struct Tester {
    suite: SuiteTester,
    groups_order: Vec<String>,
    groups: HashMap<String, TestGroup>,
}

impl Tester {
    /// Loads the manifest and wires the production collaborators.
    pub fn load(path: &Path) -> Result<Self> {
        let config = config::load(path)?;
        let progress = TesterProgress::new(count_steps(&config.groups) as u64);
        let mut tester = Self::build(config, Box::new(ShellLauncher));
        tester.suite.progress_logger = Box::new(move || progress.step()) as ProgressLogger;
        Ok(tester)
    }

    /// Same wiring with an injectable command launcher and no progress
    /// bar.
    pub fn build(config: Config, command_launcher: Box<dyn CommandLauncher>) -> Self {
        Self {
            suite: SuiteTester {
                command_launcher,
                unit_tester_builder: make_unit_builder(config.url.clone(), config.root.clone()),
                scenario_tester_builder: make_scenario_builder(config.url.clone(), config.root),
                progress_logger: Box::new(|| {}),
            },
            groups_order: config.groups_order,
            groups: config.groups,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.suite.run_suite(&self.groups_order, &self.groups).await
    }
}

fn new_unit_tester(url: &str, root: &Path, group: &str) -> UnitTester {
    let group_dir = root.join(group);
    UnitTester::new(
        Box::new(Client::new(url)),
        Comparator::new(&group_dir),
        Box::new(DiskOpener::new(group_dir)),
    )
}

fn make_unit_builder(url: String, root: PathBuf) -> UnitBuilder {
    Box::new(move |group, environment| {
        let mut tester = new_unit_tester(&url, &root, group);
        tester
            .env_mut()
            .extend(environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        Box::new(tester) as Box<dyn UnitRunner>
    })
}

fn make_scenario_builder(url: String, root: PathBuf) -> ScenarioBuilder {
    Box::new(move |group, environment| {
        let url = url.clone();
        let root = root.clone();
        let group = group.to_string();
        let mut tester = ScenarioTester::new(Box::new(move || {
            Box::new(new_unit_tester(&url, &root, &group)) as Box<dyn UnitRunner>
        }));
        tester
            .env_mut()
            .extend(environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        Box::new(tester) as Box<dyn ScenarioRunner>
    })
}

/// One progress step per unit test and per scenario.
pub fn count_steps(groups: &HashMap<String, TestGroup>) -> usize {
    groups
        .values()
        .map(|group| group.unit_tests.len() + group.scenarios.len())
        .sum()
}

// ============================================================================
// TESTES DE PONTA A PONTA
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use super::unit::{TestFailure, UnitTesterError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type Log = Arc<Mutex<Vec<String>>>;

    struct RecordingLauncher {
        log: Log,
    }

    #[async_trait]
    impl CommandLauncher for RecordingLauncher {
        async fn launch(&self, command: &str) -> Result<()> {
            self.log.lock().expect("lock").push(command.to_string());
            Ok(())
        }
    }

    fn json_response(status: u16, body: &str) -> ResponseTemplate {
        ResponseTemplate::new(status)
            .insert_header("Content-Type", "application/json")
            .set_body_string(body.to_string())
    }

    // Suite on disk: one POST unit test plus a create-then-read
    // scenario chained through a capture.
    fn write_suite(dir: &Path, url: &str) -> PathBuf {
        fs::create_dir_all(dir.join("users/configs")).expect("mkdir");
        fs::create_dir_all(dir.join("users/payloads")).expect("mkdir");
        fs::create_dir_all(dir.join("users/responses")).expect("mkdir");

        let manifest = dir.join("madelyne.yml");
        fs::write(
            &manifest,
            format!(
                "url: {}\n\
                 groups:\n\
                 \x20 users:\n\
                 \x20   setupCommand: per-test-setup\n\
                 \x20   teardownCommand: per-test-teardown\n\
                 \x20   tests:\n\
                 \x20     - users.yml\n",
                url
            ),
        )
        .expect("write manifest");

        fs::write(
            dir.join("users/configs/users.yml"),
            "unit_tests:\n\
             \x20 POST:\n\
             \x20   - url: /users\n\
             \x20     status: 201\n\
             \x20     in: create_user\n\
             \x20     out: created_user\n\
             scenario:\n\
             \x20 create_then_read:\n\
             \x20   - action: POST\n\
             \x20     url: /users\n\
             \x20     status: 201\n\
             \x20     in: create_user\n\
             \x20     out: created_user\n\
             \x20   - action: GET\n\
             \x20     url: /users/#uid#\n\
             \x20     out: created_user\n",
        )
        .expect("write test file");

        fs::write(
            dir.join("users/payloads/create_user.json"),
            br#"{"name": "jean"}"#,
        )
        .expect("write payload");
        fs::write(
            dir.join("users/responses/created_user.json"),
            br##"{"id": "#uid={{@integer@}}", "name": "@string@"}"##,
        )
        .expect("write response");

        manifest
    }

    #[tokio::test]
    async fn test_full_suite_passes_and_wraps_commands() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(json_response(201, r#"{"id": 7, "name": "jean"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/7"))
            .respond_with(json_response(200, r#"{"id": 7, "name": "jean"}"#))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = write_suite(dir.path(), &server.uri());

        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let config = config::load(&manifest).expect("must load");
        assert_eq!(count_steps(&config.groups), 2);

        let tester = Tester::build(
            config,
            Box::new(RecordingLauncher {
                log: Arc::clone(&log),
            }),
        );
        tester.run().await.expect("suite must pass");

        // The GET step proves the capture crossed from step 1 to step 2.
        let log = log.lock().expect("lock").clone();
        assert_eq!(
            log,
            vec![
                // global commands are empty strings, still launched once.
                "",
                "per-test-setup",
                "per-test-teardown",
                "per-test-setup",
                "per-test-teardown",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_status_fails_the_suite_and_teardown_still_runs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(json_response(200, r#"{"id": 7, "name": "jean"}"#))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = write_suite(dir.path(), &server.uri());

        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let config = config::load(&manifest).expect("must load");
        let tester = Tester::build(
            config,
            Box::new(RecordingLauncher {
                log: Arc::clone(&log),
            }),
        );

        let err = tester.run().await.unwrap_err();
        let unit_error = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<UnitTesterError>())
            .expect("must be a unit tester error");
        assert!(matches!(
            unit_error.kind,
            TestFailure::WrongStatus {
                got: 200,
                expected: 201
            }
        ));

        let log = log.lock().expect("lock");
        assert!(log.contains(&"per-test-teardown".to_string()));
    }

    #[tokio::test]
    async fn test_setup_failure_short_circuits_but_tears_down() {
        struct FailingSetup {
            log: Log,
        }

        #[async_trait]
        impl CommandLauncher for FailingSetup {
            async fn launch(&self, command: &str) -> Result<()> {
                self.log.lock().expect("lock").push(command.to_string());
                if command == "per-test-setup" {
                    bail!("nope");
                }
                Ok(())
            }
        }

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = write_suite(dir.path(), &server.uri());

        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let config = config::load(&manifest).expect("must load");
        let tester = Tester::build(
            config,
            Box::new(FailingSetup {
                log: Arc::clone(&log),
            }),
        );

        tester.run().await.unwrap_err();
        let log = log.lock().expect("lock");
        // No request ever went out (no mocks mounted would have 404'd
        // into a WrongStatus instead of the setup error) and the
        // per-test teardown still ran exactly once.
        assert_eq!(
            log.iter().filter(|c| *c == "per-test-teardown").count(),
            1
        );
    }
}
