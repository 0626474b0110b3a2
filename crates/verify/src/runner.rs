// Scenario runner
//
// Drives a run through its states:
// Idle -> ServerStarting -> ServerReady -> BrowserLaunched -> Step(n) -> Teardown -> Success|Failure
// and records the trail in a RunReport.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;
use url::Url;

use crate::artifacts::ArtifactStore;
use crate::config::{RunnerConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::guard::guarded;
use crate::scenario::{Scenario, ScenarioContext};
use crate::server::{DevServer, ReadyInfo};
use crate::session::BrowserSession;

/// Where a run is, or ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ServerStarting,
    ServerReady { port: Option<u16> },
    BrowserLaunched,
    Step { index: usize, name: String },
    Teardown,
    Success,
    Failure,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::ServerStarting => write!(f, "server starting"),
            RunState::ServerReady { port: Some(port) } => write!(f, "server ready on port {}", port),
            RunState::ServerReady { port: None } => write!(f, "server ready"),
            RunState::BrowserLaunched => write!(f, "browser launched"),
            RunState::Step { index, name } => write!(f, "step {}: {}", index, name),
            RunState::Teardown => write!(f, "teardown"),
            RunState::Success => write!(f, "success"),
            RunState::Failure => write!(f, "failure"),
        }
    }
}

/// Terminal result of one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure {
        message: String,
        /// The failure happened before any scenario step ran
        setup: bool,
    },
}

/// Summary of one scenario run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    pub outcome: Outcome,
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
    pub states: Vec<RunState>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    fn failed(scenario: &str, err: &Error, states: Vec<RunState>, elapsed: Duration) -> Self {
        let mut report = Self {
            scenario: scenario.to_string(),
            outcome: Outcome::Failure {
                message: err.to_string(),
                setup: err.is_setup_failure(),
            },
            artifacts: Vec::new(),
            warnings: Vec::new(),
            elapsed,
            states,
        };
        enter(&mut report.states, RunState::Failure);
        report
    }
}

fn enter(states: &mut Vec<RunState>, state: RunState) {
    tracing::info!("-> {}", state);
    states.push(state);
}

/// Runs scenarios against the configured target
pub struct Runner {
    config: RunnerConfig,
    store: ArtifactStore,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let store = ArtifactStore::new(config.artifacts_dir.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs one scenario, booting the dev server first if configured
    pub async fn run(&self, scenario: &dyn Scenario) -> RunReport {
        let mut reports = self.run_each(std::slice::from_ref(&scenario)).await;
        match reports.pop() {
            Some(report) => report,
            None => RunReport::failed(
                scenario.name(),
                &Error::Config("no report produced".into()),
                vec![RunState::Idle],
                Duration::ZERO,
            ),
        }
    }

    /// Runs scenarios in order, each in its own browser session.
    ///
    /// A dev server, if configured, is started once, shared by all scenarios
    /// and stopped before this returns.
    pub async fn run_all(&self, scenarios: &[Box<dyn Scenario>]) -> Vec<RunReport> {
        let refs: Vec<&dyn Scenario> = scenarios.iter().map(|s| s.as_ref()).collect();
        self.run_each(&refs).await
    }

    async fn run_each(&self, scenarios: &[&dyn Scenario]) -> Vec<RunReport> {
        let start = Instant::now();
        let mut states = vec![RunState::Idle];

        let mut server = None;
        if let Some(server_config) = &self.config.server {
            enter(&mut states, RunState::ServerStarting);
            match start_server(server_config, self.config.timeouts.ready).await {
                Ok(started) => {
                    enter(
                        &mut states,
                        RunState::ServerReady {
                            port: started.ready().port,
                        },
                    );
                    server = Some(started);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    return scenarios
                        .iter()
                        .map(|s| RunReport::failed(s.name(), &e, states.clone(), start.elapsed()))
                        .collect();
                }
            }
        }

        let discovered = server.as_ref().and_then(|s| s.ready().port);
        let reports = match self.config.base_url.resolve(discovered) {
            Ok(base_url) => {
                tracing::info!("Target: {}", base_url);
                let mut reports = Vec::with_capacity(scenarios.len());
                for scenario in scenarios {
                    reports.push(self.run_scenario(*scenario, &base_url, states.clone()).await);
                }
                reports
            }
            Err(e) => scenarios
                .iter()
                .map(|s| RunReport::failed(s.name(), &e, states.clone(), start.elapsed()))
                .collect(),
        };

        if let Some(mut server) = server {
            if let Err(e) = server.shutdown().await {
                tracing::warn!("Failed to stop dev server: {}", e);
            }
        }

        reports
    }

    async fn run_scenario(
        &self,
        scenario: &dyn Scenario,
        base_url: &Url,
        states: Vec<RunState>,
    ) -> RunReport {
        let span = tracing::info_span!("scenario", name = scenario.name());
        self.run_scenario_inner(scenario, base_url, states)
            .instrument(span)
            .await
    }

    async fn run_scenario_inner(
        &self,
        scenario: &dyn Scenario,
        base_url: &Url,
        mut states: Vec<RunState>,
    ) -> RunReport {
        let start = Instant::now();
        let name = scenario.name();

        let mut session_config = self.config.session.clone();
        if let Some(viewport) = scenario.viewport() {
            session_config.viewport = Some(viewport);
        }

        let session = match BrowserSession::launch(&session_config).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("{}", e);
                return RunReport::failed(name, &e, states, start.elapsed());
            }
        };
        enter(&mut states, RunState::BrowserLaunched);

        let artifacts = self.store.scenario(name);
        let cx = ScenarioContext::new(
            session.page(),
            base_url,
            self.config.timeouts,
            &artifacts,
            &self.config.gateway_reservation_id,
        );

        let result = guarded(&session, &artifacts, scenario.run(&cx)).await;

        for (i, step) in cx.steps().into_iter().enumerate() {
            states.push(RunState::Step {
                index: i + 1,
                name: step,
            });
        }
        enter(&mut states, RunState::Teardown);

        let outcome = match &result {
            Ok(()) => {
                enter(&mut states, RunState::Success);
                Outcome::Success
            }
            Err(e) => {
                tracing::error!("{}", e);
                enter(&mut states, RunState::Failure);
                Outcome::Failure {
                    message: e.to_string(),
                    setup: false,
                }
            }
        };

        RunReport {
            scenario: name.to_string(),
            outcome,
            artifacts: artifacts.written(),
            warnings: cx.warnings(),
            elapsed: start.elapsed(),
            states,
        }
    }
}

async fn start_server(config: &ServerConfig, timeout: Duration) -> Result<DevServer> {
    let gate = config.gate(timeout)?;
    DevServer::start(&config.command, &gate).await
}

/// Boots the dev server, reports readiness, and stops it again
pub async fn boot_check(config: &ServerConfig, timeout: Duration) -> Result<ReadyInfo> {
    let mut server = start_server(config, timeout).await?;
    let ready = server.ready().clone();
    server.shutdown().await?;
    Ok(ready)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_report_ends_in_failure_state() {
        let err = Error::PortNotFound {
            line: "ready in 200 ms".into(),
        };
        let report = RunReport::failed(
            "hero-search",
            &err,
            vec![RunState::Idle, RunState::ServerStarting],
            Duration::from_millis(5),
        );
        assert!(!report.is_success());
        assert_eq!(report.states.last(), Some(&RunState::Failure));
        match report.outcome {
            Outcome::Failure { setup, message } => {
                assert!(setup);
                assert!(message.contains("no port"));
            }
            Outcome::Success => panic!("expected failure"),
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            RunState::ServerReady { port: Some(5174) }.to_string(),
            "server ready on port 5174"
        );
        assert_eq!(
            RunState::Step {
                index: 2,
                name: "Search".into()
            }
            .to_string(),
            "step 2: Search"
        );
    }
}
