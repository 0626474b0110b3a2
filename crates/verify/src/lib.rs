//! araucaria-verify: scripted browser verification for the Transportes
//! Araucaria booking site.
//!
//! A run optionally boots the site's dev server and waits for it to become
//! ready, then drives a browser through a fixed scenario with bounded waits.
//! Success leaves checkpoint screenshots; failure leaves a screenshot and an
//! HTML dump next to them.
//!
//! # Example
//!
//! ```ignore
//! use araucaria_verify::{Runner, RunnerConfig, ServerConfig, scenarios};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunnerConfig::default().server(ServerConfig::default());
//!     let runner = Runner::new(config);
//!
//!     let scenario = scenarios::find("hero-titles")?;
//!     let report = runner.run(scenario.as_ref()).await;
//!     assert!(report.is_success(), "{:?}", report.outcome);
//!     Ok(())
//! }
//! ```
//!
//! # Readiness gate only
//!
//! ```ignore
//! use araucaria_verify::server::{DevServer, ReadinessGate, ReadinessProbe, ServerCommand};
//!
//! let gate = ReadinessGate::new(ReadinessProbe::vite());
//! let mut server = DevServer::start(&ServerCommand::default(), &gate).await?;
//! println!("{:?}", server.base_url());
//! server.shutdown().await?;
//! ```

pub mod artifacts;
pub mod config;
mod error;
pub mod guard;
pub mod intercept;
pub mod runner;
pub mod scenario;
pub mod scenarios;
pub mod server;
pub mod session;
pub mod wait;

pub use error::{Error, Result};

pub use artifacts::{ArtifactStore, ScenarioArtifacts};
pub use config::{
    BaseUrlConfig, BrowserKind, RunnerConfig, ServerConfig, SessionConfig, Timeouts, ViewportSize,
};
pub use guard::{DiagnosticTarget, guarded};
pub use intercept::{MockResponse, PaymentCode, PaymentCodeResponse, glob_matches, intercept};
pub use runner::{Outcome, RunReport, RunState, Runner, boot_check};
pub use scenario::{Scenario, ScenarioContext};
pub use session::BrowserSession;
