// Error types for araucaria-verify

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for verification operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while booting the target or running a scenario
///
/// Variants are grouped by the stage that failed: setup, readiness,
/// navigation/element waits, and assertions. None of them are retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The server command could not be spawned at all
    #[error("Failed to start server command '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The readiness marker did not appear in time
    ///
    /// The process has already been killed and reaped when this is returned.
    #[error("Server not ready after {after:?}{}", format_tail(.stderr_tail))]
    ReadinessTimeout {
        after: Duration,
        stderr_tail: Vec<String>,
    },

    /// The server process exited before signalling readiness
    #[error("Server exited before becoming ready ({status}){}", format_tail(.stderr_tail))]
    ServerExited {
        status: ExitStatus,
        stderr_tail: Vec<String>,
    },

    /// The readiness marker matched but no port could be parsed from the output
    #[error("Server reported ready but no port was found in output: '{line}'")]
    PortNotFound { line: String },

    /// Browser or Playwright driver could not be launched
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// Invalid runner configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Navigation to a page failed or timed out
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    /// An element did not materialize within its wait timeout
    #[error("Element wait failed: {0}")]
    ElementWait(String),

    /// A polled condition did not become true in time
    #[error("Timed out after {after:?} waiting for {what}")]
    WaitTimeout { what: String, after: Duration },

    /// Observed UI state did not match the expectation
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Unknown scenario name
    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    /// A diagnostic or evidence artifact could not be written
    #[error("Failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other Playwright error
    #[error("Browser error: {0}")]
    Browser(playwright_rs::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error from a health-check probe
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// True for failures that happened before any browser step ran
    pub fn is_setup_failure(&self) -> bool {
        match self {
            Error::SpawnFailed { .. }
            | Error::ReadinessTimeout { .. }
            | Error::ServerExited { .. }
            | Error::PortNotFound { .. }
            | Error::BrowserLaunch(_)
            | Error::Config(_)
            | Error::UnknownScenario(_) => true,
            Error::Context(_, inner) => inner.is_setup_failure(),
            _ => false,
        }
    }
}

// Playwright reports assertion and wait failures through its own error type.
// Fold them into our taxonomy so callers can tell an element that never
// appeared from a browser that crashed.
impl From<playwright_rs::Error> for Error {
    fn from(err: playwright_rs::Error) -> Self {
        match err {
            playwright_rs::Error::AssertionTimeout(msg) => Error::Assertion(msg),
            playwright_rs::Error::Timeout(msg) => Error::ElementWait(msg),
            playwright_rs::Error::ElementNotFound(selector) => {
                Error::ElementWait(format!("no element matches '{}'", selector))
            }
            playwright_rs::Error::NavigationTimeout { url, duration_ms } => Error::Navigation {
                url,
                reason: format!("timed out after {}ms", duration_ms),
            },
            other => Error::Browser(other),
        }
    }
}

fn format_tail(tail: &[String]) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n--- server stderr ---\n{}", tail.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_timeout_maps_to_assertion() {
        let err: Error = playwright_rs::Error::AssertionTimeout("not visible".into()).into();
        assert!(matches!(err, Error::Assertion(ref m) if m == "not visible"));
    }

    #[test]
    fn test_navigation_timeout_keeps_url() {
        let err: Error = playwright_rs::Error::NavigationTimeout {
            url: "http://localhost:5173/".into(),
            duration_ms: 30000,
        }
        .into();
        match err {
            Error::Navigation { url, reason } => {
                assert_eq!(url, "http://localhost:5173/");
                assert!(reason.contains("30000"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_message_includes_stderr_tail() {
        let err = Error::ReadinessTimeout {
            after: Duration::from_secs(30),
            stderr_tail: vec!["npm ERR! missing script: dev".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("30s"));
        assert!(msg.contains("missing script"));
    }

    #[test]
    fn test_setup_classification_sees_through_context() {
        let err = Error::PortNotFound {
            line: "ready in 300 ms".into(),
        }
        .context("booting dev server");
        assert!(err.is_setup_failure());
        assert!(!Error::Assertion("x".into()).is_setup_failure());
    }
}
