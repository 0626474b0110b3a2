// Readiness probes
//
// Decides when a freshly spawned server is ready to take traffic, based on
// its log output or on an HTTP health check.

use std::collections::VecDeque;
use std::process::ExitStatus;
use std::sync::LazyLock;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;

use crate::error::{Error, Result};

/// Substring Vite prints once the dev server is listening
pub const DEFAULT_READY_MARKER: &str = "ready in";

/// Pattern that captures the port from Vite's `Local:` URL
pub const DEFAULT_PORT_PATTERN: &str = r"http://localhost:(\d+)";

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI regex"));

/// How to recognise that the server is ready
#[derive(Debug, Clone)]
pub enum ReadinessProbe {
    /// Ready once any output line contains the marker
    Marker(String),
    /// Ready once the marker appears and a port can be parsed from the output
    ///
    /// The port is capture group 1 of `pattern`. It is searched from the
    /// marker line onward, so a URL printed on the line after the marker
    /// (as Vite does) is still found.
    MarkerWithPort { marker: String, pattern: Regex },
    /// Ready once a GET to `url` returns a 2xx status
    HealthCheck { url: url::Url },
}

impl ReadinessProbe {
    /// Marker-only probe
    pub fn marker(marker: impl Into<String>) -> Self {
        ReadinessProbe::Marker(marker.into())
    }

    /// Marker probe that also extracts a port with `pattern`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the pattern is not a valid regex or has no
    /// capture group.
    pub fn marker_with_port(marker: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid port pattern '{}': {}", pattern, e)))?;
        if pattern.captures_len() < 2 {
            return Err(Error::Config(format!(
                "port pattern '{}' needs a capture group for the port",
                pattern
            )));
        }
        Ok(ReadinessProbe::MarkerWithPort {
            marker: marker.into(),
            pattern,
        })
    }

    /// Vite's marker with the default `http://localhost:<port>` pattern
    pub fn vite() -> Self {
        ReadinessProbe::MarkerWithPort {
            marker: DEFAULT_READY_MARKER.to_string(),
            pattern: Regex::new(DEFAULT_PORT_PATTERN).expect("valid default port pattern"),
        }
    }

    /// HTTP health-check probe
    pub fn health_check(url: url::Url) -> Self {
        ReadinessProbe::HealthCheck { url }
    }

    /// Whether this probe is driven by output lines
    pub(crate) fn line_matcher(&self) -> Option<LineMatcher> {
        match self {
            ReadinessProbe::Marker(marker) => Some(LineMatcher::new(marker.clone(), None)),
            ReadinessProbe::MarkerWithPort { marker, pattern } => {
                Some(LineMatcher::new(marker.clone(), Some(pattern.clone())))
            }
            ReadinessProbe::HealthCheck { .. } => None,
        }
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        ReadinessProbe::marker(DEFAULT_READY_MARKER)
    }
}

/// Metadata about a server that signalled readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyInfo {
    /// Output line (or health-check URL) that satisfied the probe
    pub line: String,
    /// Port parsed from the output, if the probe extracts one
    pub port: Option<u16>,
    /// Time from spawn to readiness
    pub elapsed: Duration,
}

/// Typed result of waiting for readiness
#[derive(Debug)]
pub enum ReadinessOutcome {
    Ready(ReadyInfo),
    TimedOut {
        after: Duration,
        stderr_tail: Vec<String>,
    },
    ExitedEarly {
        status: ExitStatus,
        stderr_tail: Vec<String>,
    },
    PortNotFound {
        line: String,
    },
}

impl ReadinessOutcome {
    /// Replaces the captured stderr tail (used after the process was reaped)
    pub(crate) fn with_stderr_tail(self, tail: Vec<String>) -> Self {
        match self {
            ReadinessOutcome::TimedOut { after, .. } => ReadinessOutcome::TimedOut {
                after,
                stderr_tail: tail,
            },
            ReadinessOutcome::ExitedEarly { status, .. } => ReadinessOutcome::ExitedEarly {
                status,
                stderr_tail: tail,
            },
            other => other,
        }
    }

    /// Converts the outcome into the matching error variant
    pub fn into_result(self) -> Result<ReadyInfo> {
        match self {
            ReadinessOutcome::Ready(info) => Ok(info),
            ReadinessOutcome::TimedOut { after, stderr_tail } => {
                Err(Error::ReadinessTimeout { after, stderr_tail })
            }
            ReadinessOutcome::ExitedEarly {
                status,
                stderr_tail,
            } => Err(Error::ServerExited {
                status,
                stderr_tail,
            }),
            ReadinessOutcome::PortNotFound { line } => Err(Error::PortNotFound { line }),
        }
    }
}

/// Progress of a line-based probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineMatch {
    Waiting,
    /// Marker seen, port not yet found
    NeedPort,
    Ready { line: String, port: Option<u16> },
}

/// Incremental matcher fed one output line at a time
#[derive(Debug)]
pub(crate) struct LineMatcher {
    marker: String,
    port_pattern: Option<Regex>,
    marker_line: Option<String>,
    seen: String,
}

impl LineMatcher {
    pub(crate) fn new(marker: String, port_pattern: Option<Regex>) -> Self {
        Self {
            marker,
            port_pattern,
            marker_line: None,
            seen: String::new(),
        }
    }

    /// The line that contained the marker, once seen
    pub(crate) fn marker_line(&self) -> Option<&str> {
        self.marker_line.as_deref()
    }

    pub(crate) fn feed(&mut self, raw: &str) -> LineMatch {
        let line = strip_ansi(raw);

        if self.marker_line.is_none() {
            if !line.contains(&self.marker) {
                return LineMatch::Waiting;
            }
            self.marker_line = Some(line.trim().to_string());
        }
        self.seen.push_str(&line);
        self.seen.push('\n');

        let marker_line = self.marker_line.clone().unwrap_or_default();
        match &self.port_pattern {
            None => LineMatch::Ready {
                line: marker_line,
                port: None,
            },
            Some(pattern) => match extract_port(pattern, &self.seen) {
                Some(port) => LineMatch::Ready {
                    line: marker_line,
                    port: Some(port),
                },
                None => LineMatch::NeedPort,
            },
        }
    }
}

/// Extracts the port from capture group 1 of `pattern`
pub fn extract_port(pattern: &Regex, text: &str) -> Option<u16> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Removes ANSI colour/cursor escapes
pub fn strip_ansi(line: &str) -> String {
    ANSI_ESCAPE.replace_all(line, "").into_owned()
}

/// Bounded buffer holding the most recent lines of a stream
#[derive(Debug)]
pub struct OutputTail {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl OutputTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vite_matcher() -> LineMatcher {
        match ReadinessProbe::vite().line_matcher() {
            Some(m) => m,
            None => unreachable!("vite probe is line based"),
        }
    }

    #[test]
    fn test_port_on_marker_line() {
        let mut m = vite_matcher();
        let result = m.feed("  VITE v5.4.0  ready in 312 ms at http://localhost:5173/");
        assert_eq!(
            result,
            LineMatch::Ready {
                line: "VITE v5.4.0  ready in 312 ms at http://localhost:5173/".into(),
                port: Some(5173),
            }
        );
    }

    #[test]
    fn test_port_on_following_line() {
        let mut m = vite_matcher();
        assert_eq!(m.feed("> vite"), LineMatch::Waiting);
        assert_eq!(m.feed("  VITE v5.4.0  ready in 312 ms"), LineMatch::NeedPort);
        assert_eq!(m.feed(""), LineMatch::NeedPort);
        match m.feed("  ➜  Local:   http://localhost:5174/") {
            LineMatch::Ready { port, line } => {
                assert_eq!(port, Some(5174));
                assert_eq!(line, "VITE v5.4.0  ready in 312 ms");
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_colored_output_is_stripped() {
        let mut m = vite_matcher();
        let colored = "\x1b[32m\x1b[1mVITE\x1b[22m v5.4.0\x1b[39m  \x1b[2mready in \x1b[0m\x1b[1m300\x1b[22m ms  http://localhost:\x1b[1m5173\x1b[22m/";
        assert!(matches!(m.feed(colored), LineMatch::Ready { port: Some(5173), .. }));
    }

    #[test]
    fn test_marker_only_probe_has_no_port() {
        let mut m = match ReadinessProbe::default().line_matcher() {
            Some(m) => m,
            None => unreachable!(),
        };
        assert_eq!(
            m.feed("ready in 10 ms"),
            LineMatch::Ready {
                line: "ready in 10 ms".into(),
                port: None
            }
        );
    }

    #[test]
    fn test_url_before_marker_is_ignored() {
        let mut m = vite_matcher();
        assert_eq!(m.feed("proxy target http://localhost:8080"), LineMatch::Waiting);
        assert_eq!(m.feed("ready in 5 ms"), LineMatch::NeedPort);
        assert!(matches!(
            m.feed("Local: http://localhost:5173/"),
            LineMatch::Ready { port: Some(5173), .. }
        ));
    }

    #[test]
    fn test_pattern_without_group_is_rejected() {
        let err = ReadinessProbe::marker_with_port("ready", r"localhost:\d+").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_tail_keeps_most_recent_lines() {
        let tail = OutputTail::new(2);
        tail.push("a".into());
        tail.push("b".into());
        tail.push("c".into());
        assert_eq!(tail.snapshot(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_timeout_outcome_maps_to_timeout_error() {
        let outcome = ReadinessOutcome::TimedOut {
            after: Duration::from_secs(1),
            stderr_tail: vec![],
        }
        .with_stderr_tail(vec!["boom".into()]);
        match outcome.into_result() {
            Err(Error::ReadinessTimeout { stderr_tail, .. }) => assert_eq!(stderr_tail, vec!["boom"]),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
