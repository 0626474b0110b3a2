// Runner configuration
//
// Typed settings for a verification run: where the target lives, how to boot
// it, which browser to drive, and how long each kind of wait may take.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::server::{
    DEFAULT_PORT_PATTERN, DEFAULT_READY_MARKER, DEFAULT_READY_TIMEOUT, ReadinessGate,
    ReadinessProbe, ServerCommand,
};

/// Base URL used when nothing else is configured (Vite's default port)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Default artifacts directory, relative to the working directory
pub const DEFAULT_ARTIFACTS_DIR: &str = "verification";

/// Reservation id used by the simulated payment gateway return
pub const DEFAULT_GATEWAY_RESERVATION_ID: &str = "12345";

/// Browser engine to launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(Error::Config(format!(
                "unknown browser '{}' (expected chromium, firefox or webkit)",
                other
            ))),
        }
    }
}

/// Page size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Browser session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    /// `None` keeps Playwright's default viewport
    pub viewport: Option<ViewportSize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            viewport: None,
        }
    }
}

impl SessionConfig {
    pub fn browser(mut self, browser: BrowserKind) -> Self {
        self.browser = browser;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some(ViewportSize::new(width, height));
        self
    }
}

/// Upper bounds for every kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Page navigation
    pub navigation: Duration,
    /// Element actionability (fill, click, select)
    pub element: Duration,
    /// Visibility/checked assertions
    pub assertion: Duration,
    /// Dev server readiness
    pub ready: Duration,
    /// Poll interval for condition waits
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            element: Duration::from_secs(10),
            assertion: Duration::from_secs(5),
            ready: DEFAULT_READY_TIMEOUT,
            poll: Duration::from_millis(100),
        }
    }
}

/// How to boot the dev server when the runner owns it
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub command: ServerCommand,
    pub ready_marker: String,
    /// Regex whose first capture group is the port; `None` disables port discovery
    pub port_pattern: Option<String>,
    /// Poll this URL instead of matching output
    pub health_url: Option<Url>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: ServerCommand::default(),
            ready_marker: DEFAULT_READY_MARKER.to_string(),
            port_pattern: Some(DEFAULT_PORT_PATTERN.to_string()),
            health_url: None,
        }
    }
}

impl ServerConfig {
    pub fn command(mut self, command: ServerCommand) -> Self {
        self.command = command;
        self
    }

    pub fn ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = marker.into();
        self
    }

    pub fn port_pattern(mut self, pattern: Option<String>) -> Self {
        self.port_pattern = pattern;
        self
    }

    pub fn health_url(mut self, url: Option<Url>) -> Self {
        self.health_url = url;
        self
    }

    /// Builds the readiness probe these settings describe
    pub fn probe(&self) -> Result<ReadinessProbe> {
        if let Some(url) = &self.health_url {
            return Ok(ReadinessProbe::health_check(url.clone()));
        }
        match &self.port_pattern {
            Some(pattern) => ReadinessProbe::marker_with_port(self.ready_marker.clone(), pattern),
            None => Ok(ReadinessProbe::marker(self.ready_marker.clone())),
        }
    }

    /// Builds a gate with the given overall timeout
    pub fn gate(&self, timeout: Duration) -> Result<ReadinessGate> {
        Ok(ReadinessGate::new(self.probe()?).with_timeout(timeout))
    }
}

/// Inputs for base URL resolution
///
/// Precedence: explicit URL, then a port discovered from the dev server, then
/// an explicit port, then [`DEFAULT_BASE_URL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrlConfig {
    pub url: Option<Url>,
    pub port: Option<u16>,
}

impl BaseUrlConfig {
    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn resolve(&self, discovered_port: Option<u16>) -> Result<Url> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let raw = match discovered_port.or(self.port) {
            Some(port) => format!("http://localhost:{}", port),
            None => DEFAULT_BASE_URL.to_string(),
        };
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid base URL '{}': {}", raw, e)))
    }
}

/// Everything a verification run needs
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: BaseUrlConfig,
    pub session: SessionConfig,
    pub timeouts: Timeouts,
    /// Start and own the dev server when set
    pub server: Option<ServerConfig>,
    pub artifacts_dir: PathBuf,
    /// Reservation id for the simulated gateway return in `payment-flow`
    pub gateway_reservation_id: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: BaseUrlConfig::default(),
            session: SessionConfig::default(),
            timeouts: Timeouts::default(),
            server: None,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            gateway_reservation_id: DEFAULT_GATEWAY_RESERVATION_ID.to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn base_url(mut self, base_url: BaseUrlConfig) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn gateway_reservation_id(mut self, id: impl Into<String>) -> Self {
        self.gateway_reservation_id = id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_url_wins() {
        let cfg = BaseUrlConfig::default()
            .url(Url::parse("http://staging.example:8080/").unwrap())
            .port(4000);
        assert_eq!(
            cfg.resolve(Some(5174)).unwrap().as_str(),
            "http://staging.example:8080/"
        );
    }

    #[test]
    fn test_discovered_port_beats_explicit_port() {
        let cfg = BaseUrlConfig::default().port(4000);
        assert_eq!(cfg.resolve(Some(5174)).unwrap().as_str(), "http://localhost:5174/");
        assert_eq!(cfg.resolve(None).unwrap().as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(
            BaseUrlConfig::default().resolve(None).unwrap().as_str(),
            "http://localhost:5173/"
        );
    }

    #[test]
    fn test_browser_kind_parse() {
        assert_eq!("Firefox".parse::<BrowserKind>().unwrap(), BrowserKind::Firefox);
        assert_eq!("chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert!("lynx".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn test_server_probe_selection() {
        let marker_only = ServerConfig::default().port_pattern(None);
        assert!(matches!(marker_only.probe().unwrap(), ReadinessProbe::Marker(ref m) if m == "ready in"));

        let with_port = ServerConfig::default();
        assert!(matches!(with_port.probe().unwrap(), ReadinessProbe::MarkerWithPort { .. }));

        let health = ServerConfig::default()
            .health_url(Some(Url::parse("http://localhost:3001/health").unwrap()));
        assert!(matches!(health.probe().unwrap(), ReadinessProbe::HealthCheck { .. }));
    }
}
