// Dev server process management
//
// Spawns the target web server, waits for it to signal readiness, and owns
// the process until shutdown. A server that never becomes ready is always
// killed and reaped before the error reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::server::command::ServerCommand;
use crate::server::readiness::{
    LineMatch, OutputTail, ReadinessOutcome, ReadinessProbe, ReadyInfo,
};

/// Default time allowed for the server to signal readiness
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time to keep reading after the marker when a port is expected
pub const DEFAULT_PORT_GRACE: Duration = Duration::from_secs(2);

/// Number of stderr lines kept for diagnostics
const STDERR_TAIL_LINES: usize = 50;

/// Upper bound for a single health-check request
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a reaped process gets to flush its last output lines
const DRAIN_AFTER_EXIT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

#[derive(Debug)]
pub(crate) struct OutputLine {
    pub(crate) stream: StreamKind,
    pub(crate) text: String,
}

/// Waits for a spawned process to satisfy a [`ReadinessProbe`]
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    probe: ReadinessProbe,
    timeout: Duration,
    port_grace: Duration,
    poll_interval: Duration,
}

impl ReadinessGate {
    pub fn new(probe: ReadinessProbe) -> Self {
        Self {
            probe,
            timeout: DEFAULT_READY_TIMEOUT,
            port_grace: DEFAULT_PORT_GRACE,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Sets the overall readiness timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how long to keep reading for a port after the marker matched
    pub fn with_port_grace(mut self, grace: Duration) -> Self {
        self.port_grace = grace;
        self
    }

    /// Sets the health-check polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn probe(&self) -> &ReadinessProbe {
        &self.probe
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Watches `child` and its output until the probe is satisfied, the
    /// process exits, or the timeout elapses.
    ///
    /// This never kills the process; the caller decides what to do with a
    /// non-ready outcome.
    pub(crate) async fn wait(
        &self,
        child: &mut Child,
        lines: &mut mpsc::UnboundedReceiver<OutputLine>,
        stderr: &OutputTail,
    ) -> Result<ReadinessOutcome> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut matcher = self.probe.line_matcher();
        let mut port_deadline: Option<Instant> = None;
        let mut streams_open = true;

        let health = match &self.probe {
            ReadinessProbe::HealthCheck { url } => Some((
                reqwest::Client::builder().build()?,
                url.clone(),
            )),
            _ => None,
        };
        let mut health_tick = tokio::time::interval(self.poll_interval);

        loop {
            let wake = port_deadline.map_or(deadline, |d| d.min(deadline));

            tokio::select! {
                line = lines.recv(), if streams_open => {
                    let Some(line) = line else {
                        // Both pipes closed. The process is gone or about to be.
                        streams_open = false;
                        if let Some(marker_line) = matcher.as_ref().and_then(|m| m.marker_line()) {
                            return Ok(ReadinessOutcome::PortNotFound {
                                line: marker_line.to_string(),
                            });
                        }
                        continue;
                    };
                    let Some(matcher) = matcher.as_mut() else {
                        continue;
                    };
                    let stream = line.stream;
                    match matcher.feed(&line.text) {
                        LineMatch::Ready { line, port } => {
                            tracing::info!(
                                port = ?port,
                                stream = stream.as_str(),
                                "Server ready: {}",
                                line
                            );
                            return Ok(ReadinessOutcome::Ready(ReadyInfo {
                                line,
                                port,
                                elapsed: start.elapsed(),
                            }));
                        }
                        LineMatch::NeedPort => {
                            if port_deadline.is_none() {
                                tracing::debug!(
                                    stream = stream.as_str(),
                                    "Readiness marker seen, waiting up to {:?} for a port",
                                    self.port_grace
                                );
                                port_deadline = Some(Instant::now() + self.port_grace);
                            }
                        }
                        LineMatch::Waiting => {}
                    }
                }
                status = child.wait() => {
                    let status = status?;
                    tracing::warn!("Server exited before becoming ready: {}", status);
                    drain(lines, DRAIN_AFTER_EXIT).await;
                    return Ok(ReadinessOutcome::ExitedEarly {
                        status,
                        stderr_tail: stderr.snapshot(),
                    });
                }
                _ = health_tick.tick(), if health.is_some() => {
                    if let Some((client, url)) = &health {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            continue;
                        }
                        if probe_health(client, url, remaining.min(HEALTH_REQUEST_TIMEOUT)).await {
                            tracing::info!("Server ready: health check {} passed", url);
                            return Ok(ReadinessOutcome::Ready(ReadyInfo {
                                line: url.to_string(),
                                port: url.port_or_known_default(),
                                elapsed: start.elapsed(),
                            }));
                        }
                    }
                }
                _ = tokio::time::sleep_until(wake) => {
                    if let (Some(port_at), Some(m)) = (port_deadline, matcher.as_ref()) {
                        if Instant::now() >= port_at {
                            return Ok(ReadinessOutcome::PortNotFound {
                                line: m.marker_line().unwrap_or_default().to_string(),
                            });
                        }
                    }
                    return Ok(ReadinessOutcome::TimedOut {
                        after: self.timeout,
                        stderr_tail: stderr.snapshot(),
                    });
                }
            }
        }
    }
}

async fn probe_health(client: &reqwest::Client, url: &url::Url, timeout: Duration) -> bool {
    match client.get(url.clone()).timeout(timeout).send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) => {
            tracing::debug!("Health check returned {}", resp.status());
            false
        }
        Err(e) => {
            // Connection refused is expected while the server is starting
            if !e.is_connect() {
                tracing::debug!("Health check error: {}", e);
            }
            false
        }
    }
}

/// Receives whatever the reader tasks still have, for at most `limit`
async fn drain(lines: &mut mpsc::UnboundedReceiver<OutputLine>, limit: Duration) {
    let _ = tokio::time::timeout(limit, async {
        while lines.recv().await.is_some() {}
    })
    .await;
}

fn spawn_reader<R>(
    reader: R,
    stream: StreamKind,
    tx: mpsc::UnboundedSender<OutputLine>,
    tail: Option<Arc<OutputTail>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    tracing::debug!(stream = stream.as_str(), "[server] {}", text);
                    if let Some(tail) = &tail {
                        tail.push(text.clone());
                    }
                    // The gate stops listening once the server is ready
                    let _ = tx.send(OutputLine { stream, text });
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(stream = stream.as_str(), "Server output read error: {}", e);
                    break;
                }
            }
        }
    })
}

/// A running server that has signalled readiness
///
/// # Example
///
/// ```ignore
/// use araucaria_verify::server::{DevServer, ReadinessGate, ReadinessProbe, ServerCommand};
///
/// let gate = ReadinessGate::new(ReadinessProbe::vite());
/// let server = DevServer::start(&ServerCommand::shell("npm run dev"), &gate).await?;
/// println!("listening on {:?}", server.ready().port);
/// server.shutdown().await?;
/// ```
#[derive(Debug)]
pub struct DevServer {
    process: Child,
    group: Option<u32>,
    command: String,
    ready: ReadyInfo,
    stderr: Arc<OutputTail>,
    readers: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl DevServer {
    /// Spawns `command` and waits for `gate` to report readiness.
    ///
    /// # Errors
    ///
    /// - `Error::SpawnFailed` if the process could not be started
    /// - `Error::ReadinessTimeout` if the probe was not satisfied in time
    /// - `Error::ServerExited` if the process exited first
    /// - `Error::PortNotFound` if the marker matched but no port was printed
    ///
    /// In every error case after a successful spawn the process has been
    /// killed and waited for.
    pub async fn start(command: &ServerCommand, gate: &ReadinessGate) -> Result<Self> {
        let command_line = command.to_string();
        tracing::info!("Starting server: {}", command_line);

        let mut process = command.to_command().spawn().map_err(|source| Error::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;
        // The child leads its own group; the id stays valid for killpg after
        // the leader has been reaped.
        let group = process.id();

        let stderr = Arc::new(OutputTail::new(STDERR_TAIL_LINES));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = process.stdout.take() {
            readers.push(spawn_reader(out, StreamKind::Stdout, tx.clone(), None));
        }
        if let Some(err) = process.stderr.take() {
            readers.push(spawn_reader(
                err,
                StreamKind::Stderr,
                tx.clone(),
                Some(stderr.clone()),
            ));
        }
        drop(tx);

        let outcome = gate.wait(&mut process, &mut rx, &stderr).await;
        drop(rx);

        let result = match outcome {
            Ok(ReadinessOutcome::Ready(ready)) => Ok(ready),
            Ok(failed) => {
                terminate(&mut process, group).await;
                // Stderr may have grown while the process was dying
                failed.with_stderr_tail(stderr.snapshot()).into_result()
            }
            Err(e) => {
                terminate(&mut process, group).await;
                Err(e.context(format!("waiting for '{}'", command_line)))
            }
        };

        match result {
            Ok(ready) => Ok(Self {
                process,
                group,
                command: command_line,
                ready,
                stderr,
                readers,
                stopped: false,
            }),
            Err(e) => {
                abort_readers(&mut readers);
                Err(e)
            }
        }
    }

    /// Readiness metadata, including the discovered port if any
    pub fn ready(&self) -> &ReadyInfo {
        &self.ready
    }

    /// The command line this server was started with
    pub fn command(&self) -> &str {
        &self.command
    }

    /// `http://localhost:<port>` for a server whose port was discovered
    pub fn base_url(&self) -> Option<url::Url> {
        self.ready
            .port
            .and_then(|port| url::Url::parse(&format!("http://localhost:{}", port)).ok())
    }

    /// Most recent stderr lines
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr.snapshot()
    }

    /// OS process id, while the process is running
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Stops the server and waits for it to exit. Safe to call twice.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        tracing::info!("Stopping server: {}", self.command);
        terminate(&mut self.process, self.group).await;
        abort_readers(&mut self.readers);
        Ok(())
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if !self.stopped {
            // Best effort; kill_on_drop covers the direct child
            #[cfg(unix)]
            {
                if let Some(pgid) = self.group {
                    signal_group(pgid, libc::SIGKILL);
                }
            }
            let _ = self.process.start_kill();
            abort_readers(&mut self.readers);
        }
    }
}

fn abort_readers(readers: &mut Vec<JoinHandle<()>>) {
    for handle in readers.drain(..) {
        handle.abort();
    }
}

/// Terminates the process (and on Unix its process group `group`), then
/// reaps it.
///
/// Sends SIGTERM first so Node can tear down its own children, escalating to
/// SIGKILL if the process is still alive after a short grace period. The
/// group is killed even when the leader has already exited, so children it
/// left behind do not outlive the run.
pub(crate) async fn terminate(process: &mut Child, group: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = group {
            if process.id().is_some() {
                signal_group(pgid, libc::SIGTERM);
                match tokio::time::timeout(Duration::from_secs(2), process.wait()).await {
                    Ok(Ok(status)) => tracing::debug!("Server exited after SIGTERM: {}", status),
                    Ok(Err(e)) => tracing::warn!("Failed to wait for server: {}", e),
                    Err(_) => tracing::debug!("Server ignored SIGTERM, killing"),
                }
            }
            signal_group(pgid, libc::SIGKILL);
            if process.id().is_none() {
                return;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = group;

    if let Err(e) = process.kill().await {
        tracing::debug!("Kill after exit: {}", e);
    }

    // Wait for process to exit
    match tokio::time::timeout(Duration::from_secs(5), process.wait()).await {
        Ok(Ok(status)) => tracing::debug!("Server reaped: {}", status),
        Ok(Err(e)) => tracing::warn!("Failed to wait for server: {}", e),
        Err(_) => tracing::warn!("Server did not exit within 5s of SIGKILL"),
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child
    // via process_group(0), so it cannot address unrelated processes.
    // ESRCH once the group is empty is expected and ignored.
    unsafe {
        libc::killpg(pgid, signal);
    }
}
