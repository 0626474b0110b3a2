//! araucaria-verify - command-line entry point
//!
//! Lists and runs the booking site's verification scenarios, optionally
//! booting the Vite dev server first.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use araucaria_verify::server::{DEFAULT_READY_MARKER, DEFAULT_SERVER_COMMAND, ServerCommand};
use araucaria_verify::{
    BaseUrlConfig, BrowserKind, Outcome, RunReport, Runner, RunnerConfig, ServerConfig,
    SessionConfig, Timeouts, boot_check, scenarios,
};

/// Scripted browser checks for the Transportes Araucaria booking site
#[derive(Parser)]
#[command(name = "araucaria-verify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Base URL of a server that is already running
    #[arg(long, env = "ARAUCARIA_BASE_URL", global = true)]
    base_url: Option<Url>,

    /// Port on localhost, used when no base URL is given
    #[arg(long, env = "ARAUCARIA_PORT", global = true)]
    port: Option<u16>,

    /// Start the dev server and wait for it before running
    #[arg(long, global = true)]
    start_server: bool,

    /// Command that starts the dev server
    #[arg(long, env = "ARAUCARIA_SERVER_CMD", default_value = DEFAULT_SERVER_COMMAND, global = true)]
    server_cmd: String,

    /// Working directory for the dev server command
    #[arg(long, env = "ARAUCARIA_SERVER_DIR", global = true)]
    server_dir: Option<PathBuf>,

    /// Output substring that marks the server as ready
    #[arg(long, env = "ARAUCARIA_READY_MARKER", default_value = DEFAULT_READY_MARKER, global = true)]
    ready_marker: String,

    /// Poll this URL for readiness instead of watching output
    #[arg(long, env = "ARAUCARIA_HEALTH_URL", global = true)]
    health_url: Option<Url>,

    /// Seconds to wait for the dev server
    #[arg(long, env = "ARAUCARIA_READY_TIMEOUT", default_value_t = 30, global = true)]
    ready_timeout: u64,

    /// Directory for screenshots and failure dumps
    #[arg(long, env = "ARAUCARIA_ARTIFACTS_DIR", default_value = "verification", global = true)]
    artifacts_dir: PathBuf,

    /// Browser engine
    #[arg(long, env = "ARAUCARIA_BROWSER", value_enum, default_value_t = Browser::Chromium, global = true)]
    browser: Browser,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Reservation id used when simulating the payment gateway return
    #[arg(long, env = "ARAUCARIA_RESERVATION_ID", default_value = "12345", global = true)]
    reservation_id: String,

    /// Log output format
    #[arg(long, env = "ARAUCARIA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in scenarios
    List,

    /// Run scenarios in order
    Run {
        /// Scenario names (see `list`)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        scenarios: Vec<String>,

        /// Run every built-in scenario
        #[arg(long)]
        all: bool,
    },

    /// Start the dev server, report readiness and stop it
    BootCheck,
}

#[derive(Clone, Copy, ValueEnum)]
enum Browser {
    Chromium,
    Firefox,
    Webkit,
}

impl From<Browser> for BrowserKind {
    fn from(browser: Browser) -> Self {
        match browser {
            Browser::Chromium => BrowserKind::Chromium,
            Browser::Firefox => BrowserKind::Firefox,
            Browser::Webkit => BrowserKind::Webkit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

impl GlobalArgs {
    fn server_config(&self) -> ServerConfig {
        let mut command = ServerCommand::shell(self.server_cmd.clone());
        if let Some(dir) = &self.server_dir {
            command = command.current_dir(dir);
        }
        ServerConfig::default()
            .command(command)
            .ready_marker(self.ready_marker.clone())
            .health_url(self.health_url.clone())
    }

    fn runner_config(&self) -> RunnerConfig {
        let mut base_url = BaseUrlConfig::default();
        if let Some(url) = &self.base_url {
            base_url = base_url.url(url.clone());
        }
        if let Some(port) = self.port {
            base_url = base_url.port(port);
        }

        let timeouts = Timeouts {
            ready: Duration::from_secs(self.ready_timeout),
            ..Timeouts::default()
        };

        let mut config = RunnerConfig::default()
            .base_url(base_url)
            .session(
                SessionConfig::default()
                    .browser(self.browser.into())
                    .headless(!self.headed),
            )
            .timeouts(timeouts)
            .artifacts_dir(self.artifacts_dir.clone())
            .gateway_reservation_id(self.reservation_id.clone());
        if self.start_server {
            config = config.server(self.server_config());
        }
        config
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("araucaria_verify=info,araucaria_verify_cli=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_report(report: &RunReport) {
    let secs = report.elapsed.as_secs_f64();
    match &report.outcome {
        Outcome::Success => println!("PASS  {} ({:.1}s)", report.scenario, secs),
        Outcome::Failure { message, setup } => {
            let kind = if *setup { "SETUP" } else { "FAIL" };
            println!("{:<5} {} ({:.1}s)", kind, report.scenario, secs);
            for line in message.lines() {
                println!("      {}", line);
            }
        }
    }
    for warning in &report.warnings {
        println!("      warning: {}", warning);
    }
    for path in &report.artifacts {
        println!("      {}", path.display());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.global.log_format);

    match cli.command {
        Commands::List => {
            for scenario in scenarios::all() {
                println!("{:<20} {}", scenario.name(), scenario.description());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run { scenarios: names, all } => {
            let selected = if all {
                scenarios::all()
            } else {
                names
                    .iter()
                    .map(|name| scenarios::find(name))
                    .collect::<Result<Vec<_>, _>>()
                    .context("run `araucaria-verify list` to see available scenarios")?
            };
            if selected.is_empty() {
                bail!("no scenarios selected");
            }

            tracing::info!("Running {} scenario(s)", selected.len());
            let runner = Runner::new(cli.global.runner_config());
            let reports = runner.run_all(&selected).await;
            for report in &reports {
                print_report(report);
            }

            let failed = reports.iter().filter(|r| !r.is_success()).count();
            println!();
            println!("{} passed, {} failed", reports.len() - failed, failed);
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::BootCheck => {
            let config = cli.global.server_config();
            let timeout = Duration::from_secs(cli.global.ready_timeout);
            let ready = boot_check(&config, timeout)
                .await
                .with_context(|| format!("dev server '{}' did not become ready", cli.global.server_cmd))?;
            match ready.port {
                Some(port) => println!(
                    "Server ready on port {} after {:.1}s",
                    port,
                    ready.elapsed.as_secs_f64()
                ),
                None => println!(
                    "Server ready after {:.1}s: {}",
                    ready.elapsed.as_secs_f64(),
                    ready.line
                ),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
