//! CLI for inspecting and driving existing Appium sessions.
//!
//! Every command attaches to a session that something else already started;
//! tapwright never creates or deletes sessions.
//!
//! # Usage
//!
//! ```bash
//! # Is the server up?
//! tapwright status
//!
//! # List live sessions with their platforms
//! tapwright sessions
//!
//! # Which platform is the attached session on?
//! tapwright --session-id 5f1c... platform
//!
//! # Tap an element by accessibility id (waits for it by default)
//! tapwright tap login-button
//! tapwright tap OK --no-wait
//!
//! # Wait for an element
//! tapwright wait-for spinner-id -o 10000
//!
//! # Save a screenshot to ./screenshots/home.png
//! tapwright screenshot home
//!
//! # Run a bundled scenario
//! tapwright run system-dialogs-skip
//!
//! # Point at a different server
//! tapwright --server http://10.0.0.5:4723 sessions
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tapwright_core::config::{logs_dir, ConfigError, HarnessConfig};
use tapwright_core::driver::DriverError;
use tapwright_core::error::HarnessError;
use tapwright_core::existing_driver::{ExistingDriver, SessionError};
use tapwright_core::fixture::BaseTest;
use tapwright_core::platform::Platform;
use tapwright_core::scenarios::{system_dialogs_skip, Outcome};
use tapwright_core::screenshot::{Screenshot, ScreenshotError};
use tapwright_core::webdriver::WebDriverClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI for inspecting and driving existing Appium sessions.
#[derive(Parser)]
#[command(name = "tapwright")]
#[command(about = "Drive an already-running Appium session")]
#[command(version)]
struct Cli {
    /// Automation server URL (overrides the config file)
    #[arg(long, global = true, env = "TAPWRIGHT_SERVER")]
    server: Option<String>,

    /// Attach to this session id instead of discovering one
    #[arg(long, global = true, env = "TAPWRIGHT_SESSION_ID")]
    session_id: Option<String>,

    /// Platform to assume when the session does not report one
    #[arg(long, global = true, value_enum, ignore_case = true)]
    platform: Option<PlatformArg>,

    /// Config file to load instead of ~/.tapwright/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Write logs to ~/.tapwright/logs/tapwright.log instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
enum PlatformArg {
    Ios,
    Android,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Ios => Platform::Ios,
            PlatformArg::Android => Platform::Android,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Query the server's readiness
    Status,

    /// List live sessions on the server
    Sessions,

    /// Print the platform of the attached session
    Platform,

    /// Tap an element by accessibility id
    Tap {
        /// Accessibility id of the element
        accessibility_id: String,
        /// Skip waiting for the element to become interactable
        #[arg(long)]
        no_wait: bool,
        /// Timeout in milliseconds when waiting
        #[arg(short = 'o', long, env = "TAPWRIGHT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Wait for an element to become interactable
    WaitFor {
        /// Accessibility id of the element
        accessibility_id: String,
        /// Timeout in milliseconds
        #[arg(short = 'o', long, env = "TAPWRIGHT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Save a screenshot as <dir>/<name>.png
    Screenshot {
        /// File name without extension
        name: String,
        /// Output directory (defaults to the configured screenshot dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Run a bundled scenario against the attached session
    Run {
        #[command(subcommand)]
        scenario: Scenario,
    },
}

#[derive(Subcommand)]
enum Scenario {
    /// Dismiss the iOS system "OK" dialog, screenshotting on enter and exit
    SystemDialogsSkip,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Bad flags and values are configuration errors; help and version are not.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(3);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _guard = if cli.log_file {
        let file_appender = tracing_appender::rolling::never(logs_dir(), "tapwright.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    Connection(String),
    ActionFailed(String),
    Config(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::ActionFailed(_) => ExitCode::from(1),
            CliError::Connection(_) => ExitCode::from(2),
            CliError::Config(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::ActionFailed(msg) => write!(f, "Action failed: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Connection(e.to_string())
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::ConnectionLost(_)
            | DriverError::Timeout
            | DriverError::InvalidSession(_) => CliError::Connection(e.to_string()),
            _ => CliError::ActionFailed(e.to_string()),
        }
    }
}

impl From<ScreenshotError> for CliError {
    fn from(e: ScreenshotError) -> Self {
        match e {
            ScreenshotError::Capture(inner) => inner.into(),
            other => CliError::ActionFailed(other.to_string()),
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(e: HarnessError) -> Self {
        match e {
            HarnessError::Session(inner) => inner.into(),
            HarnessError::Driver(inner) => inner.into(),
            HarnessError::Screenshot(inner) => inner.into(),
        }
    }
}

/// Merge the config file with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<HarnessConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::load_if_exists(&HarnessConfig::default_path())?,
    };
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(id) = &cli.session_id {
        config.session_id = Some(id.clone());
    }
    if let Some(platform) = cli.platform {
        config.platform = Some(platform.into());
    }
    Ok(config)
}

fn client(config: &HarnessConfig) -> Result<WebDriverClient, CliError> {
    WebDriverClient::new(&config.server_url, config.request_timeout())
        .map_err(|e| CliError::Config(e.to_string()))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = resolve_config(&cli)?;
    info!(server = %config.server_url, "tapwright starting");

    match cli.command {
        Command::Status => {
            let status = client(&config)?.status().await?;
            if cli.format == OutputFormat::Json {
                println!("{}", status);
            } else {
                let ready = status.get("ready").and_then(|v| v.as_bool()).unwrap_or(false);
                let message = status.get("message").and_then(|v| v.as_str()).unwrap_or("");
                println!("ready: {}", ready);
                if !message.is_empty() {
                    println!("message: {}", message);
                }
            }
        }

        Command::Sessions => {
            let sessions = client(&config)?.list_sessions().await?;
            if cli.format == OutputFormat::Json {
                let entries: Vec<_> = sessions
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "id": s.id,
                            "platform": Platform::from_capabilities(&s.capabilities)
                                .map(|p| p.to_string()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::json!({ "sessions": entries }));
            } else if sessions.is_empty() {
                eprintln!("No live sessions on {}", config.server_url);
            } else {
                for session in &sessions {
                    let platform = Platform::from_capabilities(&session.capabilities)
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("{}\t{}", session.id, platform);
                }
            }
        }

        Command::Platform => {
            let existing = ExistingDriver::attach(&config).await?;
            if cli.format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "session_id": existing.driver().session_id(),
                        "platform": existing.platform(),
                    })
                );
            } else {
                println!("{}", existing.platform());
            }
        }

        Command::Tap {
            accessibility_id,
            no_wait,
            timeout,
        } => {
            if let Some(ms) = timeout {
                config.wait.timeout_ms = ms;
            }
            let t = BaseTest::setup(&config).await?;
            if no_wait {
                t.driver().tap_element(&accessibility_id).await?;
            } else {
                t.tap(&accessibility_id).await?;
            }
            eprintln!("Tapped {}", accessibility_id);
        }

        Command::WaitFor {
            accessibility_id,
            timeout,
        } => {
            if let Some(ms) = timeout {
                config.wait.timeout_ms = ms;
            }
            let t = BaseTest::setup(&config).await?;
            let element = t.wait_for(&accessibility_id).await?;
            if cli.format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "accessibility_id": element.accessibility_id,
                        "element_id": element.id,
                    })
                );
            } else {
                eprintln!("Found {}", element.accessibility_id);
            }
        }

        Command::Screenshot { name, dir } => {
            let shot = Screenshot::new(name)?
                .in_dir(dir.unwrap_or_else(|| config.screenshot_dir.clone()));
            let t = BaseTest::setup(&config).await?;
            let path = shot.save(t.driver()).await?;
            println!("{}", path.display());
        }

        Command::Run { scenario } => {
            let t = BaseTest::setup(&config).await?;
            match scenario {
                Scenario::SystemDialogsSkip => {
                    let entered = system_dialogs_skip::enter(&t).await?;
                    let exited = system_dialogs_skip::exit(&t).await?;
                    report_step(cli.format, "enter", entered);
                    report_step(cli.format, "exit", exited);
                }
            }
        }
    }

    Ok(())
}

fn report_step(format: OutputFormat, step: &str, outcome: Outcome) {
    let label = match outcome {
        Outcome::Completed => "completed",
        Outcome::Skipped => "skipped",
    };
    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "step": step, "outcome": label }));
    } else {
        println!("{}: {}", step, label);
    }
}
