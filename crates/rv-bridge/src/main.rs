//! rv-bridge: subscribe to Rendezvous subjects and print what arrives.
//!
//! # Usage
//!
//! ```text
//! rv-bridge [OPTIONS]
//!
//! Options:
//!   --config  <PATH>          Config file [default: platform config dir]
//!   --service <SERVICE>       Transport service (e.g. 7500)
//!   --network <NETWORK>       Transport network (e.g. ;239.1.1.1)
//!   --daemon  <DAEMON>        Transport daemon (e.g. tcp:7500)
//!   --subject <SUBJECT>       Subject to listen on, repeatable
//!   --param   <FLAG>          Library startup parameter, repeatable
//!   --backend <BACKEND>       simulated | native
//!   --inject  <SUBJECT=BODY>  Publish on the simulated bus at startup
//! ```
//!
//! Each received message is written to stdout as one JSON object per line:
//!
//! ```text
//! {"timestamp":"2026-01-05T10:00:00Z","send_subject":"A.B","reply_subject":"","message":"{}"}
//! ```
//!
//! Logs go to stderr.  Ctrl+C stops dispatching, releases the listeners and
//! the transport, and closes the library.  Any startup or dispatch failure
//! exits with status 1.
//!
//! # Environment variable overrides
//!
//! | Variable           | Flag        |
//! |--------------------|-------------|
//! | `RV_BRIDGE_CONFIG` | `--config`  |
//! | `RV_SERVICE`       | `--service` |
//! | `RV_NETWORK`       | `--network` |
//! | `RV_DAEMON`        | `--daemon`  |
//! | `RV_BACKEND`       | `--backend` |
//! | `RUST_LOG`         | log filter  |

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use rv_bridge::application::{start_subscriptions, BusSession};
use rv_bridge::infrastructure::logging::init_logging;
use rv_bridge::infrastructure::simulated::SimulatedBus;
use rv_bridge::infrastructure::storage::config::{
    load_config, load_config_from, AppConfig, Backend, ConfigError,
};
use rv_core::{BusLibrary, ReceivedMessage};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rendezvous subscriber that prints received messages as JSON lines.
///
/// Values given here override the config file.
#[derive(Debug, Parser)]
#[command(
    name = "rv-bridge",
    about = "Subscribe to TIBCO Rendezvous subjects and stream messages as JSON",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "RV_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Transport service (UDP port or service name).
    #[arg(long, env = "RV_SERVICE")]
    service: Option<String>,

    /// Transport network specification.
    #[arg(long, env = "RV_NETWORK")]
    network: Option<String>,

    /// Daemon to connect to.
    #[arg(long, env = "RV_DAEMON")]
    daemon: Option<String>,

    /// Subject to listen on.  Repeat for several subjects; replaces the
    /// configured list.
    #[arg(long = "subject")]
    subjects: Vec<String>,

    /// Library startup parameter, e.g. `--param=-reliability --param=3`.
    /// Replaces the configured list.
    #[arg(long = "param", allow_hyphen_values = true)]
    params: Vec<String>,

    /// Bus backend: `simulated` or `native`.
    #[arg(long, env = "RV_BACKEND")]
    backend: Option<String>,

    /// Message to publish on the simulated bus once listening starts.
    #[arg(long = "inject", value_parser = parse_injection)]
    injections: Vec<(String, String)>,
}

/// Splits `SUBJECT=BODY`.
fn parse_injection(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((subject, body)) if !subject.is_empty() => {
            Ok((subject.to_string(), body.to_string()))
        }
        _ => Err(format!("expected SUBJECT=BODY, got {value:?}")),
    }
}

impl Cli {
    /// Reads the config file named by `--config`, or the default one.
    fn load(&self) -> Result<AppConfig, ConfigError> {
        match &self.config {
            Some(path) => load_config_from(path),
            None => match load_config() {
                Err(ConfigError::NoPlatformConfigDir) => Ok(AppConfig::default()),
                other => other,
            },
        }
    }

    /// Overrides `config` with every flag that was given.
    fn apply(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Some(service) = &self.service {
            config.bus.service = service.clone();
        }
        if let Some(network) = &self.network {
            config.bus.network = network.clone();
        }
        if let Some(daemon) = &self.daemon {
            config.bus.daemon = daemon.clone();
        }
        if !self.subjects.is_empty() {
            config.bus.subjects = self.subjects.clone();
        }
        if !self.params.is_empty() {
            config.session.parameters = self.params.clone();
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.parse()?;
        }
        Ok(())
    }
}

// ── Backend selection ─────────────────────────────────────────────────────────

/// Returns the bus to run against, plus the simulated bus when that is it.
fn build_backend(
    backend: Backend,
) -> anyhow::Result<(Arc<dyn BusLibrary>, Option<Arc<SimulatedBus>>)> {
    match backend {
        Backend::Simulated => {
            let sim = Arc::new(SimulatedBus::new());
            let bus: Arc<dyn BusLibrary> = sim.clone();
            Ok((bus, Some(sim)))
        }
        Backend::Native => native_backend().map(|bus| (bus, None)),
    }
}

#[cfg(feature = "tibrv")]
fn native_backend() -> anyhow::Result<Arc<dyn BusLibrary>> {
    use rv_bridge::infrastructure::tibrv::NativeBus;
    Ok(Arc::new(NativeBus::new()?))
}

#[cfg(not(feature = "tibrv"))]
fn native_backend() -> anyhow::Result<Arc<dyn BusLibrary>> {
    anyhow::bail!("the native backend needs a build with `--features tibrv`")
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Writes `message` as one JSON line.
fn write_message(out: &mut impl Write, message: &ReceivedMessage) -> io::Result<()> {
    serde_json::to_writer(&mut *out, message)?;
    out.write_all(b"\n")?;
    out.flush()
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the config file.
/// 2. `tracing_subscriber` is initialised at the configured level.
/// 3. The library is initialized and the subscriptions are started.
/// 4. Messages are printed until Ctrl+C, or until dispatching fails.
/// 5. The subscription is shut down and the library closed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load().context("failed to load configuration")?;
    cli.apply(&mut config).context("invalid command-line option")?;
    config.validate().context("invalid configuration")?;

    init_logging(&config.logging.level);
    info!(backend = %config.backend, subjects = ?config.bus.subjects, "rv-bridge starting");

    let (bus, simulated) = build_backend(config.backend)?;

    let session = BusSession::initialize(bus, &config.session.parameters).map_err(|e| {
        error!("RV initialization failed: {e}");
        e
    })?;

    let mut subscription =
        match start_subscriptions(&session, &config.bus, &config.dispatch.to_options()) {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("failed to start subscriptions: {e}");
                if let Err(close_err) = session.close() {
                    warn!("{close_err}");
                }
                return Err(e.into());
            }
        };

    match &simulated {
        Some(sim) => {
            for (subject, body) in &cli.injections {
                let delivered = sim.publish(subject, None, body);
                info!(subject = %subject, delivered, "injected message");
            }
        }
        None if !cli.injections.is_empty() => {
            warn!("--inject only applies to the simulated backend; ignoring");
        }
        None => {}
    }

    // ── Main loop ─────────────────────────────────────────────────────────────
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut output_error = None;

    loop {
        tokio::select! {
            message = subscription.recv() => match message {
                Some(message) => {
                    if let Err(e) = write_message(&mut io::stdout().lock(), &message) {
                        error!("failed to write message to stdout: {e}");
                        output_error = Some(e);
                        break;
                    }
                }
                None => {
                    warn!("message channel closed");
                    break;
                }
            },
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C, shutting down");
                break;
            }
        }
    }

    // Joining the dispatch thread blocks.
    let outcome = tokio::task::spawn_blocking(move || subscription.shutdown())
        .await
        .context("shutdown task failed")?;

    if let Err(e) = session.close() {
        warn!("{e}");
    }

    if let Err(e) = outcome {
        error!("dispatching stopped with an error: {e}");
        return Err(e.into());
    }
    if let Some(e) = output_error {
        return Err(anyhow::Error::new(e).context("failed to write output"));
    }

    info!("rv-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
