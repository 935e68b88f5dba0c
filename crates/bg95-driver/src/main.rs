//! `bg95`: bring a BG95 modem online and publish telemetry over MQTT.
//!
//! Runs the connect-and-publish cycle against a serial port, a
//! serial-over-TCP bridge or the built-in scripted modem.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bg95_driver::{
    open_transport, Bg95, DriverConfig, DriverError, DriverResult, Session, TransportConfig,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// BG95 MQTT telemetry client
#[derive(Parser, Debug)]
#[command(name = "bg95")]
#[command(about = "Drive a Quectel BG95 modem through the connect-and-publish cycle")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overriding the configured transport
    #[arg(short, long, conflicts_with_all = ["tcp", "mock"])]
    serial: Option<String>,

    /// Baud rate for --serial
    #[arg(short, long, default_value_t = bg95_driver::config::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Serial-over-TCP bridge address (host:port)
    #[arg(long, conflicts_with = "mock")]
    tcp: Option<String>,

    /// Run against the built-in scripted modem, without delays
    #[arg(long)]
    mock: bool,

    /// Number of cycles to run; 0 runs until Ctrl-C
    #[arg(short = 'n', long, default_value_t = 1)]
    cycles: u64,

    /// Log every byte on the wire
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "trace" } else { "info,bg95_driver=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(true).init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> DriverResult<DriverConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            DriverConfig::load(path)?
        }
        None => DriverConfig::default(),
    };

    if let Some(port) = &cli.serial {
        config.transport = TransportConfig::Serial {
            port: port.clone(),
            baud_rate: cli.baud,
        };
    } else if let Some(address) = &cli.tcp {
        config.transport = TransportConfig::Tcp {
            address: address.clone(),
        };
    } else if cli.mock {
        config.transport = TransportConfig::Mock;
    }

    if config.transport == TransportConfig::Mock {
        config.workflow = config.workflow.without_delays();
    }

    config.validate()?;
    Ok(config)
}

/// Run the cycle loop; `Ok(false)` when every cycle failed.
fn run(cli: Cli) -> DriverResult<bool> {
    info!("bg95 v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&cli)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, stopping after the current step");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| DriverError::config(format!("cannot install Ctrl-C handler: {}", e)))?;

    let transport = open_transport(&config)?;
    let driver = Bg95::with_config(transport, &config.engine);
    let workflow = config.workflow.clone();
    let mut session = Session::new(driver, config).with_stop_flag(stop);

    let mut completed = 0u64;
    let mut failed = 0u64;
    while cli.cycles == 0 || completed + failed < cli.cycles {
        let cycle = completed + failed + 1;
        info!("Starting cycle {}", cycle);

        let delay = match session.run_cycle() {
            Ok(report) => {
                completed += 1;
                info!(
                    "Cycle {} done: {} published, {} failed",
                    cycle, report.published, report.failed_publishes
                );
                workflow.cycle_delay_ms
            }
            Err(DriverError::Interrupted) => break,
            Err(e) if e.is_transient() => {
                failed += 1;
                warn!("Cycle {} failed: {}", cycle, e);
                workflow.retry_delay_ms
            }
            Err(e) => return Err(e),
        };

        let more = cli.cycles == 0 || completed + failed < cli.cycles;
        if more && matches!(session.pause(delay), Err(DriverError::Interrupted)) {
            break;
        }
    }

    info!(
        "Finished: {} cycles completed, {} failed, {} messages generated",
        completed,
        failed,
        session.sequence()
    );
    Ok(completed > 0 || failed == 0)
}
