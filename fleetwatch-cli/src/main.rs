//! fleetwatch: keep a monitoring daemon's host inventory in sync with the
//! cloud.
//!
//! # Usage
//!
//! ```text
//! fleetwatch run   [--config <path>]
//! fleetwatch hosts [--config <path>] [--json]
//! fleetwatch check [--config <path>] [--verify]
//! ```
//!
//! Exit status: `0` success, `1` fatal error, `2` the generated configuration
//! was rejected or the daemon could not be restarted.

mod commands;
mod notifier;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{check::CheckArgs, hosts::HostsArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fleetwatch",
    version,
    about = "Sync cloud instances into monitoring host definitions",
    long_about = None,
)]
struct Cli {
    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover hosts, reconcile and push any change to the monitoring daemon.
    Run(RunArgs),

    /// Show the hosts recorded in the snapshot database.
    Hosts(HostsArgs),

    /// Validate the configuration and the snapshot database schema.
    Check(CheckArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Exit status `2`: a recovered, already-notified failure.
pub(crate) const EXIT_REPORTED_FAILURE: u8 = 2;

fn init_tracing(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log);

    let result: Result<ExitCode> = match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Hosts(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Check(args) => args.run(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
