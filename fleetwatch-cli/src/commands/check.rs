//! `fleetwatch check`: validate without touching the daemon or the snapshot.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use fleetwatch_daemon::ServiceManager;
use fleetwatch_sync::SnapshotStore;

use crate::EXIT_REPORTED_FAILURE;

/// Arguments for `fleetwatch check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration file (default: ~/.fleetwatch.yaml).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Also run the configured verify command against the current files.
    #[arg(long)]
    pub verify: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = super::load_config(self.config.as_deref())?;
        println!("{} configuration valid: {}", "✓".green(), config.schema);

        let location = &config.database.location;
        if location.exists() {
            let store = SnapshotStore::open(location, &config.schema)
                .with_context(|| format!("snapshot database {}", location.display()))?;
            println!(
                "{} snapshot database matches ({} hosts)",
                "✓".green(),
                store.len()?
            );
        } else {
            println!(
                "• snapshot database {} will be created on first run",
                location.display()
            );
        }

        let host_dir = &config.monitoring.host_dir;
        if !host_dir.is_dir() {
            bail!(
                "monitoring configuration path {} does not exist",
                host_dir.display()
            );
        }
        println!("{} output directory {}", "✓".green(), host_dir.display());

        if self.verify {
            let outcome = ServiceManager::new(
                &config.monitoring.test_config_cmd,
                &config.monitoring.restart_cmd,
            )
            .verify();
            if !outcome.ok {
                eprintln!("{} monitoring configuration rejected:", "✗".red());
                for line in outcome.output.lines() {
                    eprintln!("    {line}");
                }
                return Ok(ExitCode::from(EXIT_REPORTED_FAILURE));
            }
            println!("{} monitoring configuration verified", "✓".green());
        }

        Ok(ExitCode::SUCCESS)
    }
}
