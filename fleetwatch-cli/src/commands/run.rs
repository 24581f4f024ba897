//! `fleetwatch run`: one discovery and reconciliation pass.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fleetwatch_sync::{Pipeline, RunOutcome, RunStatus, SnapshotStore, WriteResult};

use crate::notifier;
use crate::EXIT_REPORTED_FAILURE;

/// Arguments for `fleetwatch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (default: ~/.fleetwatch.yaml).
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = super::load_config(self.config.as_deref())?;

        let discovered = fleetwatch_discovery::discover(&config.inventory, &config.mapping)
            .context("host discovery failed")?;
        tracing::info!("discovered {} hosts", discovered.len());

        let mut store = SnapshotStore::open(&config.database.location, &config.schema)
            .with_context(|| {
                format!(
                    "failed to open snapshot database {}",
                    config.database.location.display()
                )
            })?;

        let notifier = notifier::from_config(&config.notifications);
        let pipeline =
            Pipeline::from_config(&config, notifier.as_ref(), notifier::local_hostname());
        let outcome = pipeline
            .run(&mut store, &discovered)
            .context("reconciliation failed")?;

        print_outcome(&outcome);
        if outcome.is_failure() {
            return Ok(ExitCode::from(EXIT_REPORTED_FAILURE));
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let files = match &outcome.status {
        RunStatus::NoChanges => {
            println!("✓ host list unchanged, nothing to do");
            return;
        }
        RunStatus::Published { files, downtime } => {
            println!(
                "✓ {} host changes published, downtime scheduled for {}",
                outcome.changes.len(),
                downtime.len()
            );
            files
        }
        RunStatus::VerifyFailed { files, output } => {
            eprintln!("{} monitoring configuration rejected:", "✗".red());
            for line in output.lines() {
                eprintln!("    {line}");
            }
            files
        }
        RunStatus::RestartFailed { files } => {
            eprintln!("{} monitoring daemon restart failed", "✗".red());
            files
        }
    };

    for id in outcome.changes.added() {
        println!("  {} {id}", "+".green());
    }
    for id in outcome.changes.removed() {
        println!("  {} {id}", "-".red());
    }
    for (id, fields) in outcome.changes.updated() {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        println!("  {} {id} ({})", "~".yellow(), fields.join(", "));
    }
    for result in files {
        match result {
            WriteResult::Written { path, hosts } => {
                println!("  ✎ {} ({hosts} hosts)", path.display());
            }
            WriteResult::Removed { path } => {
                println!("  ✗ {}", path.display());
            }
        }
    }
}
