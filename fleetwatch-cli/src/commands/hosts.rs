//! `fleetwatch hosts`: print the persisted snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{builder::Builder, settings::Style};

use fleetwatch_core::{HostRecord, Schema};
use fleetwatch_sync::SnapshotStore;

/// Arguments for `fleetwatch hosts`.
#[derive(Args, Debug)]
pub struct HostsArgs {
    /// Configuration file (default: ~/.fleetwatch.yaml).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl HostsArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.config.as_deref())?;
        let location = &config.database.location;

        let hosts = if location.exists() {
            SnapshotStore::open(location, &config.schema)
                .and_then(|store| store.all())
                .with_context(|| format!("failed to read snapshot database {}", location.display()))?
        } else {
            Vec::new()
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&hosts).context("failed to serialize hosts JSON")?
            );
            return Ok(());
        }

        print_table(&config.schema, &hosts);
        Ok(())
    }
}

fn print_table(schema: &Schema, hosts: &[HostRecord]) {
    println!(
        "fleetwatch v{} | {} hosts | identifier {}",
        env!("CARGO_PKG_VERSION"),
        hosts.len(),
        schema.identifier().bold(),
    );
    if hosts.is_empty() {
        println!("No hosts recorded. Run `fleetwatch run` first.");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(schema.fields().iter().cloned());
    for host in hosts {
        builder.push_record(
            schema
                .fields()
                .iter()
                .map(|field| host.get(field).unwrap_or_default().to_string()),
        );
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}
