//! Ensure command implementation

use anyhow::{Context, Result};
use clap::Args;
use hostid_core::{HostIdError, HostIdStore, Operation, Outcome};
use serde::Serialize;
use std::fs;

/// Arguments for the ensure command
#[derive(Args, Debug)]
pub struct EnsureArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct EnsureReport<'a> {
    id: &'a str,
    created: bool,
    path: String,
}

/// Read the identifier, provisioning the data directory and file on first run
pub fn execute(store: &HostIdStore, args: EnsureArgs) -> Result<()> {
    fs::create_dir_all(store.data_dir())
        .map_err(|e| HostIdError::from_io(Operation::CreateDir, store.data_dir(), e))
        .context("failed to create data directory")?;

    let provisioned = store
        .read_or_create_with_outcome()
        .with_context(|| format!("failed to obtain host identifier in {}", store.data_dir().display()))?;

    if args.json {
        let report = EnsureReport {
            id: provisioned.id.as_str(),
            created: provisioned.outcome == Outcome::Created,
            path: store.path().display().to_string(),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", provisioned.id);
    }

    Ok(())
}
