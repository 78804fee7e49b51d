//! CLI command dispatch and execution

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hostid_core::{resolve_config, ConfigOverrides, ErrorKind, HostIdError, HostIdStore};
use std::path::PathBuf;

mod ensure;
mod path;
mod show;

/// hostid - persistent host identifier for a data directory
#[derive(Parser, Debug)]
#[command(
    name = "hostid",
    version,
    about = "Print or provision a node's persistent host identifier",
    long_about = "Reads the host identifier stored in a data directory, creating it exactly once \
                  even when several processes start at the same time"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Data directory holding the identity file
    #[arg(long, global = true, env = "HOSTID_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Attempts before giving up when the lock stays busy
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Sleep between attempts that found the lock busy, in milliseconds
    #[arg(long, global = true)]
    retry_backoff_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the identity file path
    Path,

    /// Print the stored identifier; fails if none exists
    Show,

    /// Print the stored identifier, creating it if absent
    Ensure(ensure::EnsureArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let store = self.global.store()?;
        match self.command {
            Commands::Path => path::execute(&store),
            Commands::Show => show::execute(&store),
            Commands::Ensure(args) => ensure::execute(&store, args),
        }
    }
}

impl GlobalArgs {
    fn store(&self) -> Result<HostIdStore> {
        let data_dir = self
            .data_dir
            .clone()
            .context("no data directory given (use --data-dir or HOSTID_DATA_DIR)")?;
        let overrides = ConfigOverrides {
            config_path: self.config.clone(),
            file_name: None,
            max_attempts: self.max_attempts,
            retry_backoff_ms: self.retry_backoff_ms,
        };
        let config = resolve_config(&overrides).context("failed to load configuration")?;
        HostIdStore::with_config(data_dir, config).context("invalid configuration")
    }
}

/// Process exit status for a failed command
///
/// Follows `sysexits.h` so supervisors can tell operator problems apart from
/// transient ones.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<HostIdError>().map(HostIdError::kind) {
        Some(ErrorKind::PermissionDenied) => 77,
        Some(ErrorKind::EntropyUnavailable) => 69,
        Some(ErrorKind::LimitExceeded) => 75,
        Some(ErrorKind::Io) => 74,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostid_core::EntropyError;

    #[test]
    fn test_cli_parses_global_args_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hostid",
            "ensure",
            "--data-dir",
            "/tmp/node",
            "--max-attempts",
            "5",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.global.data_dir, Some(PathBuf::from("/tmp/node")));
        assert_eq!(cli.global.max_attempts, Some(5));
        assert!(matches!(cli.command, Commands::Ensure(ref a) if a.json));
    }

    #[test]
    fn test_exit_code_by_kind() {
        let entropy: anyhow::Error = HostIdError::from(EntropyError::new("empty")).into();
        assert_eq!(exit_code(&entropy), 69);

        let limit: anyhow::Error = HostIdError::LimitExceeded {
            path: PathBuf::from("/d/host_uuid.lock"),
            attempts: 3,
        }
        .into();
        assert_eq!(exit_code(&limit.context("failed to provision")), 75);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
