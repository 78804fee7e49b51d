//! hostid - print or provision a node's persistent host identifier
//!
//! A thin CLI over `hostid-core`: the identifier lives in
//! `<data-dir>/host_uuid` and is created at most once, even when many
//! processes run `hostid ensure` at the same time.

use clap::Parser;

mod commands;

use commands::Cli;

fn main() {
    hostid_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e:#}");
        std::process::exit(commands::exit_code(&e));
    }
}
