//! Path command implementation

use anyhow::Result;
use hostid_core::HostIdStore;

/// Print where the identity file lives, whether or not it exists yet
pub fn execute(store: &HostIdStore) -> Result<()> {
    println!("{}", store.path().display());
    Ok(())
}
