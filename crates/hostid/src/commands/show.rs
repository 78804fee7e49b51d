//! Show command implementation

use anyhow::{Context, Result};
use hostid_core::HostIdStore;

/// Print the stored identifier without creating one
pub fn execute(store: &HostIdStore) -> Result<()> {
    let id = store
        .read()
        .with_context(|| format!("no host identifier available in {}", store.data_dir().display()))?;
    println!("{id}");
    Ok(())
}
