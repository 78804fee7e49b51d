//! Durable, idempotent host identifier persistence
//!
//! A node's identifier is generated once, written atomically to
//! `<data_dir>/host_uuid`, and read back on every later start. Concurrent
//! first starts from several processes agree on a single winner through an
//! advisory lock on `<data_dir>/host_uuid.lock`.
//!
//! ```rust,no_run
//! use hostid_core::HostIdStore;
//!
//! let store = HostIdStore::new("/var/lib/mynode");
//! let id = store.read_or_create()?;
//! println!("host id: {id}");
//! # Ok::<(), hostid_core::HostIdError>(())
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod id;
pub mod io;
pub mod logging;
pub mod store;

pub use config::{resolve_config, ConfigError, ConfigOverrides, HostIdConfig};
pub use error::{ErrorKind, HostIdError, Operation};
pub use generator::{EntropyError, IdGenerator, RandomUuid};
pub use id::{HostId, ParseHostIdError};
pub use store::{
    get_path, read_file, read_or_create_file, write_file, HostIdStore, Outcome, Provisioned,
};
