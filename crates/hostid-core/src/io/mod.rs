//! Crash-safe file primitives for the identity file
//!
//! - **Atomic write**: stage to a temporary file in the target directory, sync,
//!   then rename over the target so readers see either nothing or everything
//! - **Advisory lock**: non-blocking exclusive lock on a sibling `.lock` file,
//!   released when the guard is dropped

pub mod atomic;
pub mod lock;

pub use atomic::{read_trimmed, write_atomic, IDENTITY_FILE_MODE};
pub use lock::{try_lock, FileLock, FlockLocker, Locker};
