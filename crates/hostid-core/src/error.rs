//! Error types for host identifier persistence

use crate::generator::EntropyError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filesystem operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateDir,
    Read,
    CreateTemp,
    Write,
    SetPermissions,
    Sync,
    Rename,
    OpenLock,
    Lock,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateDir => "create directory",
            Operation::Read => "read",
            Operation::CreateTemp => "create temporary file",
            Operation::Write => "write",
            Operation::SetPermissions => "set permissions",
            Operation::Sync => "sync",
            Operation::Rename => "rename",
            Operation::OpenLock => "open lock file",
            Operation::Lock => "lock",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`HostIdError`]
///
/// Callers match on this to pick operator guidance: a permission problem is
/// fixed by correcting ownership, contention by retrying later, and missing
/// entropy by restarting once the system RNG is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    LockBusy,
    EntropyUnavailable,
    LimitExceeded,
    Io,
}

/// Errors that can occur while reading or creating the host identifier
#[derive(Error, Debug)]
pub enum HostIdError {
    /// The identity file does not exist or holds no identifier
    #[error("host identifier not found at {path}")]
    NotFound { path: PathBuf },

    /// The OS refused access to the identity file, its directory, or the lock file
    #[error("permission denied during {op} on {path}: {source}")]
    PermissionDenied {
        op: Operation,
        path: PathBuf,
        source: io::Error,
    },

    /// Another process holds the advisory lock
    #[error("lock on {path} is held by another process")]
    LockBusy { path: PathBuf },

    /// The system randomness source could not produce a candidate identifier
    #[error(
        "failed to generate host identifier: the system randomness source is not ready. \
         This can happen when the process starts very early in the boot sequence; \
         restart it once the system has finished initializing ({source})"
    )]
    EntropyUnavailable {
        #[from]
        source: EntropyError,
    },

    /// Every attempt lost the race for the lock
    #[error("failed to obtain host identifier: lock on {path} still busy after {attempts} attempts")]
    LimitExceeded { path: PathBuf, attempts: u32 },

    /// Any other filesystem failure
    #[error("I/O error during {op} on {path}: {source}")]
    Io {
        op: Operation,
        path: PathBuf,
        source: io::Error,
    },
}

impl HostIdError {
    /// Classify a raw OS error raised by `op` on `path`.
    ///
    /// Only a missing file observed by a read is reported as `NotFound`; a
    /// missing directory while opening the lock or writing is an I/O failure.
    pub fn from_io(op: Operation, path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound if op == Operation::Read => HostIdError::NotFound { path },
            io::ErrorKind::PermissionDenied => HostIdError::PermissionDenied { op, path, source },
            _ => HostIdError::Io { op, path, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HostIdError::NotFound { .. } => ErrorKind::NotFound,
            HostIdError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            HostIdError::LockBusy { .. } => ErrorKind::LockBusy,
            HostIdError::EntropyUnavailable { .. } => ErrorKind::EntropyUnavailable,
            HostIdError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            HostIdError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_lock_busy(&self) -> bool {
        self.kind() == ErrorKind::LockBusy
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }
}
