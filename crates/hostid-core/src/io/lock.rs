//! Non-blocking advisory file locking

use crate::error::{HostIdError, Operation};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Exclusive lock guard that releases on drop
///
/// The lock file itself is left on disk; only the lock is released.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = fs2::FileExt::unlock(&self.file);
        }
    }
}

/// Non-blocking exclusive lock capability over a filesystem path
///
/// `try_lock` must return `HostIdError::LockBusy` when another holder has the
/// lock. The returned guard holds the lock until dropped.
pub trait Locker {
    type Guard;

    fn try_lock(&self, path: &Path) -> Result<Self::Guard, HostIdError>;
}

/// Advisory `flock` locking via [`try_lock`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlockLocker;

impl Locker for FlockLocker {
    type Guard = FileLock;

    fn try_lock(&self, path: &Path) -> Result<FileLock, HostIdError> {
        try_lock(path)
    }
}

/// Try once to take an exclusive lock on `path`, creating the file if needed
///
/// Never blocks. The lock is tied to the open file description, so two
/// threads of one process contend the same way two processes do.
///
/// # Errors
///
/// Returns `HostIdError::LockBusy` if another holder has the lock,
/// `HostIdError::PermissionDenied` if the lock file cannot be created or
/// opened for that reason, or `HostIdError::Io` otherwise.
pub fn try_lock(path: &Path) -> Result<FileLock, HostIdError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| HostIdError::from_io(Operation::OpenLock, path, e))?;

    try_lock_exclusive(&file, path)?;

    Ok(FileLock {
        file,
        path: path.to_path_buf(),
    })
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File, path: &Path) -> Result<(), HostIdError> {
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    let would_block = err.raw_os_error() == Some(libc::EWOULDBLOCK)
        || err.raw_os_error() == Some(libc::EAGAIN);
    if would_block {
        return Err(HostIdError::LockBusy {
            path: path.to_path_buf(),
        });
    }

    Err(HostIdError::from_io(Operation::Lock, path, err))
}

#[cfg(not(unix))]
fn try_lock_exclusive(file: &File, path: &Path) -> Result<(), HostIdError> {
    use fs2::FileExt;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(HostIdError::LockBusy {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(HostIdError::from_io(Operation::Lock, path, e)),
    }
}
