//! Race-free read-or-create of the host identifier
//!
//! Any number of processes may call [`HostIdStore::read_or_create`] on the
//! same data directory at once. Exactly one of them writes the identity file
//! and all of them return its contents.
//!
//! # Protocol
//!
//! Each attempt:
//!
//! 1. Read the identity file without locking. Present: done.
//! 2. Generate a candidate. Entropy failure is terminal.
//! 3. Try the exclusive lock on `<file>.lock`. Busy: sleep and start over.
//! 4. Under the lock, read again. Present: another process won, discard the
//!    candidate and return its value.
//! 5. Still absent: atomically write the candidate and return it.
//!
//! Steady-state callers only ever take step 1. Readers never lock; they rely
//! on the identity file being replaced by rename, never written in place.

use crate::config::{ConfigError, HostIdConfig};
use crate::error::{HostIdError, Operation};
use crate::generator::{IdGenerator, RandomUuid};
use crate::id::HostId;
use crate::io::{read_trimmed, write_atomic, FlockLocker, Locker};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix appended to the identity file path to form the lock file path
pub const LOCK_SUFFIX: &str = ".lock";

/// How [`HostIdStore::read_or_create_with_outcome`] obtained the identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Read back from a file some process wrote earlier
    Existing,
    /// Generated and written by this call
    Created,
}

/// Identifier plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub id: HostId,
    pub outcome: Outcome,
}

/// Handle on the identity file of one data directory
#[derive(Debug, Clone)]
pub struct HostIdStore<G = RandomUuid, L = FlockLocker> {
    data_dir: PathBuf,
    config: HostIdConfig,
    generator: G,
    locker: L,
}

impl HostIdStore<RandomUuid, FlockLocker> {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config: HostIdConfig::default(),
            generator: RandomUuid,
            locker: FlockLocker,
        }
    }

    /// Store using `config`, which must name a plain file inside `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `config.file_name` is empty, `.`,
    /// `..`, absolute, or contains a path separator.
    pub fn with_config(
        data_dir: impl Into<PathBuf>,
        config: HostIdConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(data_dir)
        })
    }
}

impl<G: IdGenerator, L: Locker> HostIdStore<G, L> {
    /// Replace the candidate generator.
    pub fn with_generator<H: IdGenerator>(self, generator: H) -> HostIdStore<H, L> {
        HostIdStore {
            data_dir: self.data_dir,
            config: self.config,
            generator,
            locker: self.locker,
        }
    }

    /// Replace the lock primitive guarding creation.
    pub fn with_locker<M: Locker>(self, locker: M) -> HostIdStore<G, M> {
        HostIdStore {
            data_dir: self.data_dir,
            config: self.config,
            generator: self.generator,
            locker,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &HostIdConfig {
        &self.config
    }

    /// Path of the identity file
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.config.file_name)
    }

    /// Path of the sibling lock file
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.config.file_name.clone();
        name.push_str(LOCK_SUFFIX);
        self.data_dir.join(name)
    }

    /// Read the stored identifier without locking.
    ///
    /// An absent or empty identity file is `HostIdError::NotFound`. Content
    /// that is not a valid [`HostId`] is an `Io` error of kind `InvalidData`.
    pub fn read(&self) -> Result<HostId, HostIdError> {
        let path = self.path();
        let contents = read_trimmed(&path)?;
        HostId::parse(&contents).map_err(|e| {
            HostIdError::from_io(
                Operation::Read,
                &path,
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Atomically write `id` as the stored identifier.
    ///
    /// This bypasses the lock and replaces whatever is there; use
    /// [`read_or_create`](Self::read_or_create) to provision safely.
    pub fn write(&self, id: &HostId) -> Result<(), HostIdError> {
        write_atomic(&self.path(), id.as_bytes())
    }

    /// Return the stored identifier, creating it if no process has yet.
    ///
    /// # Errors
    ///
    /// - `EntropyUnavailable` if no candidate could be generated
    /// - `LimitExceeded` if every attempt found the lock busy
    /// - `PermissionDenied` or `Io` for filesystem failures
    pub fn read_or_create(&self) -> Result<HostId, HostIdError> {
        self.read_or_create_with_outcome().map(|p| p.id)
    }

    /// Like [`read_or_create`](Self::read_or_create), also reporting whether
    /// this call wrote the file.
    pub fn read_or_create_with_outcome(&self) -> Result<Provisioned, HostIdError> {
        let lock_path = self.lock_path();
        let attempts = self.config.attempts();

        for attempt in 1..=attempts {
            if let Some(id) = self.read_if_present()? {
                debug!(path = %self.path().display(), "Host identifier already present");
                return Ok(Provisioned {
                    id,
                    outcome: Outcome::Existing,
                });
            }

            let candidate = self.generator.generate()?;

            match self.create_under_lock(&lock_path, candidate) {
                Err(e) if e.is_lock_busy() => {
                    debug!(
                        lock = %lock_path.display(),
                        attempt,
                        attempts,
                        "Lock busy, another process is creating the host identifier"
                    );
                    if attempt < attempts {
                        std::thread::sleep(self.config.retry_backoff());
                    }
                }
                result => return result,
            }
        }

        warn!(
            lock = %lock_path.display(),
            attempts,
            "Gave up waiting for the host identifier lock"
        );
        Err(HostIdError::LimitExceeded {
            path: lock_path,
            attempts,
        })
    }

    fn read_if_present(&self) -> Result<Option<HostId>, HostIdError> {
        match self.read() {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_under_lock(
        &self,
        lock_path: &Path,
        candidate: HostId,
    ) -> Result<Provisioned, HostIdError> {
        let _lock = self.locker.try_lock(lock_path)?;

        if let Some(id) = self.read_if_present()? {
            debug!(
                path = %self.path().display(),
                "Host identifier created by another process, discarding candidate"
            );
            return Ok(Provisioned {
                id,
                outcome: Outcome::Existing,
            });
        }

        self.write(&candidate)?;
        info!(path = %self.path().display(), id = %candidate, "Created host identifier");
        Ok(Provisioned {
            id: candidate,
            outcome: Outcome::Created,
        })
    }
}

/// Identity file path for `data_dir` under the default configuration
pub fn get_path(data_dir: &Path) -> PathBuf {
    HostIdStore::new(data_dir).path()
}

/// Read the identifier stored in `data_dir`
pub fn read_file(data_dir: &Path) -> Result<HostId, HostIdError> {
    HostIdStore::new(data_dir).read()
}

/// Atomically store `id` in `data_dir`, replacing any previous value
pub fn write_file(data_dir: &Path, id: &HostId) -> Result<(), HostIdError> {
    HostIdStore::new(data_dir).write(id)
}

/// Read the identifier stored in `data_dir`, creating one if absent
pub fn read_or_create_file(data_dir: &Path) -> Result<HostId, HostIdError> {
    HostIdStore::new(data_dir).read_or_create()
}
