//! Atomic replace-via-rename writes and the matching reader

use crate::error::{HostIdError, Operation};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::Builder;

/// Permission bits of a freshly written identity file (owner read-only)
pub const IDENTITY_FILE_MODE: u32 = 0o400;

/// Atomically replace `target` with `contents`
///
/// The payload is staged in a temporary file in the same directory (so the
/// final rename never crosses a filesystem), synced to disk, restricted to
/// [`IDENTITY_FILE_MODE`], and renamed over `target`. On any failure the
/// temporary file is removed and `target` is left untouched.
///
/// # Errors
///
/// Returns `HostIdError::PermissionDenied` when the OS refuses the write or
/// rename, or `HostIdError::Io` for any other failure.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<(), HostIdError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hostid".to_string());

    let mut tmp = Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| HostIdError::from_io(Operation::CreateTemp, dir, e))?;
    let tmp_path = tmp.path().to_path_buf();

    tmp.write_all(contents)
        .map_err(|e| HostIdError::from_io(Operation::Write, &tmp_path, e))?;

    restrict_permissions(tmp.as_file())
        .map_err(|e| HostIdError::from_io(Operation::SetPermissions, &tmp_path, e))?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| HostIdError::from_io(Operation::Sync, &tmp_path, e))?;

    tmp.persist(target)
        .map_err(|e| HostIdError::from_io(Operation::Rename, target, e.error))?;

    sync_dir(dir);
    Ok(())
}

/// Read `path` and return its contents with surrounding whitespace removed
///
/// A missing file and a file with no content both yield
/// `HostIdError::NotFound`. Content that is not UTF-8 is an `Io` error of
/// kind `InvalidData`.
pub fn read_trimmed(path: &Path) -> Result<String, HostIdError> {
    let raw = fs::read(path).map_err(|e| HostIdError::from_io(Operation::Read, path, e))?;
    let text = String::from_utf8(raw).map_err(|e| {
        HostIdError::from_io(
            Operation::Read,
            path,
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HostIdError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(IDENTITY_FILE_MODE))
}

#[cfg(not(unix))]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(true);
    file.set_permissions(perms)
}

// Persist the rename itself. Best-effort: the payload is already durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "Failed to sync directory after rename");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("host_uuid");

        write_atomic(&target, b"a1b2c3d4").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"a1b2c3d4");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_sets_owner_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("host_uuid");

        write_atomic(&target, b"id").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, IDENTITY_FILE_MODE);
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("host_uuid");

        write_atomic(&target, b"id").unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["host_uuid".to_string()]);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("host_uuid");
        fs::write(&target, b"old").unwrap();

        write_atomic(&target, b"new").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_write_atomic_missing_directory_is_io() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("absent").join("host_uuid");

        let err = write_atomic(&target, b"id").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!target.exists());
    }

    #[test]
    fn test_read_trimmed_strips_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("host_uuid");
        fs::write(&path, b"  node-1\n").unwrap();

        assert_eq!(read_trimmed(&path).unwrap(), "node-1");
    }

    #[test]
    fn test_read_trimmed_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_trimmed(&temp_dir.path().join("host_uuid")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_trimmed_rejects_invalid_utf8() {
        use std::error::Error as _;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("host_uuid");
        fs::write(&path, b"a\xffb").unwrap();

        let err = read_trimmed(&path).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        let source = err.source().unwrap().downcast_ref::<io::Error>().unwrap();
        assert_eq!(source.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_trimmed_empty_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("host_uuid");
        fs::write(&path, b" \n\t").unwrap();

        let err = read_trimmed(&path).unwrap_err();
        assert!(err.is_not_found());
    }
}
