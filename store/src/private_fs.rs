//! Owner-only files and directories for the on-disk stores.
//!
//! Both stores hold balances, so their files are 0600 and any directory created
//! to hold them is 0700. Directories that already existed are left as they are:
//! `--db ~/projects/ledger.db` must not change the mode of `~/projects`.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const PRIVATE_DIR_MODE: u32 = 0o700;
const PRIVATE_FILE_MODE: u32 = 0o600;

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn ensure_owned(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    let owner = fs::metadata(path)?.uid();
    let uid = unsafe { libc::getuid() };
    if owner == uid {
        return Ok(());
    }
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!(
            "{} belongs to uid {owner}, not the current user ({uid})",
            path.display()
        ),
    ))
}

#[cfg(not(unix))]
fn ensure_owned(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Create `dir` and its missing ancestors. Only the ones created here become 0700.
pub(crate) fn create_private_dir(dir: &Path) -> io::Result<()> {
    let missing: Vec<&Path> = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .collect();
    fs::create_dir_all(dir)?;
    for created in missing.into_iter().rev() {
        restrict(created, PRIVATE_DIR_MODE)?;
    }
    Ok(())
}

/// Prepare the directory a store file lives in.
pub(crate) fn create_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_private_dir(parent),
        _ => Ok(()),
    }
}

/// Take ownership of an existing store file: refuse one that belongs to another
/// user, then tighten it to 0600. A missing file is fine.
pub(crate) fn claim_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    ensure_owned(path)?;
    restrict(path, PRIVATE_FILE_MODE)
}

/// Create the store file empty if missing, then claim it.
pub(crate) fn create_private_file(path: &Path) -> io::Result<()> {
    create_parent_dir(path)?;
    if !path.exists() {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
    }
    claim_file(path)
}

/// SQLite's write-ahead log and shared-memory files next to `db`.
pub(crate) fn sqlite_sidecars(db: &Path) -> [PathBuf; 2] {
    let name = db
        .file_name()
        .map_or_else(|| db.display().to_string(), |name| name.to_string_lossy().into_owned());
    ["-wal", "-shm"].map(|suffix| db.with_file_name(format!("{name}{suffix}")))
}

/// Tighten whichever sidecars SQLite has created so far.
pub(crate) fn restrict_sidecars(db: &Path) -> io::Result<()> {
    for sidecar in sqlite_sidecars(db) {
        if sidecar.exists() {
            restrict(&sidecar, PRIVATE_FILE_MODE)?;
        }
    }
    Ok(())
}
