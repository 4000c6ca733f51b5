//! Crash-safe snapshot writes.
//!
//! Temp file in the destination directory, fsync, then rename over the target.
//! Where rename cannot replace an existing file (Windows) the old file is moved to
//! `.bak` first and restored if the second rename fails; [`recover_bak_file`] finishes
//! that dance after a crash in the middle of it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::warn;

/// Put `path.bak` back in place if a previous write died between the two renames.
pub(crate) fn recover_bak_file(path: &Path) {
    let backup = path.with_extension("bak");
    if !path.exists() && backup.exists() {
        match fs::rename(&backup, path) {
            Ok(()) => warn!(
                path = %path.display(),
                "Recovered .bak snapshot from interrupted write"
            ),
            Err(e) => warn!(
                path = %path.display(),
                "Failed to recover .bak snapshot: {e}"
            ),
        }
    }
}

/// Replace `path` with `bytes`, owner-only on Unix.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup = path.with_extension("bak");
        let _ = fs::remove_file(&backup);
        fs::rename(path, &backup)?;
        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&backup, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&backup) {
            warn!(path = %backup.display(), "Failed to remove .bak after snapshot write: {e}");
        }
    }
    Ok(())
}
