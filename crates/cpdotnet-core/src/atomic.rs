// ── Atomic file replacement ──
//
// Generated files (site registry, proxy fragments, unit files) are written
// to a temporary file in the destination directory and renamed into place,
// so readers only ever see the old or the new content.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::CoreError;

#[cfg(unix)]
const GENERATED_FILE_MODE: u32 = 0o644;

/// Replace `path` with `contents` in one rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let dir = path.parent().ok_or_else(|| {
        CoreError::Internal(format!("{} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir).map_err(CoreError::storage(dir))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".cpdotnet-")
        .tempfile_in(dir)
        .map_err(CoreError::storage(dir))?;
    tmp.write_all(contents).map_err(CoreError::storage(tmp.path()))?;
    tmp.as_file().sync_all().map_err(CoreError::storage(tmp.path()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(GENERATED_FILE_MODE))
            .map_err(CoreError::storage(tmp.path()))?;
    }

    tmp.persist(path)
        .map_err(|e| CoreError::storage(path)(e.error))?;
    Ok(())
}

/// Read a file, treating a missing file as `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, CoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::storage(path)(e)),
    }
}
