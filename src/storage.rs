//! Small state-file helpers shared by the session store and compile cache

use crate::error::{OlError, OlResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a state file, mapping "not found" to `None`
pub fn read_optional(path: &Path) -> OlResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        // Truncated writes can leave invalid UTF-8 behind; treat like garbage content
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(Some(String::new())),
        Err(e) => Err(OlError::storage(path, e)),
    }
}

/// Write a file by writing a temporary sibling and renaming it into place.
///
/// Readers observe either the old content or the new content, never a
/// partial write. Files are created with owner-only permissions on unix.
pub fn write_atomic(path: &Path, content: &[u8]) -> OlResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| OlError::storage(parent, e))?;
        }
    }

    let tmp = temp_sibling(path);
    let result = write_synced(&tmp, content).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(OlError::storage(path, e));
    }
    Ok(())
}

/// Remove a file, succeeding silently when it does not exist
pub fn remove_if_exists(path: &Path) -> OlResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(OlError::storage(path, e)),
    }
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
