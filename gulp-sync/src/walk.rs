//! Recursive file listing with an explicit stack.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Every regular file below `root`, sorted. A missing `root` yields nothing.
pub fn files_under(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
