//! Unified-diff preview for `gulp diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::{error::io_err, StubFs, SyncError};

/// A single mirror file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

impl StubFs {
    /// Compare staged content (and pending orphan deletions) with the mirror.
    ///
    /// No files are written and the staging map is left intact.
    pub fn diff(&self) -> Result<Vec<FileDiff>, SyncError> {
        let (staged, orphans) = self.pending()?;
        let mut diffs = Vec::new();

        for (path, contents) in staged {
            let existing = read_existing(&path)?;
            if existing.as_deref() == Some(contents.as_str()) {
                continue;
            }
            let old = existing.unwrap_or_default();
            diffs.push(self.file_diff(path, &old, &contents));
        }

        for path in orphans {
            let old = read_existing(&path)?.unwrap_or_default();
            diffs.push(self.file_diff(path, &old, ""));
        }

        Ok(diffs)
    }

    fn file_diff(&self, path: PathBuf, old: &str, new: &str) -> FileDiff {
        let relative = path.strip_prefix(self.root()).unwrap_or(path.as_path());
        let old_header = format!("a/{}", relative.display());
        let new_header = format!("b/{}", relative.display());
        let unified_diff = TextDiff::from_lines(old, new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();
        FileDiff { path, unified_diff }
    }
}

/// `None` when the file does not exist yet.
fn read_existing(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
