//! Mirror store and reconciliation.
//!
//! ## `sync` reconciliation
//!
//! 1. Drain the staging map (filled by readers during the run).
//! 2. For each staged path: create parent directories, compare on-disk content
//!    and skip if identical.
//! 3. Otherwise write to `<path>.gulp.tmp` and rename over the target.
//! 4. Drop the path from the snapshot taken when the store was opened.
//! 5. Delete every path left in the snapshot and prune emptied directories.
//!
//! There is no rollback: a failed sync leaves the mirror indeterminate and the
//! next successful run repairs it, since every run recomputes from staged truth.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{io_err, SyncError};
use crate::walk::files_under;

/// `<workspace>/.apexlink/gulp`. Pure, no I/O.
pub fn store_root_at(workspace: &Path) -> PathBuf {
    workspace.join(".apexlink").join("gulp")
}

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome for an individual mirror file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// On-disk content already matches.
    Unchanged { path: PathBuf },
    /// Orphan removed: no reader produced it this run.
    Deleted { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been deleted.
    WouldDelete { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::Deleted { path }
            | WriteResult::WouldWrite { path }
            | WriteResult::WouldDelete { path } => path,
        }
    }
}

/// Per-file outcomes of one [`StubFs::sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub results: Vec<WriteResult>,
}

impl SyncReport {
    pub fn written(&self) -> usize {
        self.count(|r| matches!(r, WriteResult::Written { .. } | WriteResult::WouldWrite { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|r| matches!(r, WriteResult::Unchanged { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|r| matches!(r, WriteResult::Deleted { .. } | WriteResult::WouldDelete { .. }))
    }

    /// True when the sync changed nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.written() == 0 && self.deleted() == 0
    }

    fn count(&self, pred: impl Fn(&WriteResult) -> bool) -> usize {
        self.results.iter().filter(|r| pred(r)).count()
    }
}

// ---------------------------------------------------------------------------
// StubFs
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StoreState {
    /// Absolute paths of files present under the root.
    snapshot: BTreeSet<PathBuf>,
    /// Root-relative path → content staged this run.
    staged: BTreeMap<PathBuf, String>,
}

/// Write-back cache over the mirror directory.
///
/// Staging is `&self` so concurrent readers can share one store; all I/O
/// happens in [`StubFs::sync`], after every reader has settled.
#[derive(Debug)]
pub struct StubFs {
    root: PathBuf,
    state: Mutex<StoreState>,
}

impl StubFs {
    /// Open the store for `workspace`, creating its root and snapshotting the
    /// files already there.
    pub fn open(workspace: &Path) -> Result<Self, SyncError> {
        Self::open_root(store_root_at(workspace))
    }

    /// Open a store rooted directly at `root`.
    pub fn open_root(root: PathBuf) -> Result<Self, SyncError> {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        let snapshot = files_under(&root)?.into_iter().collect();
        Ok(Self {
            root,
            state: Mutex::new(StoreState {
                snapshot,
                staged: BTreeMap::new(),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upsert `contents` for root-relative `path`. Never touches disk.
    pub fn stage(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.lock().staged.insert(path.into(), contents.into());
    }

    /// Root-relative paths staged so far, sorted.
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.lock().staged.keys().cloned().collect()
    }

    /// Content staged for `path`, if any.
    pub fn staged(&self, path: &Path) -> Option<String> {
        self.lock().staged.get(path).cloned()
    }

    /// Reconcile the mirror with the staged set, then clear staging.
    ///
    /// With `dry_run` nothing on disk changes and the snapshot is kept.
    pub fn sync(&self, dry_run: bool) -> Result<SyncReport, SyncError> {
        let mut state = self.lock();
        let staged = std::mem::take(&mut state.staged);
        let mut orphans = state.snapshot.clone();
        let mut report = SyncReport::default();

        let mut targets = BTreeSet::new();
        for (relative, contents) in &staged {
            let target = self.resolve(relative)?;
            report.results.push(write_if_changed(&target, contents, dry_run)?);
            orphans.remove(&target);
            targets.insert(target);
        }

        for orphan in orphans {
            if dry_run {
                tracing::info!("[dry-run] would delete: {}", orphan.display());
                report.results.push(WriteResult::WouldDelete { path: orphan });
                continue;
            }
            match std::fs::remove_file(&orphan) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&orphan, e)),
            }
            self.prune_empty_parents(&orphan);
            tracing::info!("deleted: {}", orphan.display());
            report.results.push(WriteResult::Deleted { path: orphan });
        }

        if !dry_run {
            state.snapshot = targets;
        }
        Ok(report)
    }

    /// Staged content and orphaned snapshot entries, for previews.
    pub(crate) fn pending(&self) -> Result<(Vec<(PathBuf, String)>, Vec<PathBuf>), SyncError> {
        let state = self.lock();
        let staged = state
            .staged
            .iter()
            .map(|(path, contents)| Ok((self.resolve(path)?, contents.clone())))
            .collect::<Result<Vec<(PathBuf, String)>, SyncError>>()?;
        let staged_set: BTreeSet<&PathBuf> = staged.iter().map(|(path, _)| path).collect();
        let orphans = state
            .snapshot
            .iter()
            .filter(|path| !staged_set.contains(path))
            .cloned()
            .collect();
        Ok((staged, orphans))
    }

    fn resolve(&self, relative: &Path) -> Result<PathBuf, SyncError> {
        let valid = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(SyncError::InvalidPath {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Remove now-empty directories between `file` and the root.
    fn prune_empty_parents(&self, file: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if std::fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// write_if_changed
// ---------------------------------------------------------------------------

fn write_if_changed(path: &Path, contents: &str, dry_run: bool) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.gulp.tmp", path.display()));
    write_if_changed_with_tmp(path, contents, dry_run, &tmp)
}

fn write_if_changed_with_tmp(
    path: &Path,
    contents: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, contents).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
