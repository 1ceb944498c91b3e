//! Content-addressed removal of duplicate files and directories.
//!
//! Runs in two passes over a root directory:
//!
//! 1. Walk every matching file in sorted pre-order, hash it, and remove it if
//!    its digest was already seen.
//! 2. Visit directories children-first (siblings in name order), hash each one
//!    from its already-deduplicated contents, and remove whole subtrees whose
//!    digest was already seen.
//!
//! The root itself is never removed. Entries that cannot be read are skipped
//! with a warning and neither removed nor recorded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use liftmetrics_core::{
    Digest, DigestKind, FileMatcher, FileWarning, LiftError, PipelineConfig, RemovalMode,
    WarningKind,
};

use crate::hasher::{ContentHasher, DigestCache, Hashed};
use crate::index::DigestIndex;
use crate::progress::{DedupPhase, DedupProgress};

/// One duplicate that was taken out of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Removal {
    /// Path of the duplicate.
    pub path: PathBuf,
    /// Path of the copy that was kept.
    pub kept: PathBuf,
    /// File or directory.
    pub kind: DigestKind,
    /// Shared digest.
    pub digest: Digest,
    /// Bytes occupied by the duplicate.
    pub size: u64,
    /// Where the duplicate went in quarantine mode.
    pub quarantined_to: Option<PathBuf>,
}

/// Results from a deduplication run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupReport {
    /// Deduplicated root.
    pub root: PathBuf,
    /// Files hashed.
    pub files_hashed: u64,
    /// Directories hashed.
    pub dirs_hashed: u64,
    /// Duplicates removed, in removal order.
    pub removed: Vec<Removal>,
    /// Total size of removed duplicates.
    pub bytes_reclaimed: u64,
    /// Entries skipped because of errors.
    pub warnings: Vec<FileWarning>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl DedupReport {
    /// Check if anything was removed.
    pub fn has_removals(&self) -> bool {
        !self.removed.is_empty()
    }

    /// Number of duplicate files removed.
    pub fn files_removed(&self) -> usize {
        self.count(DigestKind::File)
    }

    /// Number of duplicate directories removed.
    pub fn dirs_removed(&self) -> usize {
        self.count(DigestKind::Directory)
    }

    fn count(&self, kind: DigestKind) -> usize {
        self.removed.iter().filter(|r| r.kind == kind).count()
    }
}

/// Removes duplicate files and directories under a root.
pub struct FileDeduper {
    matcher: FileMatcher,
    removal: RemovalMode,
    hasher: ContentHasher,
    progress_tx: broadcast::Sender<DedupProgress>,
}

impl FileDeduper {
    /// Create a deduplicator for files matching `matcher`.
    pub fn new(matcher: FileMatcher, removal: RemovalMode) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            matcher,
            removal,
            hasher: ContentHasher::new(),
            progress_tx,
        }
    }

    /// Create a deduplicator from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, LiftError> {
        Ok(Self::new(config.file_matcher()?, config.resolved_removal()))
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<DedupProgress> {
        self.progress_tx.subscribe()
    }

    /// Deduplicate `root` against the digests already in `index`.
    pub fn dedup(&self, root: &Path, index: &DigestIndex) -> Result<DedupReport, LiftError> {
        let start = Instant::now();
        if !root.is_dir() {
            return Err(LiftError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let root = root.canonicalize().map_err(|e| LiftError::io(root, e))?;
        let quarantine = self.prepare_quarantine()?;

        let mut run = Run {
            root: &root,
            quarantine: quarantine.as_deref(),
            index,
            cache: DigestCache::new(),
            progress: DedupProgress::new(),
            start,
            report: DedupReport {
                root: root.clone(),
                ..DedupReport::default()
            },
        };

        let subdirs = self.dedup_files(&mut run);
        run.progress.phase = DedupPhase::Directories;
        self.dedup_dirs(&root, &subdirs, &mut run);

        run.report.duration = start.elapsed();
        tracing::info!(
            root = %root.display(),
            files_removed = run.report.files_removed(),
            dirs_removed = run.report.dirs_removed(),
            bytes = run.report.bytes_reclaimed,
            "deduplication finished"
        );
        Ok(run.report)
    }

    /// First pass: hash and remove duplicate files. Returns the directory
    /// layout (parent to sorted subdirectories) for the second pass.
    fn dedup_files(&self, run: &mut Run<'_>) -> HashMap<PathBuf, Vec<PathBuf>> {
        let walker = WalkDir::new(run.root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1);

        let mut subdirs: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    tracing::warn!(path = %path.display(), error = %err, "walk error");
                    run.report
                        .warnings
                        .push(FileWarning::new(path, err.to_string(), WarningKind::Unreadable));
                    continue;
                }
            };

            let path = entry.path();
            if run.is_quarantined(&path) {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if let Some(parent) = path.parent() {
                    subdirs.entry(parent.to_path_buf()).or_default().push(path);
                }
                continue;
            }
            if !file_type.is_file() || !self.matcher.matches_path(&path) {
                continue;
            }

            let hashed = match self.hasher.hash_file(&path) {
                Ok(h) => h,
                Err(err) => {
                    run.skip(&path, &err);
                    continue;
                }
            };
            run.report.files_hashed += 1;
            run.progress.files_hashed += 1;
            run.progress.current_path = path.clone();
            run.cache.insert(&path, hashed);

            if let Some(kept) = run.index.track(DigestKind::File, hashed.digest, &path) {
                self.remove(run, path, kept, DigestKind::File, hashed);
            }
            self.publish(run);
        }

        subdirs
    }

    /// Second pass: children-first directory deduplication below `dir`.
    fn dedup_dirs(&self, dir: &Path, subdirs: &HashMap<PathBuf, Vec<PathBuf>>, run: &mut Run<'_>) {
        let Some(children) = subdirs.get(dir) else {
            return;
        };

        for child in children {
            self.dedup_dirs(child, subdirs, run);
        }

        for child in children {
            if !child.is_dir() {
                continue;
            }
            let hashed = match self.hasher.hash_dir_cached(child, &mut run.cache) {
                Ok(h) => h,
                Err(err) => {
                    run.skip(child, &err);
                    continue;
                }
            };
            run.report.dirs_hashed += 1;
            run.progress.dirs_hashed += 1;
            run.progress.current_path = child.clone();

            if let Some(kept) = run.index.track(DigestKind::Directory, hashed.digest, child) {
                self.remove(run, child.clone(), kept, DigestKind::Directory, hashed);
            }
            self.publish(run);
        }
    }

    fn remove(
        &self,
        run: &mut Run<'_>,
        path: PathBuf,
        kept: PathBuf,
        kind: DigestKind,
        hashed: Hashed,
    ) {
        let Hashed { digest, size } = hashed;
        let result = match &self.removal {
            RemovalMode::Delete => delete(&path, kind).map(|()| None),
            RemovalMode::Quarantine { dir } => quarantine(run.root, dir, &path).map(Some),
            RemovalMode::Trash => trash::delete(&path)
                .map(|()| None)
                .map_err(|e| LiftError::io(&path, std::io::Error::other(e.to_string()))),
        };

        match result {
            Ok(quarantined_to) => {
                tracing::debug!(
                    path = %path.display(),
                    kept = %kept.display(),
                    digest = %digest,
                    "removed duplicate"
                );
                run.progress.removed += 1;
                run.report.bytes_reclaimed += size;
                run.report.removed.push(Removal {
                    path,
                    kept,
                    kind,
                    digest,
                    size,
                    quarantined_to,
                });
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not remove duplicate");
                run.report.warnings.push(FileWarning::new(
                    &path,
                    err.to_string(),
                    WarningKind::RemovalFailed,
                ));
            }
        }
    }

    fn prepare_quarantine(&self) -> Result<Option<PathBuf>, LiftError> {
        match &self.removal {
            RemovalMode::Quarantine { dir } => {
                fs::create_dir_all(dir).map_err(|e| LiftError::io(dir, e))?;
                Ok(Some(dir.canonicalize().map_err(|e| LiftError::io(dir, e))?))
            }
            _ => Ok(None),
        }
    }

    fn publish(&self, run: &Run<'_>) {
        let mut progress = run.progress.clone();
        progress.elapsed = run.start.elapsed();
        let _ = self.progress_tx.send(progress);
    }
}

/// Mutable state of a single run.
struct Run<'a> {
    root: &'a Path,
    quarantine: Option<&'a Path>,
    index: &'a DigestIndex,
    cache: DigestCache,
    progress: DedupProgress,
    start: Instant,
    report: DedupReport,
}

impl Run<'_> {
    fn is_quarantined(&self, path: &Path) -> bool {
        self.quarantine.is_some_and(|q| path.starts_with(q))
    }

    fn skip(&mut self, path: &Path, err: &LiftError) {
        tracing::warn!(path = %path.display(), error = %err, "skipping unreadable entry");
        self.report.warnings.push(FileWarning::from_error(path, err));
    }
}

fn delete(path: &Path, kind: DigestKind) -> Result<(), LiftError> {
    match kind {
        DigestKind::File => fs::remove_file(path),
        DigestKind::Directory => fs::remove_dir_all(path),
    }
    .map_err(|e| LiftError::io(path, e))
}

/// Move `path` under `dir`, mirroring its location relative to `root`.
fn quarantine(root: &Path, dir: &Path, path: &Path) -> Result<PathBuf, LiftError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut target = dir.join(relative);
    let mut attempt = 1;
    while target.exists() {
        let mut name = relative.as_os_str().to_os_string();
        name.push(format!(".{attempt}"));
        target = dir.join(name);
        attempt += 1;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| LiftError::io(parent, e))?;
    }
    fs::rename(path, &target).map_err(|e| LiftError::io(path, e))?;
    Ok(target)
}

