//! Discovery of log files below a directory.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use liftmetrics_core::{FileMatcher, FileWarning, LiftError, WarningKind};

/// Log files found below a root, in sorted path order.
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<FileWarning>,
}

/// Collect every regular file below `root` whose name matches `matcher`.
pub fn discover_logs(root: &Path, matcher: &FileMatcher) -> Result<Discovered, LiftError> {
    discover_logs_excluding(root, matcher, &[])
}

/// Like [`discover_logs`], leaving out everything below the `excluded`
/// directories. Excluded directories not below `root`, or not on disk, are ignored.
pub fn discover_logs_excluding(
    root: &Path,
    matcher: &FileMatcher,
    excluded: &[PathBuf],
) -> Result<Discovered, LiftError> {
    if !root.is_dir() {
        return Err(LiftError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let canonical_root = root.canonicalize().map_err(|e| LiftError::io(root, e))?;
    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|dir| rebase(root, &canonical_root, dir))
        .collect();

    let mut discovered = Discovered::default();
    let walker = WalkDir::new(root)
        .parallelism(Parallelism::RayonDefaultPool {
            busy_timeout: std::time::Duration::from_millis(100),
        })
        .sort(true)
        .skip_hidden(true)
        .follow_links(false);

    for entry_result in walker {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if excluded.iter().any(|dir| path.starts_with(dir)) {
                    continue;
                }
                if entry.file_type().is_file() && matcher.matches_path(&path) {
                    discovered.files.push(path);
                }
            }
            Err(err) => {
                let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                discovered
                    .warnings
                    .push(FileWarning::new(path, err.to_string(), WarningKind::Unreadable));
            }
        }
    }

    discovered.files.sort();
    Ok(discovered)
}

/// Express `dir` relative to `root` as spelled by the caller, so it prefixes
/// the walked paths.
fn rebase(root: &Path, canonical_root: &Path, dir: &Path) -> Option<PathBuf> {
    let canonical = dir.canonicalize().ok()?;
    let relative = canonical.strip_prefix(canonical_root).ok()?;
    Some(root.join(relative))
}
