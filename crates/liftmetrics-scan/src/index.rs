//! Seen-digest index for deduplication.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use liftmetrics_core::{Digest, DigestKind};

/// Records which digest was first seen at which path.
///
/// The index is owned by the caller and handed to
/// [`FileDeduper::dedup`](crate::FileDeduper::dedup), so several roots can be
/// deduplicated against each other by reusing it. File and directory digests
/// live in separate namespaces.
#[derive(Debug, Default)]
pub struct DigestIndex {
    seen: DashMap<(DigestKind, Digest), PathBuf>,
}

impl DigestIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            seen: DashMap::new(),
        }
    }

    /// Track a digest. Returns the path recorded for it when that is a
    /// different entry still present on disk, otherwise records `path` and
    /// returns `None`.
    ///
    /// Tracking the recorded path again is not a duplicate, so a second run
    /// over the same tree with the same index removes nothing.
    pub fn track(&self, kind: DigestKind, digest: Digest, path: &Path) -> Option<PathBuf> {
        match self.seen.entry((kind, digest)) {
            Entry::Occupied(existing) if existing.get() == path => None,
            Entry::Occupied(mut existing) => {
                if existing.get().exists() {
                    return Some(existing.get().clone());
                }
                tracing::debug!(
                    stale = %existing.get().display(),
                    path = %path.display(),
                    "recorded copy is gone, keeping this one"
                );
                existing.insert(path.to_path_buf());
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Number of distinct digests tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.seen.clear();
    }
}
