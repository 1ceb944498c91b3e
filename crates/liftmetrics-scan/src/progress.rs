//! Deduplication progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Which pass of the deduplicator is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPhase {
    /// Hashing individual files.
    Files,
    /// Hashing directories, children before parents.
    Directories,
}

/// Progress information during deduplication.
#[derive(Debug, Clone)]
pub struct DedupProgress {
    /// Current pass.
    pub phase: DedupPhase,
    /// Files hashed so far.
    pub files_hashed: u64,
    /// Directories hashed so far.
    pub dirs_hashed: u64,
    /// Duplicates removed so far (files and directories).
    pub removed: u64,
    /// Path being processed.
    pub current_path: PathBuf,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl DedupProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            phase: DedupPhase::Files,
            files_hashed: 0,
            dirs_hashed: 0,
            removed: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }
}

impl Default for DedupProgress {
    fn default() -> Self {
        Self::new()
    }
}
