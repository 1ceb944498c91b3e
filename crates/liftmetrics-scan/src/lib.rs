//! Content hashing and duplicate removal for liftmetrics.
//!
//! This crate removes byte-identical log files and duplicate directory
//! subtrees from a download tree before any analytics read it.
//!
//! # Overview
//!
//! - **[`ContentHasher`]**: BLAKE3 digests of files, and of directories from
//!   their name-sorted children
//! - **[`DigestIndex`]**: caller-owned record of digests already seen
//! - **[`FileDeduper`]**: two-pass removal, files first, then directories
//!   children-before-parents
//! - **[`discover_logs`]**: sorted listing of log files for later stages
//!
//! # Example
//!
//! ```rust,no_run
//! use liftmetrics_core::{FileMatcher, RemovalMode};
//! use liftmetrics_scan::{DigestIndex, FileDeduper};
//!
//! let matcher = FileMatcher::new(&["*.csv"]).unwrap();
//! let deduper = FileDeduper::new(matcher, RemovalMode::Delete);
//! let index = DigestIndex::new();
//! let report = deduper.dedup("/srv/lifts/csv_files".as_ref(), &index).unwrap();
//!
//! println!("Removed {} files", report.files_removed());
//! ```
//!
//! Removal is permanent with [`RemovalMode::Delete`](liftmetrics_core::RemovalMode).
//! Use the quarantine or trash modes to keep duplicates recoverable.

mod dedup;
mod discover;
mod hasher;
mod index;
mod progress;

pub use dedup::{DedupReport, FileDeduper, Removal};
pub use discover::{Discovered, discover_logs, discover_logs_excluding};
pub use hasher::{ContentHasher, DigestCache, Hashed};
pub use index::DigestIndex;
pub use progress::{DedupPhase, DedupProgress};

// Re-export core types for convenience
pub use liftmetrics_core::{Digest, DigestKind, FileMatcher, RemovalMode};
