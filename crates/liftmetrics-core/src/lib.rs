//! Core types and configuration for liftmetrics.
//!
//! This crate provides the data structures shared by the deduplication and
//! analytics crates: the pipeline configuration, error and warning types,
//! content digests, the tabular log model, and lift grouping.

mod config;
mod digest;
mod error;
mod lift;
mod table;

pub use config::{
    BrakePattern, DoorPattern, FileMatcher, ModeConfig, PipelineConfig, PipelineConfigBuilder,
    RemovalMode, SignalColumns, TieBreak,
};
pub use digest::{DIGEST_LEN, Digest, DigestKind};
pub use error::{FileWarning, LiftError, WarningKind};
pub use lift::{LiftDataset, LiftFileName, LiftGrouping, LiftId, group_by_lift};
pub use table::{Cell, Row, Table, parse_bit, parse_floor, parse_timestamp};
