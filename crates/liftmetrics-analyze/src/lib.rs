//! Row deduplication and duty-cycle analytics for liftmetrics.
//!
//! This crate turns row-deduplicated lift logs into per-lift metrics:
//!
//! - **Row deduplication** - collapse consecutive duplicate rows ([`RowDeduper`])
//! - **Brake cycles** - contact value counts and engage-to-release cycles ([`BrakeAnalyzer`])
//! - **Door cycles** - open-to-close cycles over time-ordered rows ([`DoorAnalyzer`])
//! - **Floor travel** - stops per floor and floors travelled ([`FloorTravelAnalyzer`])
//! - **Floor mode** - most visited floor per file and per lift ([`ModeAggregator`])
//!
//! Brake and door cycles share one engine, [`SignalTransitionEngine`], driven
//! by a [`CyclePattern`] state machine.
//!
//! # Analyzing a lift
//!
//! ```rust,ignore
//! use liftmetrics_analyze::{BrakeAnalyzer, LiftAnalyzer, LoadedLift};
//! use liftmetrics_core::group_by_lift;
//!
//! let grouping = group_by_lift(paths);
//! for dataset in &grouping.datasets {
//!     let lift = LoadedLift::load(dataset)?;
//!     let analysis = BrakeAnalyzer::default().analyze_lift(&lift)?;
//!     println!("{}: {} brake cycles", lift.lift, analysis.report.total_counts.cycles);
//! }
//! ```

mod brake;
mod dataset;
mod door;
mod floor;
mod mode;
mod row_dedup;
pub mod transition;

pub use brake::{BrakeAnalyzer, BrakeReport};
pub use dataset::{Analysis, LiftAnalyzer, LoadedLift};
pub use door::{DoorAnalyzer, DoorFileResult, DoorReport};
pub use floor::{
    FloorCountReport, FloorCounts, FloorTravel, FloorTravelAnalyzer, MileageReport, MotionState,
    TravelReport,
};
pub use mode::{ModeAggregator, ModeReport};
pub use row_dedup::{
    RowDedupConfig, RowDedupConfigBuilder, RowDedupOutcome, RowDedupSummary, RowDeduper,
};
pub use transition::{
    BitCounts, CyclePattern, DoorLatch, DoorState, EdgePattern, SignalTransitionEngine,
    TransitionCounts,
};

// Re-export core types
pub use liftmetrics_core::{LiftDataset, LiftId, Table};
