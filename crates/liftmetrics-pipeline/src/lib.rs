//! Staged pipeline driver for liftmetrics.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. [`PipelineRunner`] executes
//! it against a [`PipelineConfig`](liftmetrics_core::PipelineConfig):
//!
//! 1. `file-dedup` removes duplicate files and directories from the raw tree
//! 2. `row-dedup` writes row-deduplicated copies into the clean tree
//! 3. `brake`, `door`, `floor-count` and `mileage` load each lift once and
//!    write one JSON artifact per lift and metric
//! 4. `mode` reads the floor count artifacts back and writes modal floors
//!
//! ```rust,no_run
//! use liftmetrics_core::PipelineConfig;
//! use liftmetrics_pipeline::{Pipeline, PipelineRunner};
//!
//! let config = PipelineConfig::from_toml_file("liftmetrics.toml").unwrap();
//! let runner = PipelineRunner::new(config, Pipeline::standard()).unwrap();
//! let summary = runner.run().unwrap();
//! println!("{} artifacts written", summary.artifacts.len());
//! ```

mod artifact;
mod runner;
mod stage;

pub use artifact::{Artifact, ArtifactWriter, MetricFamily};
pub use runner::{PipelineRunner, RunSummary};
pub use stage::{Pipeline, Stage};
