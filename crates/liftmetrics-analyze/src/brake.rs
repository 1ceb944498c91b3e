//! Brake opening and closing counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use liftmetrics_core::{BrakePattern, LiftError, PipelineConfig, Table};

use crate::dataset::LiftAnalyzer;
use crate::transition::{EdgePattern, SignalTransitionEngine, TransitionCounts};

/// Brake counts for one lift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrakeReport {
    /// Sum over all files.
    pub total_counts: TransitionCounts,
    /// Counts per file name.
    pub files: BTreeMap<String, TransitionCounts>,
}

/// Counts brake contact values and engage-to-release cycles.
#[derive(Debug, Clone)]
pub struct BrakeAnalyzer {
    engine: SignalTransitionEngine<EdgePattern<2>>,
}

impl BrakeAnalyzer {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>, pattern: BrakePattern) -> Self {
        Self {
            engine: SignalTransitionEngine::new(
                pattern.into(),
                vec![primary.into(), secondary.into()],
            ),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            &config.columns.brake_primary,
            &config.columns.brake_secondary,
            config.brake,
        )
    }
}

impl Default for BrakeAnalyzer {
    fn default() -> Self {
        Self::new("_mb1s", "_mb2s", BrakePattern::default())
    }
}

impl LiftAnalyzer for BrakeAnalyzer {
    type FileResult = TransitionCounts;
    type Report = BrakeReport;

    fn analyze_table(&self, table: &Table) -> Result<TransitionCounts, LiftError> {
        self.engine.scan(table)
    }

    fn empty_report(&self) -> BrakeReport {
        BrakeReport {
            total_counts: TransitionCounts::for_columns(self.engine.columns()),
            files: BTreeMap::new(),
        }
    }

    fn record(&self, report: &mut BrakeReport, file_name: &str, result: TransitionCounts) {
        report.total_counts.merge(&result);
        report.files.insert(file_name.to_string(), result);
    }
}
