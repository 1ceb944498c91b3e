//! Door opening and closing cycles.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use liftmetrics_core::{DoorPattern, LiftError, PipelineConfig, Row, Table};

use crate::dataset::LiftAnalyzer;
use crate::transition::{DoorLatch, SignalTransitionEngine};

/// Door cycles of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorFileResult {
    pub cycles: u64,
    /// Date of the earliest timestamped row; `None` when no row had a valid timestamp.
    pub date: Option<NaiveDate>,
}

/// Door cycles for one lift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorReport {
    pub total_cycles: u64,
    pub files: BTreeMap<String, DoorFileResult>,
}

/// Counts door cycles over rows ordered by timestamp.
///
/// Rows whose timestamp cannot be parsed are dropped before the scan; rows
/// with equal timestamps keep their file order.
#[derive(Debug, Clone)]
pub struct DoorAnalyzer {
    engine: SignalTransitionEngine<DoorLatch>,
    timestamp: String,
}

impl DoorAnalyzer {
    pub fn new(door: impl Into<String>, timestamp: impl Into<String>, pattern: DoorPattern) -> Self {
        Self {
            engine: SignalTransitionEngine::new(pattern.into(), vec![door.into()]),
            timestamp: timestamp.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.columns.door, &config.columns.timestamp, config.door)
    }
}

impl Default for DoorAnalyzer {
    fn default() -> Self {
        Self::new("_lds", "_gts", DoorPattern::default())
    }
}

impl LiftAnalyzer for DoorAnalyzer {
    type FileResult = DoorFileResult;
    type Report = DoorReport;

    fn empty_report(&self) -> DoorReport {
        DoorReport::default()
    }

    fn analyze_table(&self, table: &Table) -> Result<DoorFileResult, LiftError> {
        let column = table.require_column(&self.timestamp)?;

        let mut timed: Vec<(NaiveDateTime, &Row)> = table
            .rows()
            .iter()
            .filter_map(|row| table.timestamp(row, column).map(|ts| (ts, row)))
            .collect();
        // Stable, so equal timestamps keep file order
        timed.sort_by_key(|(ts, _)| *ts);

        let date = timed.first().map(|(ts, _)| ts.date());
        let counts = self
            .engine
            .scan_rows(table, timed.iter().map(|(_, row)| *row))?;

        Ok(DoorFileResult {
            cycles: counts.cycles,
            date,
        })
    }

    fn record(&self, report: &mut DoorReport, file_name: &str, result: DoorFileResult) {
        report.total_cycles += result.cycles;
        report.files.insert(file_name.to_string(), result);
    }
}
