//! Per-lift table loading and the analyzer seam.

use serde::Serialize;

use liftmetrics_core::{FileWarning, LiftDataset, LiftError, LiftId, Table};

/// Every readable table of one lift, in file name order.
#[derive(Debug, Clone)]
pub struct LoadedLift {
    pub lift: LiftId,
    /// File name and parsed table.
    pub tables: Vec<(String, Table)>,
    /// Files that could not be loaded.
    pub warnings: Vec<FileWarning>,
}

impl LoadedLift {
    /// Read every file of `dataset`. Unreadable, empty and malformed files are
    /// skipped with a warning.
    pub fn load(dataset: &LiftDataset) -> Result<Self, LiftError> {
        let mut tables = Vec::with_capacity(dataset.len());
        let mut warnings = Vec::new();

        for (name, path) in &dataset.files {
            match Table::from_path(path) {
                Ok(table) => tables.push((name.clone(), table)),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping file");
                    warnings.push(FileWarning::from_error(path, &err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Self {
            lift: dataset.lift.clone(),
            tables,
            warnings,
        })
    }

    /// Wrap tables that are already in memory.
    pub fn from_tables(lift: LiftId, mut tables: Vec<(String, Table)>) -> Self {
        tables.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            lift,
            tables,
            warnings: Vec::new(),
        }
    }
}

/// A per-lift report together with the files it had to skip.
#[derive(Debug, Clone)]
pub struct Analysis<R> {
    pub report: R,
    pub warnings: Vec<FileWarning>,
}

/// Turns the tables of one lift into a report.
///
/// Implementors analyze one table at a time; the provided
/// [`analyze_lift`](LiftAnalyzer::analyze_lift) folds the per-file results and
/// skips files whose analysis fails with a recoverable error.
pub trait LiftAnalyzer {
    /// Result for a single file.
    type FileResult;
    /// Aggregate result for a lift.
    type Report: Serialize;

    /// Report for a lift with no analyzable files.
    fn empty_report(&self) -> Self::Report;

    /// Analyze one table.
    fn analyze_table(&self, table: &Table) -> Result<Self::FileResult, LiftError>;

    /// Fold one file's result into the lift report.
    fn record(&self, report: &mut Self::Report, file_name: &str, result: Self::FileResult);

    /// Analyze every table of a lift.
    fn analyze_lift(&self, lift: &LoadedLift) -> Result<Analysis<Self::Report>, LiftError> {
        let mut report = self.empty_report();
        let mut warnings = Vec::new();

        for (name, table) in &lift.tables {
            match self.analyze_table(table) {
                Ok(result) => self.record(&mut report, name, result),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(lift = %lift.lift, file = %name, error = %err, "skipping file");
                    warnings.push(FileWarning::from_error(table.source(), &err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Analysis { report, warnings })
    }
}
