//! Adjacent-row deduplication.
//!
//! Controllers repeat the last sample until a signal changes, so most rows of
//! a raw log are copies of the row before them. [`RowDeduper`] drops a row when
//! its comparison key equals the key of the previous kept row. Rows that repeat
//! an earlier, non-adjacent value are kept.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use compact_str::CompactString;
use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use liftmetrics_core::{
    FileMatcher, FileWarning, LiftError, PipelineConfig, RemovalMode, Row, Table,
};
use liftmetrics_scan::discover_logs_excluding;

/// Separator between cells of a comparison key. Cannot appear in trimmed CSV text.
const KEY_SEPARATOR: char = '\u{1f}';

/// Configuration for adjacent-row deduplication.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RowDedupConfig {
    /// Columns left out of the comparison key. They are still written out.
    #[builder(default = "vec![\"id\".into(), \"_gts\".into(), \"created_at\".into()]")]
    pub ignore_columns: Vec<String>,

    /// Value written in place of missing cells.
    #[builder(default = "\"0\".to_string()")]
    pub null_placeholder: String,

    /// Glob patterns selecting the files processed by [`RowDeduper::process_tree`].
    #[builder(default = "vec![\"*.csv\".to_string()]")]
    pub file_patterns: Vec<String>,

    /// Directories below the input tree that [`RowDeduper::process_tree`] skips.
    #[builder(default)]
    pub exclude_dirs: Vec<PathBuf>,
}

impl Default for RowDedupConfig {
    fn default() -> Self {
        Self {
            ignore_columns: vec!["id".into(), "_gts".into(), "created_at".into()],
            null_placeholder: "0".to_string(),
            file_patterns: vec!["*.csv".to_string()],
            exclude_dirs: Vec::new(),
        }
    }
}

impl RowDedupConfig {
    /// Create a new config builder.
    pub fn builder() -> RowDedupConfigBuilder {
        RowDedupConfigBuilder::default()
    }
}

impl From<&PipelineConfig> for RowDedupConfig {
    /// Quarantined duplicates are never read back.
    fn from(config: &PipelineConfig) -> Self {
        let exclude_dirs = match config.resolved_removal() {
            RemovalMode::Quarantine { dir } => vec![dir],
            _ => Vec::new(),
        };
        Self {
            ignore_columns: config.ignore_columns.clone(),
            null_placeholder: config.null_placeholder.clone(),
            file_patterns: config.file_patterns.clone(),
            exclude_dirs,
        }
    }
}

/// Result of deduplicating one table.
#[derive(Debug, Clone)]
pub struct RowDedupOutcome {
    /// Deduplicated table with missing cells filled in.
    pub table: Table,
    /// Rows in the input.
    pub rows_read: usize,
    /// Rows dropped as adjacent duplicates.
    pub rows_removed: usize,
}

/// Totals for a directory tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowDedupSummary {
    /// Files written to the output tree.
    pub files_processed: u64,
    /// Rows read across all processed files.
    pub rows_read: u64,
    /// Rows dropped across all processed files.
    pub rows_removed: u64,
    /// Files that were skipped.
    pub warnings: Vec<FileWarning>,
    /// Wall time of the run.
    pub duration: Duration,
}

/// Collapses consecutive duplicate rows.
#[derive(Debug, Clone)]
pub struct RowDeduper {
    config: RowDedupConfig,
    ignored: HashSet<CompactString>,
    placeholder: CompactString,
}

impl RowDeduper {
    /// Create a deduplicator with default settings.
    pub fn new() -> Self {
        Self::with_config(RowDedupConfig::default())
    }

    /// Create a deduplicator with custom configuration.
    pub fn with_config(config: RowDedupConfig) -> Self {
        let ignored = config
            .ignore_columns
            .iter()
            .map(|c| CompactString::new(c.trim()))
            .collect();
        let placeholder = CompactString::new(&config.null_placeholder);
        Self {
            config,
            ignored,
            placeholder,
        }
    }

    /// Drop every row whose key equals the previous kept row's key.
    ///
    /// Missing cells are replaced by the placeholder before the key is built,
    /// and the replaced value is what the returned table holds.
    pub fn dedup(&self, table: Table) -> RowDedupOutcome {
        let key_columns: Vec<usize> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.ignored.contains(*name))
            .map(|(i, _)| i)
            .collect();

        let rows_read = table.len();
        let kept: Vec<Row> = table
            .rows()
            .iter()
            .map(|row| {
                let row = self.fill_missing(row);
                (self.key(&row, &key_columns), row)
            })
            .dedup_by(|(a, _), (b, _)| a == b)
            .enumerate()
            .map(|(i, (_, mut row))| {
                // Header is line 1
                row.line = i as u64 + 2;
                row
            })
            .collect();

        let rows_removed = rows_read - kept.len();
        RowDedupOutcome {
            table: table.with_rows(kept),
            rows_read,
            rows_removed,
        }
    }

    /// Read `input`, deduplicate it and write the result to `output`.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<RowDedupOutcome, LiftError> {
        let table = Table::from_path(input)?;
        let outcome = self.dedup(table);
        outcome.table.write_path(output)?;
        Ok(outcome)
    }

    /// Deduplicate every matching file below `input` into the same relative
    /// location below `output`.
    pub fn process_tree(&self, input: &Path, output: &Path) -> Result<RowDedupSummary, LiftError> {
        let start = Instant::now();
        let matcher = FileMatcher::new(&self.config.file_patterns)?;
        let discovered = discover_logs_excluding(input, &matcher, &self.config.exclude_dirs)?;

        let mut summary = RowDedupSummary {
            warnings: discovered.warnings,
            ..RowDedupSummary::default()
        };

        for path in discovered.files {
            let target = output_path(input, output, &path);
            match self.process_file(&path, &target) {
                Ok(outcome) => {
                    tracing::debug!(
                        path = %path.display(),
                        read = outcome.rows_read,
                        removed = outcome.rows_removed,
                        "deduplicated rows"
                    );
                    summary.files_processed += 1;
                    summary.rows_read += outcome.rows_read as u64;
                    summary.rows_removed += outcome.rows_removed as u64;
                }
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping file");
                    summary.warnings.push(FileWarning::from_error(&path, &err));
                }
                Err(err) => return Err(err),
            }
        }

        summary.duration = start.elapsed();
        tracing::info!(
            files = summary.files_processed,
            rows_removed = summary.rows_removed,
            skipped = summary.warnings.len(),
            "row deduplication finished"
        );
        Ok(summary)
    }

    fn fill_missing(&self, row: &Row) -> Row {
        let cells = row
            .cells
            .iter()
            .map(|cell| Some(cell.clone().unwrap_or_else(|| self.placeholder.clone())))
            .collect();
        Row::new(cells, row.line)
    }

    fn key(&self, row: &Row, columns: &[usize]) -> String {
        columns
            .iter()
            .map(|&i| row.get(i).unwrap_or(self.placeholder.as_str()))
            .join(&KEY_SEPARATOR.to_string())
    }
}

impl Default for RowDeduper {
    fn default() -> Self {
        Self::new()
    }
}

fn output_path(input: &Path, output: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(input) {
        Ok(relative) => output.join(relative),
        Err(_) => output.join(path.file_name().unwrap_or_default()),
    }
}
