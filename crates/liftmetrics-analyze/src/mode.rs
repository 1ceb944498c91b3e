//! Most frequently visited floor.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use liftmetrics_core::{FileWarning, LiftError, ModeConfig, TieBreak, WarningKind};

use crate::floor::{FloorCountReport, FloorCounts};

/// Modal floor per file and per lift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeReport {
    /// Mode of the summed counts; `None` when no file had a countable floor.
    pub total_mode: Option<i64>,
    pub file_modes: BTreeMap<String, i64>,
}

/// Picks modal floors from floor stop counts.
#[derive(Debug, Clone)]
pub struct ModeAggregator {
    excluded: BTreeSet<i64>,
    tie_break: TieBreak,
}

impl ModeAggregator {
    pub fn new(config: &ModeConfig) -> Self {
        Self {
            excluded: config.excluded_floors.iter().copied().collect(),
            tie_break: config.tie_break,
        }
    }

    /// Floor with the highest count among non-excluded floors.
    pub fn mode_of(&self, counts: &FloorCounts) -> Option<i64> {
        let mut best: Option<(i64, u64)> = None;
        for (&floor, &count) in counts {
            if self.excluded.contains(&floor) || count == 0 {
                continue;
            }
            // Floors arrive in ascending order
            let wins = match best {
                None => true,
                Some((_, top)) => match self.tie_break {
                    TieBreak::LowestFloor => count > top,
                    TieBreak::HighestFloor => count >= top,
                },
            };
            if wins {
                best = Some((floor, count));
            }
        }
        best.map(|(floor, _)| floor)
    }

    /// Modes of every file and of the lift as a whole.
    ///
    /// Files without a countable floor are left out with a warning. The lift
    /// mode is taken over the sum of the per-file counts that remain.
    pub fn aggregate(&self, report: &FloorCountReport, source: &Path) -> (ModeReport, Vec<FileWarning>) {
        let mut modes = ModeReport::default();
        let mut warnings = Vec::new();
        let mut total = FloorCounts::new();

        for (file_name, counts) in &report.files {
            let Some(mode) = self.mode_of(counts) else {
                tracing::warn!(file = %file_name, "no countable floors, omitting from modes");
                warnings.push(FileWarning::new(
                    file_name,
                    "No countable floor stops",
                    WarningKind::NoData,
                ));
                continue;
            };
            modes.file_modes.insert(file_name.clone(), mode);
            for (&floor, &count) in counts {
                if !self.excluded.contains(&floor) {
                    *total.entry(floor).or_default() += count;
                }
            }
        }

        modes.total_mode = self.mode_of(&total);
        if modes.total_mode.is_none() {
            let err = LiftError::NoDataForAggregation {
                context: format!("floor counts in {}", source.display()),
            };
            tracing::warn!(error = %err, "lift mode unavailable");
            warnings.push(FileWarning::from_error(source, &err));
        }

        (modes, warnings)
    }

    /// Read a floor count artifact and aggregate it.
    pub fn aggregate_file(&self, path: &Path) -> Result<(ModeReport, Vec<FileWarning>), LiftError> {
        let data = std::fs::read(path).map_err(|e| LiftError::io(path, e))?;
        let report: FloorCountReport =
            serde_json::from_slice(&data).map_err(|e| LiftError::Json {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(self.aggregate(&report, path))
    }
}

impl Default for ModeAggregator {
    fn default() -> Self {
        Self::new(&ModeConfig::default())
    }
}
