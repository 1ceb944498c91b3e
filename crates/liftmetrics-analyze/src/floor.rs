//! Floor stops and floor mileage.
//!
//! The two brake contacts double as a motion indicator: both set means the car
//! is moving, both clear means it is stopped, and any mixed reading is a
//! transition that breaks a pending edge. A stop is counted on every
//! moving-to-stopped edge, at the floor the car stopped on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use liftmetrics_core::{LiftError, PipelineConfig, Table};

use crate::dataset::LiftAnalyzer;

/// Stop count per floor, ordered by floor number.
pub type FloorCounts = BTreeMap<i64, u64>;

/// Motion derived from the two brake contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Moving,
    Stopped,
    Transitional,
}

impl MotionState {
    pub fn from_bits(primary: u8, secondary: u8) -> Self {
        match (primary, secondary) {
            (1, 1) => Self::Moving,
            (0, 0) => Self::Stopped,
            _ => Self::Transitional,
        }
    }
}

/// Stops and mileage of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloorTravel {
    pub stops: FloorCounts,
    pub mileage: u64,
}

/// Floor stop counts for one lift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorCountReport {
    #[serde(rename = "total of floor number travelled by the lift")]
    pub total: FloorCounts,
    pub files: BTreeMap<String, FloorCounts>,
}

/// Floor mileage for one lift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageReport {
    pub total_mileage: u64,
    pub file_mileages: BTreeMap<String, u64>,
}

/// Both travel reports, produced in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelReport {
    pub floors: FloorCountReport,
    pub mileage: MileageReport,
}

/// Counts stops per floor and accumulates floors travelled between stops.
#[derive(Debug, Clone)]
pub struct FloorTravelAnalyzer {
    primary: String,
    secondary: String,
    floor: String,
    track_mileage: bool,
}

impl FloorTravelAnalyzer {
    pub fn new(
        primary: impl Into<String>,
        secondary: impl Into<String>,
        floor: impl Into<String>,
    ) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            floor: floor.into(),
            track_mileage: true,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            &config.columns.brake_primary,
            &config.columns.brake_secondary,
            &config.columns.floor,
        )
        .with_mileage(config.track_mileage)
    }

    /// Enable or disable mileage accumulation.
    pub fn with_mileage(mut self, track: bool) -> Self {
        self.track_mileage = track;
        self
    }
}

impl Default for FloorTravelAnalyzer {
    fn default() -> Self {
        Self::new("_mb1s", "_mb2s", "_lfls")
    }
}

impl LiftAnalyzer for FloorTravelAnalyzer {
    type FileResult = FloorTravel;
    type Report = TravelReport;

    fn empty_report(&self) -> TravelReport {
        TravelReport::default()
    }

    fn analyze_table(&self, table: &Table) -> Result<FloorTravel, LiftError> {
        let primary = table.require_column(&self.primary)?;
        let secondary = table.require_column(&self.secondary)?;
        let floor = table.require_column(&self.floor)?;

        let mut travel = FloorTravel::default();
        let mut previous = MotionState::Moving;
        let mut origin: Option<i64> = None;

        for row in table.rows() {
            let state = MotionState::from_bits(table.bit(row, primary)?, table.bit(row, secondary)?);
            let current = table.floor(row, floor)?;
            let start = *origin.get_or_insert(current);

            match (previous, state) {
                (MotionState::Stopped, MotionState::Moving) => origin = Some(current),
                (MotionState::Moving, MotionState::Stopped) => {
                    *travel.stops.entry(current).or_default() += 1;
                    if self.track_mileage {
                        travel.mileage += current.abs_diff(start);
                        origin = Some(current);
                    }
                }
                _ => {}
            }
            previous = state;
        }

        Ok(travel)
    }

    fn record(&self, report: &mut TravelReport, file_name: &str, result: FloorTravel) {
        for (&floor, &count) in &result.stops {
            *report.floors.total.entry(floor).or_default() += count;
        }
        report.floors.files.insert(file_name.to_string(), result.stops);

        report.mileage.total_mileage += result.mileage;
        report
            .mileage
            .file_mileages
            .insert(file_name.to_string(), result.mileage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn travel_table(rows: &[[&str; 3]]) -> Table {
        let mut table = Table::new(["_mb1s", "_mb2s", "_lfls"]);
        for row in rows {
            table.push(row.iter());
        }
        table
    }

    #[test]
    fn test_stops_and_mileage() {
        let table = travel_table(&[
            ["1", "1", "3"],
            ["0", "0", "3"],
            ["1", "1", "3"],
            ["0", "0", "7"],
        ]);
        let travel = FloorTravelAnalyzer::default().analyze_table(&table).unwrap();

        assert_eq!(travel.mileage, 4);
        assert_eq!(travel.stops, FloorCounts::from([(3, 1), (7, 1)]));
    }

    #[test]
    fn test_first_row_stopped_counts_as_stop() {
        // The car is assumed to be moving before the first row
        let table = travel_table(&[["0", "0", "5"]]);
        let travel = FloorTravelAnalyzer::default().analyze_table(&table).unwrap();
        assert_eq!(travel.stops, FloorCounts::from([(5, 1)]));
        assert_eq!(travel.mileage, 0);
    }

    #[test]
    fn test_transitional_breaks_edge() {
        let table = travel_table(&[["1", "1", "2"], ["1", "0", "2"], ["0", "0", "2"]]);
        let travel = FloorTravelAnalyzer::default().analyze_table(&table).unwrap();
        assert!(travel.stops.is_empty());
    }

    #[test]
    fn test_origin_defaults_to_first_floor() {
        let table = travel_table(&[["1", "1", "2"], ["0", "0", "6"]]);
        let travel = FloorTravelAnalyzer::default().analyze_table(&table).unwrap();
        assert_eq!(travel.mileage, 4);
    }

    #[test]
    fn test_mileage_disabled() {
        let table = travel_table(&[["1", "1", "2"], ["0", "0", "6"]]);
        let travel = FloorTravelAnalyzer::default()
            .with_mileage(false)
            .analyze_table(&table)
            .unwrap();
        assert_eq!(travel.mileage, 0);
        assert_eq!(travel.stops.len(), 1);
    }

    #[test]
    fn test_bad_floor_is_malformed() {
        let table = travel_table(&[["1", "1", "lobby"]]);
        let err = FloorTravelAnalyzer::default().analyze_table(&table).unwrap_err();
        assert!(matches!(err, LiftError::MalformedRow { .. }));
    }

    #[test]
    fn test_floor_report_key() {
        let report = FloorCountReport {
            total: FloorCounts::from([(3, 1)]),
            files: BTreeMap::new(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"total of floor number travelled by the lift":{"3":1},"files":{}}"#
        );
    }
}
