//! Pipeline stages and their ordering.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use liftmetrics_core::LiftError;

use crate::artifact::MetricFamily;

/// One step of a pipeline run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Remove duplicate files and directories from the raw tree.
    FileDedup,
    /// Collapse adjacent duplicate rows into the clean tree.
    RowDedup,
    /// Brake opening and closing counts.
    Brake,
    /// Door opening and closing cycles.
    Door,
    /// Stops per floor.
    FloorCount,
    /// Floors travelled.
    Mileage,
    /// Most visited floor, from floor count artifacts.
    Mode,
}

impl Stage {
    /// Stages with a lower rank must run first.
    fn rank(self) -> u8 {
        match self {
            Self::FileDedup => 0,
            Self::RowDedup => 1,
            Self::Brake | Self::Door | Self::FloorCount | Self::Mileage => 2,
            Self::Mode => 3,
        }
    }

    /// Whether the stage reads the tables of each lift.
    pub fn is_per_lift(self) -> bool {
        self.rank() == 2
    }

    /// Artifact family the stage writes, if any.
    pub fn family(self) -> Option<MetricFamily> {
        match self {
            Self::FileDedup | Self::RowDedup => None,
            Self::Brake => Some(MetricFamily::Brake),
            Self::Door => Some(MetricFamily::Door),
            Self::FloorCount => Some(MetricFamily::FloorCount),
            Self::Mileage => Some(MetricFamily::Mileage),
            Self::Mode => Some(MetricFamily::Mode),
        }
    }
}

/// Ordered list of stages executed by a [`PipelineRunner`](crate::PipelineRunner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Every stage, in order.
    pub fn standard() -> Self {
        Self {
            stages: Stage::iter().collect(),
        }
    }

    /// All per-lift analytics followed by mode aggregation.
    pub fn analytics() -> Self {
        Self {
            stages: Stage::iter().filter(|s| s.rank() >= 2).collect(),
        }
    }

    /// Validate a custom stage list.
    ///
    /// File deduplication must precede row deduplication, which must precede
    /// the analytics; floor counts must precede mode aggregation. Each stage
    /// may appear once.
    pub fn new(stages: Vec<Stage>) -> Result<Self, LiftError> {
        if stages.is_empty() {
            return Err(LiftError::InvalidConfig {
                message: "pipeline has no stages".to_string(),
            });
        }
        for (i, pair) in stages.windows(2).enumerate() {
            let (before, after) = (pair[0], pair[1]);
            if before.rank() > after.rank() {
                return Err(LiftError::InvalidConfig {
                    message: format!("stage '{after}' cannot run after '{before}'"),
                });
            }
            if stages[..=i].contains(&after) {
                return Err(LiftError::InvalidConfig {
                    message: format!("stage '{after}' listed twice"),
                });
            }
        }
        Ok(Self { stages })
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Whether any per-lift stage is selected.
    pub fn has_per_lift(&self) -> bool {
        self.stages.iter().any(|s| s.is_per_lift())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
