//! Pipeline configuration.
//!
//! Every component receives the pieces of [`PipelineConfig`] it needs at
//! construction time. Configuration is usually loaded from a TOML file:
//!
//! ```toml
//! root = "/srv/lift-logs"
//! raw_dir = "csv_files"
//! clean_dir = "data_deduplication"
//! output_dir = "Data Analysis"
//! ignore_columns = ["id", "_gts", "created_at"]
//! parallel_lifts = true
//!
//! [removal]
//! mode = "quarantine"
//! dir = "/srv/lift-logs/quarantine"
//!
//! [mode]
//! excluded_floors = [0]
//! tie_break = "lowest_floor"
//! ```

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LiftError;

/// Column names of the signals the analyzers read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalColumns {
    /// First brake contact, also the first motion bit.
    pub brake_primary: String,
    /// Second brake contact, also the second motion bit.
    pub brake_secondary: String,
    /// Door contact.
    pub door: String,
    /// Floor position indicator.
    pub floor: String,
    /// Sample timestamp.
    pub timestamp: String,
}

impl Default for SignalColumns {
    fn default() -> Self {
        Self {
            brake_primary: "_mb1s".to_string(),
            brake_secondary: "_mb2s".to_string(),
            door: "_lds".to_string(),
            floor: "_lfls".to_string(),
            timestamp: "_gts".to_string(),
        }
    }
}

/// Brake cycle edge: a cycle is one transition from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakePattern {
    pub from: [u8; 2],
    pub to: [u8; 2],
}

impl Default for BrakePattern {
    fn default() -> Self {
        Self {
            from: [1, 1],
            to: [0, 0],
        }
    }
}

/// Door cycle latch: the door opens on `open_value` and closes on the other bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorPattern {
    pub open_value: u8,
}

impl Default for DoorPattern {
    fn default() -> Self {
        Self { open_value: 1 }
    }
}

/// Which floor wins when several share the highest stop count.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TieBreak {
    /// Smallest floor number among the tied floors.
    #[default]
    LowestFloor,
    /// Largest floor number among the tied floors.
    HighestFloor,
}

/// Settings for floor mode aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    /// Floors that never count towards a mode.
    pub excluded_floors: Vec<i64>,
    /// Tie-break policy.
    pub tie_break: TieBreak,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            excluded_floors: vec![0],
            tie_break: TieBreak::LowestFloor,
        }
    }
}

/// What happens to a duplicate file or directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RemovalMode {
    /// Remove permanently. Not reversible.
    #[default]
    Delete,
    /// Move under `dir`, keeping the path relative to the deduplicated root.
    Quarantine { dir: PathBuf },
    /// Move to the platform trash.
    Trash,
}

impl RemovalMode {
    /// Whether duplicates are gone for good.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PipelineConfig {
    /// Base directory. Relative directories below resolve against it.
    #[serde(default)]
    pub root: PathBuf,

    /// Downloaded logs: file deduplication target, row deduplication input.
    #[builder(default = "PathBuf::from(\"csv_files\")")]
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,

    /// Row-deduplicated logs: analytics input.
    #[builder(default = "PathBuf::from(\"data_deduplication\")")]
    #[serde(default = "default_clean_dir")]
    pub clean_dir: PathBuf,

    /// Where JSON artifacts are written.
    #[builder(default = "PathBuf::from(\"Data Analysis\")")]
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Glob patterns selecting log files (matched case-insensitively on the name).
    #[builder(default = "vec![\"*.csv\".to_string()]")]
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,

    /// Columns excluded from the adjacent-row comparison key.
    #[builder(default = "default_ignore_columns()")]
    #[serde(default = "default_ignore_columns")]
    pub ignore_columns: Vec<String>,

    /// Replacement for missing cells.
    #[builder(default = "\"0\".to_string()")]
    #[serde(default = "default_null_placeholder")]
    pub null_placeholder: String,

    #[builder(default)]
    #[serde(default)]
    pub columns: SignalColumns,

    #[builder(default)]
    #[serde(default)]
    pub brake: BrakePattern,

    #[builder(default)]
    #[serde(default)]
    pub door: DoorPattern,

    /// Accumulate floor mileage alongside stop counts.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub track_mileage: bool,

    #[builder(default)]
    #[serde(default)]
    pub mode: ModeConfig,

    #[builder(default)]
    #[serde(default)]
    pub removal: RemovalMode,

    /// Analyze lifts on the rayon pool instead of one after another.
    #[builder(default = "false")]
    #[serde(default)]
    pub parallel_lifts: bool,
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("csv_files")
}

fn default_clean_dir() -> PathBuf {
    PathBuf::from("data_deduplication")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Data Analysis")
}

fn default_file_patterns() -> Vec<String> {
    vec!["*.csv".to_string()]
}

fn default_ignore_columns() -> Vec<String> {
    ["id", "_gts", "created_at"].map(String::from).to_vec()
}

fn default_null_placeholder() -> String {
    "0".to_string()
}

fn default_true() -> bool {
    true
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if !root.as_os_str().is_empty() => {}
            Some(_) => return Err("Root path cannot be empty".to_string()),
            None => return Err("Root path is required".to_string()),
        }
        if let Some(ref patterns) = self.file_patterns {
            if patterns.is_empty() {
                return Err("At least one file pattern is required".to_string());
            }
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Create a new config builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Create a config with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw_dir: default_raw_dir(),
            clean_dir: default_clean_dir(),
            output_dir: default_output_dir(),
            file_patterns: default_file_patterns(),
            ignore_columns: default_ignore_columns(),
            null_placeholder: default_null_placeholder(),
            columns: SignalColumns::default(),
            brake: BrakePattern::default(),
            door: DoorPattern::default(),
            track_mileage: true,
            mode: ModeConfig::default(),
            removal: RemovalMode::default(),
            parallel_lifts: false,
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, LiftError> {
        let config: Self = toml::from_str(source).map_err(|e| LiftError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LiftError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LiftError::ConfigMissing {
                setting: format!("config file {}", path.display()),
            },
            _ => LiftError::io(path, e),
        })?;
        Self::from_toml_str(&source)
    }

    /// Check settings that deserialization cannot enforce.
    pub fn validate(&self) -> Result<(), LiftError> {
        if self.root.as_os_str().is_empty() {
            return Err(LiftError::ConfigMissing {
                setting: "root".to_string(),
            });
        }
        if self.file_patterns.is_empty() {
            return Err(LiftError::ConfigMissing {
                setting: "file_patterns".to_string(),
            });
        }
        if self.brake.from.iter().chain(&self.brake.to).any(|b| *b > 1) || self.door.open_value > 1
        {
            return Err(LiftError::InvalidConfig {
                message: "signal patterns may only contain 0 or 1".to_string(),
            });
        }
        if self.brake.from == self.brake.to {
            return Err(LiftError::InvalidConfig {
                message: "brake cycle must change state".to_string(),
            });
        }
        if let RemovalMode::Quarantine { ref dir } = self.removal {
            if dir.as_os_str().is_empty() {
                return Err(LiftError::ConfigMissing {
                    setting: "removal.dir".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Directory holding the downloaded logs.
    pub fn raw_path(&self) -> PathBuf {
        self.root.join(&self.raw_dir)
    }

    /// Directory holding the row-deduplicated logs.
    pub fn clean_path(&self) -> PathBuf {
        self.root.join(&self.clean_dir)
    }

    /// Directory receiving JSON artifacts.
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }

    /// Removal mode with a relative quarantine directory resolved against the root.
    pub fn resolved_removal(&self) -> RemovalMode {
        match &self.removal {
            RemovalMode::Quarantine { dir } => RemovalMode::Quarantine {
                dir: self.root.join(dir),
            },
            other => other.clone(),
        }
    }

    /// Compile the file patterns into a matcher.
    pub fn file_matcher(&self) -> Result<FileMatcher, LiftError> {
        FileMatcher::new(&self.file_patterns)
    }
}

/// Case-insensitive glob filter over file names.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    set: GlobSet,
}

impl FileMatcher {
    /// Compile `patterns`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, LiftError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| LiftError::InvalidConfig {
                    message: format!("bad file pattern '{}': {e}", pattern.as_ref()),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| LiftError::InvalidConfig {
            message: e.to_string(),
        })?;
        Ok(Self { set })
    }

    /// Check whether a file name matches any pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    /// Check a path by its final component.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}
