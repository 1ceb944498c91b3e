//! Lift identity and per-lift datasets.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::{FileWarning, WarningKind};

/// Identifier of a single lift, e.g. `LIFT07`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiftId(CompactString);

impl LiftId {
    /// Create a lift id.
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parts of a log file name: `<site>-<lift>-FROM_<start>_TO_<end>.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftFileName {
    /// Job site, the first segment.
    pub site: CompactString,
    /// Lift identity, the second segment.
    pub lift: LiftId,
}

impl LiftFileName {
    /// Parse a file name. Needs at least two hyphen-separated segments and a
    /// non-blank second one.
    pub fn parse(file_name: &str) -> Option<Self> {
        let mut parts = file_name.split('-');
        let site = parts.next()?.trim();
        let lift = parts.next()?.trim();
        if lift.is_empty() {
            return None;
        }
        // A bare "<site>-<lift>.csv" still carries the extension on the lift.
        let lift = match parts.next() {
            Some(_) => lift,
            None => lift.split('.').next().unwrap_or(lift),
        };
        Some(Self {
            site: CompactString::new(site),
            lift: LiftId::new(lift),
        })
    }
}

/// All log files of one lift, ordered by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftDataset {
    /// The lift these files belong to.
    pub lift: LiftId,
    /// File name to full path.
    pub files: BTreeMap<String, PathBuf>,
}

impl LiftDataset {
    /// Create an empty dataset.
    pub fn new(lift: LiftId) -> Self {
        Self {
            lift,
            files: BTreeMap::new(),
        }
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the dataset has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Lift datasets grouped from a set of paths, plus files that could not be grouped.
#[derive(Debug, Clone, Default)]
pub struct LiftGrouping {
    pub datasets: Vec<LiftDataset>,
    pub warnings: Vec<FileWarning>,
}

/// Group log files by the lift id embedded in their names.
///
/// Paths are considered in sorted order so the grouping is stable; when two
/// paths of the same lift share a file name, the first one wins.
pub fn group_by_lift<I, P>(paths: I) -> LiftGrouping
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut sorted: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    sorted.sort();

    let mut by_lift: BTreeMap<LiftId, LiftDataset> = BTreeMap::new();
    let mut warnings = Vec::new();

    for path in sorted {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(parsed) = LiftFileName::parse(&name) else {
            tracing::warn!(path = %path.display(), "file name carries no lift id, skipping");
            warnings.push(FileWarning::new(
                &path,
                format!("Cannot derive lift id from '{name}'"),
                WarningKind::Ungrouped,
            ));
            continue;
        };

        let dataset = by_lift
            .entry(parsed.lift.clone())
            .or_insert_with(|| LiftDataset::new(parsed.lift));
        if let Some(existing) = dataset.files.get(&name) {
            warnings.push(FileWarning::new(
                &path,
                format!("Duplicate file name, keeping {}", existing.display()),
                WarningKind::Ungrouped,
            ));
            continue;
        }
        dataset.files.insert(name, path);
    }

    LiftGrouping {
        datasets: by_lift.into_values().collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_name() {
        let parsed =
            LiftFileName::parse("TOWERA-LIFT07-FROM_2024-01-01T00_00_TO_2024-01-02T00_00.csv")
                .unwrap();
        assert_eq!(parsed.site, "TOWERA");
        assert_eq!(parsed.lift.as_str(), "LIFT07");
    }

    #[test]
    fn test_parse_short_name() {
        let parsed = LiftFileName::parse("SITE-L2.csv").unwrap();
        assert_eq!(parsed.lift.as_str(), "L2");
        assert!(LiftFileName::parse("nohyphen.csv").is_none());
        assert!(LiftFileName::parse("SITE- -x.csv").is_none());
    }

    #[test]
    fn test_group_by_lift() {
        let grouping = group_by_lift([
            "/d/a/S-L2-FROM_b.csv",
            "/d/a/S-L1-FROM_a.csv",
            "/d/b/S-L1-FROM_c.csv",
            "/d/b/orphan.csv",
        ]);

        assert_eq!(grouping.datasets.len(), 2);
        assert_eq!(grouping.datasets[0].lift.as_str(), "L1");
        assert_eq!(grouping.datasets[0].len(), 2);
        assert_eq!(grouping.warnings.len(), 1);
        assert_eq!(grouping.warnings[0].kind, WarningKind::Ungrouped);
    }

    #[test]
    fn test_group_keeps_first_duplicate_name() {
        let grouping = group_by_lift(["/d/b/S-L1-x.csv", "/d/a/S-L1-x.csv"]);
        assert_eq!(grouping.datasets[0].files["S-L1-x.csv"], PathBuf::from("/d/a/S-L1-x.csv"));
        assert_eq!(grouping.warnings.len(), 1);
    }
}
