//! JSON artifact layout and writing.
//!
//! Each metric family has its own directory under the output root and one
//! file per lift: `<output>/<family dir>/<prefix>-<lift>.json`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use strum::Display;

use liftmetrics_core::{LiftError, LiftId};

/// A kind of per-lift JSON artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MetricFamily {
    Brake,
    Door,
    FloorCount,
    Mileage,
    Mode,
}

impl MetricFamily {
    /// Directory below the output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Brake => "BRAKE OPENING AND CLOSING COUNT",
            Self::Door => "DOOR OPENING AND CLOSING CYCLE COUNT",
            Self::FloorCount => "FLOOR COUNT",
            Self::Mileage => "MILEAGE",
            Self::Mode => "MODE FLOOR COUNT",
        }
    }

    /// File name prefix, followed by `-<lift>.json`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Brake => "BOCC",
            Self::Door => "DC",
            Self::FloorCount => "FC",
            Self::Mileage => "M",
            Self::Mode => "MFC",
        }
    }

    /// File name of a lift's artifact.
    pub fn file_name(self, lift: &LiftId) -> String {
        format!("{}-{}.json", self.prefix(), lift)
    }

    /// Lift id encoded in an artifact file name of this family.
    pub fn lift_from_file_name(self, name: &str) -> Option<LiftId> {
        let lift = name
            .strip_prefix(self.prefix())?
            .strip_prefix('-')?
            .strip_suffix(".json")?;
        (!lift.is_empty()).then(|| LiftId::new(lift))
    }
}

/// A written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub family: MetricFamily,
    pub lift: LiftId,
    pub path: PathBuf,
}

/// Writes artifacts under an output root.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one family.
    pub fn family_dir(&self, family: MetricFamily) -> PathBuf {
        self.root.join(family.dir_name())
    }

    /// Path of a lift's artifact.
    pub fn path_for(&self, family: MetricFamily, lift: &LiftId) -> PathBuf {
        self.family_dir(family).join(family.file_name(lift))
    }

    /// Serialize `value` with a four-space indent and move it into place.
    ///
    /// The document is written to a temporary sibling first, so readers never
    /// see a partial artifact.
    pub fn write<T: Serialize>(
        &self,
        family: MetricFamily,
        lift: &LiftId,
        value: &T,
    ) -> Result<Artifact, LiftError> {
        let dir = self.family_dir(family);
        fs::create_dir_all(&dir).map_err(|e| LiftError::io(&dir, e))?;

        let path = self.path_for(family, lift);
        let bytes = to_pretty_json(value).map_err(|e| LiftError::Json {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| LiftError::io(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| LiftError::io(&tmp, e))?;
        file.sync_all().map_err(|e| LiftError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| LiftError::io(&path, e))?;

        tracing::info!(lift = %lift, family = %family, path = %path.display(), "wrote artifact");
        Ok(Artifact {
            family,
            lift: lift.clone(),
            path,
        })
    }

    /// Existing artifacts of one family, sorted by file name.
    pub fn list(&self, family: MetricFamily) -> Result<Vec<(LiftId, PathBuf)>, LiftError> {
        let dir = self.family_dir(family);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| LiftError::io(&dir, e))? {
            let path = entry.map_err(|e| LiftError::io(&dir, e))?.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(lift) = family.lift_from_file_name(&name) {
                found.push((lift, path));
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(found)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_paths() {
        let writer = ArtifactWriter::new("/out");
        let lift = LiftId::new("LIFT07");
        assert_eq!(
            writer.path_for(MetricFamily::Brake, &lift),
            PathBuf::from("/out/BRAKE OPENING AND CLOSING COUNT/BOCC-LIFT07.json")
        );
        assert_eq!(
            writer.path_for(MetricFamily::Mode, &lift),
            PathBuf::from("/out/MODE FLOOR COUNT/MFC-LIFT07.json")
        );
    }

    #[test]
    fn test_lift_from_file_name() {
        let family = MetricFamily::FloorCount;
        assert_eq!(family.lift_from_file_name("FC-L2.json"), Some(LiftId::new("L2")));
        assert_eq!(family.lift_from_file_name("FC-.json"), None);
        assert_eq!(family.lift_from_file_name("MFC-L2.json"), None);
        assert_eq!(family.lift_from_file_name("FC-L2.json.tmp"), None);
    }

    #[test]
    fn test_write_uses_four_space_indent() {
        let temp = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(temp.path());
        let value = BTreeMap::from([("total_mileage", 4)]);

        let artifact = writer
            .write(MetricFamily::Mileage, &LiftId::new("L1"), &value)
            .unwrap();

        let text = fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(text, "{\n    \"total_mileage\": 4\n}");
        assert!(!artifact.path.with_extension("json.tmp").exists());
        assert_eq!(writer.list(MetricFamily::Mileage).unwrap().len(), 1);
    }
}
