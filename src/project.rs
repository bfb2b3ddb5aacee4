use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EnvError, Result, ResultExt};
use crate::version::VersionSpec;

/// Project marker file name
pub const PROJECT_FILE: &str = ".ktenv.toml";

/// SDK versions pinned for a project directory (`.ktenv.toml`).
///
/// ```toml
/// [sdks]
/// go = "1.21.5"
/// node = "18.0.0"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub sdks: BTreeMap<String, String>,
}

impl ProjectFile {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(PROJECT_FILE)
    }

    /// Load the marker in `dir`, `None` when there is none.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|err| {
            EnvError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let project: ProjectFile = toml::from_str(&contents).map_err(|err| {
            EnvError::Config(format!("failed to parse {}: {err}", path.display()))
        })?;
        Ok(Some(project))
    }

    /// Nearest marker at or above `start`.
    pub fn find(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        for dir in start.ancestors() {
            if let Some(project) = Self::load(dir)? {
                debug!(dir = %dir.display(), "found project file");
                return Ok(Some((dir.to_path_buf(), project)));
            }
        }
        Ok(None)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let contents = toml::to_string_pretty(self)
            .map_err(|err| EnvError::Config(format!("failed to serialize project file: {err}")))?;
        fs::write(&path, contents).map_err(|err| {
            EnvError::Config(format!("failed to write {}: {err}", path.display()))
        })
    }

    pub fn pin(&mut self, spec: &VersionSpec) {
        self.sdks
            .insert(spec.sdk().to_string(), spec.version().to_string());
    }

    /// Load (or start) the marker in `dir`, pin `spec` and write it back.
    pub fn pin_in(dir: &Path, spec: &VersionSpec) -> Result<()> {
        let mut project = Self::load(dir)?.unwrap_or_default();
        project.pin(spec);
        project.save(dir)
    }

    /// Pinned versions as specs, in SDK name order.
    pub fn specs(&self) -> Result<Vec<VersionSpec>> {
        self.sdks
            .iter()
            .map(|(sdk, version)| {
                VersionSpec::new(sdk.as_str(), version.as_str())
                    .with_context(|| format!("invalid entry in {PROJECT_FILE}"))
            })
            .collect()
    }
}
