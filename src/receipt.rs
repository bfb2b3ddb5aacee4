use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EnvError, Result};

/// File written inside every completed install directory
pub const RECEIPT_FILE: &str = ".ktenv-receipt.json";

/// Install receipt (similar to a lockfile entry)
/// Records which SDK version a directory holds and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Receipt format version
    version: u32,
    /// SDK name
    pub sdk: String,
    /// Installed SDK version
    pub sdk_version: String,
    /// Resolved download URL or local archive path
    pub source: String,
    /// Hex SHA-256 of the fetched archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// When this version was installed
    pub installed_at: String,
}

impl InstallReceipt {
    pub fn new(sdk: &str, sdk_version: &str, source: &str, sha256: Option<String>) -> Self {
        Self {
            version: 1,
            sdk: sdk.to_string(),
            sdk_version: sdk_version.to_string(),
            source: source.to_string(),
            sha256,
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Load the receipt from an install directory, `None` when there is none
    pub fn load(install_dir: &Path) -> Result<Option<Self>> {
        let path = install_dir.join(RECEIPT_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|err| {
            EnvError::Config(format!("failed to read receipt {}: {err}", path.display()))
        })?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| EnvError::Config(format!("failed to parse receipt {}: {err}", path.display())))
    }

    /// Save receipt into the install directory
    pub fn save(&self, install_dir: &Path) -> Result<()> {
        let path = install_dir.join(RECEIPT_FILE);
        let contents = serde_json::to_string_pretty(self)
            .map_err(|err| EnvError::Config(format!("failed to serialize receipt: {err}")))?;
        fs::write(&path, contents).map_err(|err| {
            EnvError::Config(format!("failed to write receipt {}: {err}", path.display()))
        })
    }
}
