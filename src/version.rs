use std::fmt;
use std::str::FromStr;

use crate::error::{EnvError, Result};

/// A parsed `SDK:VERSION` (or `SDK@VERSION`) argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    sdk: String,
    version: String,
}

impl VersionSpec {
    pub fn new(sdk: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let sdk = sdk.into();
        let version = version.into();
        validate_sdk_name(&sdk)?;
        validate_version(&version)?;
        Ok(Self { sdk, version })
    }

    /// Parse user input of the form `sdk:version` or `sdk@version`.
    ///
    /// A bare SDK name is rejected: there is no remote index to resolve an
    /// implicit version against.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(EnvError::Validation(
                "empty version specification".to_string(),
            ));
        }

        let separator = if spec.contains('@') { '@' } else { ':' };
        let Some((sdk, version)) = spec.split_once(separator) else {
            return Err(EnvError::Validation(format!(
                "invalid version specification '{spec}': expected SDK:VERSION or SDK@VERSION"
            )));
        };

        let sdk = sdk.trim();
        let version = version.trim();
        if sdk.is_empty() || version.is_empty() {
            return Err(EnvError::Validation(format!(
                "invalid version specification '{spec}': SDK and version must both be set"
            )));
        }

        Self::new(sdk, version)
    }

    pub fn parse_many<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>> {
        specs.iter().map(|spec| Self::parse(spec.as_ref())).collect()
    }

    pub fn sdk(&self) -> &str {
        &self.sdk
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sdk, self.version)
    }
}

impl FromStr for VersionSpec {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// SDK names are letters, digits, `_` and `-`.
pub fn is_valid_sdk_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Versions end up inside filesystem paths, so they may not contain
/// whitespace or separators and may not be `.` or `..`.
pub fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version != "."
        && version != ".."
        && !version
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
}

pub fn validate_sdk_name(name: &str) -> Result<()> {
    if is_valid_sdk_name(name) {
        Ok(())
    } else {
        Err(EnvError::Validation(format!("invalid SDK name: '{name}'")))
    }
}

pub fn validate_version(version: &str) -> Result<()> {
    if is_valid_version(version) {
        Ok(())
    } else {
        Err(EnvError::Validation(format!("invalid version: '{version}'")))
    }
}
