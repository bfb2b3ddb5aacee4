use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the ktenv base directory.
pub const BASE_DIR_ENV: &str = "KTENV_BASE_DIR";

/// Well-known locations under the ktenv base directory
#[derive(Debug, Clone, Copy)]
pub enum KtenvPath {
    /// Base directory: $KTENV_BASE_DIR or ~/.ktenv
    Base,
    /// Declarative config: base/config/module/shell_env.yml
    ConfigFile,
    /// Mutable active state: base/data/shell_env/active.json
    StateFile,
    /// Custom scripts sourced by the full shell script: base/data/shell_env
    CustomScripts,
    /// Default SDK install root: base/sdk
    SdkDir,
}

/// Resolved ktenv directory layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Layout rooted at `$KTENV_BASE_DIR`, falling back to `~/.ktenv`
    pub fn from_env() -> Result<Self> {
        let base_dir = match env::var(BASE_DIR_ENV) {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
            _ => home_dir()?.join(".ktenv"),
        };
        Ok(Self::new(base_dir))
    }

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path(&self, path_type: KtenvPath) -> PathBuf {
        match path_type {
            KtenvPath::Base => self.base_dir.clone(),
            KtenvPath::ConfigFile => self.base_dir.join("config/module/shell_env.yml"),
            KtenvPath::StateFile => self.base_dir.join("data/shell_env/active.json"),
            KtenvPath::CustomScripts => self.base_dir.join("data/shell_env"),
            KtenvPath::SdkDir => self.base_dir.join("sdk"),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .context("Failed to get home directory")
        .map(|bd| bd.home_dir().to_path_buf())
}

/// Expands `$base`, `$config`, `$data`, `$tmp`, a leading `~` and process
/// environment variables in config paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
    sdk_dir: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sdk_dir: None,
        }
    }

    /// Also expand `$sdk_dir`, used by SDK install templates.
    pub fn with_sdk_dir(mut self, sdk_dir: impl Into<PathBuf>) -> Self {
        self.sdk_dir = Some(sdk_dir.into());
        self
    }

    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "base" => self.base_dir.clone(),
            "config" => self.base_dir.join("config"),
            "data" => self.base_dir.join("data"),
            "tmp" => self.base_dir.join("tmp"),
            "sdk_dir" => self.sdk_dir.clone()?,
            other => return env::var(other).ok(),
        };
        Some(value.to_string_lossy().into_owned())
    }

    /// Substitute variables without touching relative paths.
    pub fn expand(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }

        shellexpand::full_with_context_no_errors(
            path,
            || directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_string_lossy().into_owned()),
            |name| self.variable(name),
        )
        .into_owned()
    }

    /// Expand and make absolute, joining relative results onto `relative_to`.
    pub fn resolve_from(&self, path: &str, relative_to: &Path) -> PathBuf {
        let expanded = PathBuf::from(self.expand(path));
        if expanded.is_absolute() {
            expanded
        } else {
            relative_to.join(expanded)
        }
    }

    /// Expand and make absolute against the current working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| self.base_dir.clone());
        self.resolve_from(path, &cwd)
    }
}
