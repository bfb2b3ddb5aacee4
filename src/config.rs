use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::debug;

use crate::error::{EnvError, Result, ResultExt};
use crate::paths::PathResolver;
use crate::version::is_valid_sdk_name;

/// One supported SDK family and how to install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub name: String,
    /// Download URL template with `{version}`, `{os}` and `{arch}` placeholders
    #[serde(default, rename = "install_url", skip_serializing_if = "String::is_empty")]
    pub install_url_template: String,
    /// Install directory template, relative paths resolve under `sdk_dir`
    #[serde(rename = "install_dir")]
    pub install_dir_template: String,
    /// Extra env vars applied on activation; values may use `{sdk_path}` and `{version}`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub active_env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// `version -> sha256:<hex>` for downloaded archives
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
}

impl SdkConfig {
    pub fn new(name: impl Into<String>, install_dir_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_url_template: String::new(),
            install_dir_template: install_dir_template.into(),
            active_env: BTreeMap::new(),
            bin_dir: None,
            executable: None,
            checksums: BTreeMap::new(),
        }
    }

    pub fn with_install_url(mut self, template: impl Into<String>) -> Self {
        self.install_url_template = template.into();
        self
    }

    pub fn bin_dir(&self) -> &str {
        self.bin_dir.as_deref().unwrap_or("bin")
    }

    /// Name of the executable that proves an install is usable.
    pub fn main_executable(&self) -> Option<&str> {
        if let Some(executable) = self.executable.as_deref() {
            return Some(executable).filter(|name| !name.is_empty());
        }

        match self.name.as_str() {
            "go" | "node" | "java" | "flutter" => Some(self.name.as_str()),
            _ => None,
        }
    }
}

/// The declarative shell environment document (`shell_env.yml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellEnvConfig {
    #[serde(default)]
    pub add_paths: Vec<String>,
    #[serde(default)]
    pub add_envs: BTreeMap<String, String>,
    #[serde(default)]
    pub remove_envs: Vec<String>,
    #[serde(default)]
    pub sdk_dir: String,
    #[serde(default)]
    pub sdks: Vec<SdkConfig>,
}

impl ShellEnvConfig {
    pub fn sdk(&self, name: &str) -> Option<&SdkConfig> {
        self.sdks.iter().find(|sdk| sdk.name == name)
    }

    pub fn sdk_names(&self) -> Vec<String> {
        self.sdks.iter().map(|sdk| sdk.name.clone()).collect()
    }
}

/// Loads, validates and persists [`ShellEnvConfig`].
///
/// The document is read lazily on first use and cached for the lifetime of the manager.
#[derive(Debug)]
pub struct ConfigManager {
    config_file: PathBuf,
    base_dir: PathBuf,
    cache: Mutex<Option<ShellEnvConfig>>,
}

impl ConfigManager {
    pub fn new(config_file: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            base_dir: base_dir.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.base_dir)
    }

    fn config_path(&self) -> PathBuf {
        self.resolver()
            .resolve(&self.config_file.to_string_lossy())
    }

    /// Load the config, returning a default document when the file is absent.
    pub fn load_config(&self) -> Result<ShellEnvConfig> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| EnvError::Config("config cache lock poisoned".to_string()))?;
        if let Some(config) = cache.as_ref() {
            return Ok(config.clone());
        }

        let config = self.read_config()?;
        *cache = Some(config.clone());
        Ok(config)
    }

    fn read_config(&self) -> Result<ShellEnvConfig> {
        let path = self.config_path();
        if !path.is_file() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(self.default_config());
        }

        let contents = fs::read_to_string(&path).map_err(|err| {
            EnvError::Config(format!("failed to read config file {}: {err}", path.display()))
        })?;

        let mut config: ShellEnvConfig = if contents.trim().is_empty() {
            ShellEnvConfig::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|err| {
                EnvError::Config(format!("failed to parse config file {}: {err}", path.display()))
            })?
        };

        self.validate_config(&config)
            .with_context(|| format!("invalid config {}", path.display()))?;
        self.resolve_config_paths(&mut config);

        debug!(path = %path.display(), sdks = config.sdks.len(), "loaded config");
        Ok(config)
    }

    /// Validate, then write the config as YAML.
    pub fn save_config(&self, config: &ShellEnvConfig) -> Result<()> {
        self.validate_config(config).context("invalid config")?;

        let path = self.config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                EnvError::Config(format!(
                    "failed to create config directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_yaml::to_string(config)
            .map_err(|err| EnvError::Config(format!("failed to serialize config: {err}")))?;
        fs::write(&path, contents).map_err(|err| {
            EnvError::Config(format!("failed to write config file {}: {err}", path.display()))
        })?;

        let mut resolved = config.clone();
        self.resolve_config_paths(&mut resolved);
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(resolved);
        }

        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    pub fn get_sdk_config(&self, name: &str) -> Result<SdkConfig> {
        let config = self.load_config()?;
        config
            .sdk(name)
            .cloned()
            .ok_or_else(|| EnvError::not_found("SDK config", name))
    }

    /// Names of all configured SDKs in configuration order.
    pub fn get_supported_sdks(&self) -> Result<Vec<String>> {
        Ok(self.load_config()?.sdk_names())
    }

    /// Insert or replace an SDK entry and persist.
    pub fn add_sdk_config(&self, sdk: SdkConfig) -> Result<()> {
        let mut config = self.load_config()?;
        match config.sdks.iter_mut().find(|existing| existing.name == sdk.name) {
            Some(existing) => *existing = sdk,
            None => config.sdks.push(sdk),
        }
        self.save_config(&config)
    }

    pub fn remove_sdk_config(&self, name: &str) -> Result<()> {
        let mut config = self.load_config()?;
        let before = config.sdks.len();
        config.sdks.retain(|sdk| sdk.name != name);
        if config.sdks.len() == before {
            return Err(EnvError::not_found("SDK config", name));
        }
        self.save_config(&config)
    }

    /// Check the config invariants, failing on the first violation.
    pub fn validate_config(&self, config: &ShellEnvConfig) -> Result<()> {
        if !config.sdk_dir.is_empty() {
            let expanded = self.resolver().expand(&config.sdk_dir);
            if !Path::new(&expanded).is_absolute() {
                return Err(EnvError::Validation(format!(
                    "sdk_dir must be an absolute path: {}",
                    config.sdk_dir
                )));
            }
        }

        let mut names = HashSet::new();
        for (index, sdk) in config.sdks.iter().enumerate() {
            if sdk.name.is_empty() {
                return Err(EnvError::Validation(format!(
                    "sdks[{index}].name: SDK name is empty"
                )));
            }
            if !is_valid_sdk_name(&sdk.name) {
                return Err(EnvError::Validation(format!(
                    "sdks[{index}].name: invalid SDK name '{}'",
                    sdk.name
                )));
            }
            if !names.insert(sdk.name.as_str()) {
                return Err(EnvError::Validation(format!(
                    "sdks[{index}].name: duplicate SDK name '{}'",
                    sdk.name
                )));
            }
            if sdk.install_dir_template.trim().is_empty() {
                return Err(EnvError::Validation(format!(
                    "sdks[{index}].install_dir: install_dir is empty for {}",
                    sdk.name
                )));
            }
            for name in sdk.active_env.keys() {
                check_env_name(name, &format!("sdks[{index}].active_env"))?;
            }
            for (version, checksum) in &sdk.checksums {
                crate::sdk::parse_sha256(checksum).map_err(|err| {
                    EnvError::Validation(format!(
                        "sdks[{index}].checksums.{version}: {err}"
                    ))
                })?;
            }
        }

        for name in config.add_envs.keys() {
            check_env_name(name, "add_envs")?;
        }
        for name in &config.remove_envs {
            check_env_name(name, "remove_envs")?;
        }

        Ok(())
    }

    fn resolve_config_paths(&self, config: &mut ShellEnvConfig) {
        let resolver = self.resolver();

        config.sdk_dir = if config.sdk_dir.is_empty() {
            self.default_sdk_dir()
        } else {
            resolver.resolve(&config.sdk_dir).to_string_lossy().into_owned()
        };

        for path in config.add_paths.iter_mut() {
            *path = resolver.resolve(path).to_string_lossy().into_owned();
        }

        let sdk_dir = PathBuf::from(&config.sdk_dir);
        let resolver = resolver.with_sdk_dir(&sdk_dir);
        for sdk in config.sdks.iter_mut() {
            sdk.install_dir_template = resolver
                .resolve_from(&sdk.install_dir_template, &sdk_dir)
                .to_string_lossy()
                .into_owned();
        }
    }

    fn default_sdk_dir(&self) -> String {
        self.base_dir.join("sdk").to_string_lossy().into_owned()
    }

    fn default_config(&self) -> ShellEnvConfig {
        ShellEnvConfig {
            sdk_dir: self.default_sdk_dir(),
            ..ShellEnvConfig::default()
        }
    }
}

fn env_name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env name pattern is valid")
    })
}

/// Environment variable names start with a letter or `_`, followed by letters, digits or `_`.
pub fn is_valid_env_name(name: &str) -> bool {
    env_name_pattern().is_match(name)
}

fn check_env_name(name: &str, field: &str) -> Result<()> {
    if is_valid_env_name(name) {
        Ok(())
    } else {
        Err(EnvError::Validation(format!(
            "{field}: invalid environment variable name '{name}'"
        )))
    }
}
