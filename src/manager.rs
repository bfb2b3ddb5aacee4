use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::{ConfigManager, ShellEnvConfig};
use crate::error::{EnvError, ErrorKind, Result, ResultExt};
use crate::paths::{KtenvPath, Paths};
use crate::project::ProjectFile;
use crate::sdk::SdkManager;
use crate::shell::{EnvDelta, ShellScriptGenerator, ShellType};
use crate::state::{ActiveState, StateManager, StateStats};
use crate::version::VersionSpec;

/// One row of `ktenv list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkInfo {
    pub name: String,
    /// `None` for a configured SDK with nothing installed
    pub version: Option<String>,
    pub is_active: bool,
    pub path: Option<PathBuf>,
    pub installed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvStats {
    pub configured_sdks: usize,
    pub installed_versions: usize,
    pub active_sdks: usize,
    pub state: StateStats,
}

/// Composes config, state, SDK installs and script generation into the
/// `use`/`unuse`/`add`/`list` verbs.
pub struct EnvManager {
    config: Arc<ConfigManager>,
    state: StateManager,
    sdks: SdkManager,
    shell: ShellScriptGenerator,
    project_dir: PathBuf,
}

impl EnvManager {
    /// Managers for the standard layout under `paths`. `program` is what the
    /// generated `ktenv` wrapper function invokes.
    pub fn new(paths: &Paths, program: impl Into<String>) -> Result<Self> {
        let config = Arc::new(ConfigManager::new(
            paths.path(KtenvPath::ConfigFile),
            paths.base_dir(),
        ));
        let sdks = SdkManager::new(Arc::clone(&config))?;
        let state = StateManager::new(paths.path(KtenvPath::StateFile));
        let shell = ShellScriptGenerator::new(program, paths.path(KtenvPath::CustomScripts));
        Ok(Self::from_parts(config, state, sdks, shell))
    }

    pub fn from_parts(
        config: Arc<ConfigManager>,
        state: StateManager,
        sdks: SdkManager,
        shell: ShellScriptGenerator,
    ) -> Self {
        let project_dir = env::current_dir().unwrap_or_default();
        Self {
            config,
            state,
            sdks,
            shell,
            project_dir,
        }
    }

    /// Directory `use --save` writes its project file to (default: cwd).
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn sdks(&self) -> &SdkManager {
        &self.sdks
    }

    /// Install `sdk` at `version` and check the result. A failed check removes the install.
    pub fn add_sdk(&self, sdk: &str, version: &str, cancel: &CancelToken) -> Result<PathBuf> {
        self.install(sdk, version, cancel)
            .with_context(|| format!("failed to add {sdk}:{version}"))
    }

    fn install(&self, sdk: &str, version: &str, cancel: &CancelToken) -> Result<PathBuf> {
        let spec = VersionSpec::new(sdk, version)?;
        self.config.get_sdk_config(spec.sdk())?;

        let path = self.sdks.install_sdk(sdk, version, cancel)?;
        if let Err(err) = self.sdks.validate_sdk(sdk, version) {
            if let Err(cleanup) = self.sdks.uninstall_sdk(sdk, version) {
                warn!(error = %cleanup, "failed to remove invalid install");
            }
            return Err(err).context("SDK validation failed");
        }

        Ok(path)
    }

    /// Activate an installed version and return the environment change to apply.
    ///
    /// When `save` is set the version is also pinned in the project file.
    pub fn use_sdk(&self, sdk: &str, version: &str, save: bool) -> Result<EnvDelta> {
        self.activate(sdk, version, save)
            .with_context(|| format!("failed to use {sdk}:{version}"))
    }

    fn activate(&self, sdk: &str, version: &str, save: bool) -> Result<EnvDelta> {
        let spec = VersionSpec::new(sdk, version)?;
        self.config.get_sdk_config(sdk)?;

        if !self.sdks.is_installed(sdk, version) {
            return Err(EnvError::NotInstalled {
                sdk: sdk.to_string(),
                version: version.to_string(),
            });
        }
        self.sdks
            .validate_sdk(sdk, version)
            .context("SDK validation failed")?;

        let bin_path = path_string(&self.sdks.get_sdk_bin_path(sdk, version)?);
        let env_vars = self.sdks.get_sdk_env_vars(sdk, version)?;

        let mut delta = EnvDelta::default();
        let previous = self.state.get_current_sdks()?.remove(sdk);
        if let Some(old_version) = previous.as_deref().filter(|old| *old != version) {
            let old_bin = path_string(&self.sdks.get_sdk_bin_path(sdk, old_version)?);
            if old_bin != bin_path {
                delta.remove_paths.push(old_bin);
            }
            let old_envs = self.sdks.get_sdk_env_vars(sdk, old_version)?;
            delta.unset_envs = old_envs
                .into_keys()
                .filter(|name| !env_vars.contains_key(name))
                .collect();
        }
        delta.add_paths.push(bin_path.clone());
        delta.set_envs = env_vars;

        self.state.update(|state| {
            for path in &delta.remove_paths {
                state.remove_path(path);
            }
            for name in &delta.unset_envs {
                state.add_envs.remove(name);
            }
            state
                .current_sdks
                .insert(sdk.to_string(), version.to_string());
            state.push_path(&bin_path);
            for (name, value) in &delta.set_envs {
                state.add_envs.insert(name.clone(), value.clone());
            }
            true
        })?;

        if save {
            ProjectFile::pin_in(&self.project_dir, &spec).context("failed to save project file")?;
        }

        info!(sdk, version, previous = previous.as_deref(), "activated SDK");
        Ok(delta)
    }

    /// Activate every version pinned in the nearest project file at or above `dir`.
    pub fn use_project(&self, dir: &Path) -> Result<EnvDelta> {
        let (project_dir, project) = ProjectFile::find(dir)?.ok_or_else(|| {
            EnvError::not_found("project file", dir.display().to_string())
        })?;

        let mut delta = EnvDelta::default();
        for spec in project
            .specs()
            .with_context(|| format!("invalid project file in {}", project_dir.display()))?
        {
            delta.merge(self.use_sdk(spec.sdk(), spec.version(), false)?);
        }
        Ok(delta)
    }

    /// Deactivate `sdk`, returning the environment change to apply.
    pub fn unuse_sdk(&self, sdk: &str) -> Result<EnvDelta> {
        self.deactivate(sdk)
            .with_context(|| format!("failed to unuse {sdk}"))
    }

    fn deactivate(&self, sdk: &str) -> Result<EnvDelta> {
        let version = self
            .state
            .get_current_sdks()?
            .remove(sdk)
            .ok_or_else(|| EnvError::NotActive(sdk.to_string()))?;

        // A config entry removed while active still has to be deactivatable.
        let delta = match self.sdk_contribution(sdk, &version) {
            Ok(delta) => delta,
            Err(err) if err.is(ErrorKind::NotFound) => {
                warn!(sdk, version = %version, error = %err, "SDK no longer configured, clearing active entry only");
                EnvDelta::default()
            }
            Err(err) => return Err(err),
        };

        self.state.update(|state| {
            state.current_sdks.remove(sdk);
            for path in &delta.remove_paths {
                state.remove_path(path);
            }
            for name in &delta.unset_envs {
                state.add_envs.remove(name);
            }
            true
        })?;

        info!(sdk, version = %version, "deactivated SDK");
        Ok(delta)
    }

    /// PATH entry and variables `sdk` at `version` adds while active, as a removal.
    fn sdk_contribution(&self, sdk: &str, version: &str) -> Result<EnvDelta> {
        let bin_path = path_string(&self.sdks.get_sdk_bin_path(sdk, version)?);
        Ok(EnvDelta {
            remove_paths: vec![bin_path],
            unset_envs: self
                .sdks
                .get_sdk_env_vars(sdk, version)?
                .into_keys()
                .collect(),
            ..Default::default()
        })
    }

    /// Uninstall a version. Active versions must be unused first.
    pub fn remove_sdk(&self, sdk: &str, version: &str) -> Result<()> {
        let active = self.state.get_current_sdks()?;
        if active.get(sdk).map(String::as_str) == Some(version) {
            return Err(EnvError::Validation(format!(
                "failed to remove {sdk}:{version}: it is active, run 'ktenv unuse {sdk}' first"
            )));
        }

        self.sdks
            .uninstall_sdk(sdk, version)
            .with_context(|| format!("failed to remove {sdk}:{version}"))
    }

    /// Configured SDKs with their installed versions. SDKs with nothing
    /// installed are listed once with `installed == false`.
    pub fn list_sdks(&self, filter: Option<&str>) -> Result<Vec<SdkInfo>> {
        let current = self
            .state
            .get_current_sdks()
            .context("failed to get current SDKs")?;
        let supported = self
            .config
            .get_supported_sdks()
            .context("failed to get supported SDKs")?;

        let mut result = Vec::new();
        for sdk in supported {
            if filter.is_some_and(|filter| !sdk.eq_ignore_ascii_case(filter)) {
                continue;
            }

            let versions = self.sdks.list_versions(&sdk).unwrap_or_else(|err| {
                warn!(sdk = %sdk, error = %err, "failed to list installed versions");
                Vec::new()
            });

            if versions.is_empty() {
                result.push(SdkInfo {
                    name: sdk,
                    version: None,
                    is_active: false,
                    path: None,
                    installed: false,
                });
                continue;
            }

            for version in versions {
                result.push(SdkInfo {
                    is_active: current.get(&sdk) == Some(&version),
                    path: self.sdks.get_sdk_path(&sdk, &version).ok(),
                    installed: self.sdks.is_installed(&sdk, &version),
                    name: sdk.clone(),
                    version: Some(version),
                });
            }
        }

        Ok(result)
    }

    pub fn get_active_state(&self) -> Result<ActiveState> {
        self.state.load_state()
    }

    /// State plus the config's base declarations. Config paths go after state
    /// paths (exact-match de-duplicated) and config env values win.
    pub fn merge_config_and_state(config: &ShellEnvConfig, state: &ActiveState) -> ActiveState {
        let mut merged = state.clone();
        for path in &config.add_paths {
            merged.push_path(path);
        }
        for (name, value) in &config.add_envs {
            merged.add_envs.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Full integration script for `shell`.
    pub fn generate_shell_script(&self, shell: ShellType) -> Result<String> {
        let config = self.config.load_config().context("failed to load config")?;
        let state = self.state.load_state().context("failed to load state")?;
        let merged = Self::merge_config_and_state(&config, &state);
        Ok(self.shell.generate_script(shell, &merged, &config))
    }

    pub fn generate_delta_script(&self, shell: ShellType, delta: &EnvDelta) -> String {
        self.shell.generate_delta(shell, delta)
    }

    pub fn activation_hint(&self, shell: ShellType) -> String {
        self.shell.activation_hint(shell)
    }

    pub fn stats(&self) -> Result<EnvStats> {
        let supported = self.config.get_supported_sdks()?;
        let installed_versions: usize = supported
            .iter()
            .map(|sdk| self.sdks.list_versions(sdk).map(|versions| versions.len()).unwrap_or(0))
            .sum();
        let state = self.state.get_state_stats()?;

        Ok(EnvStats {
            configured_sdks: supported.len(),
            installed_versions,
            active_sdks: state.active_sdk_count,
            state,
        })
    }

    /// Active SDKs keyed by name, for status output.
    pub fn active_sdks(&self) -> Result<BTreeMap<String, String>> {
        self.state.get_current_sdks()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdkConfig;
    use crate::testutil::{file_url, sdk_archive};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        manager: EnvManager,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let manager = EnvManager::new(&Paths::new(temp.path().join("base")), "ktenv")
                .unwrap()
                .with_project_dir(temp.path().join("project"));
            fs::create_dir_all(temp.path().join("project")).unwrap();
            Self { temp, manager }
        }

        fn mirror(&self) -> PathBuf {
            self.temp.path().join("mirror")
        }

        fn sdk_root(&self) -> PathBuf {
            self.temp.path().join("sdk")
        }

        /// Configure `name` installing to `{sdk_root}/{name}{version}` from the local mirror.
        fn configure(&self, name: &str, active_env: &[(&str, &str)]) {
            let mut sdk = SdkConfig::new(
                name,
                format!("{}/{name}{{version}}", self.sdk_root().display()),
            )
            .with_install_url(format!("{}/{name}-{{version}}.tar.gz", file_url(&self.mirror())));
            for (key, value) in active_env {
                sdk.active_env.insert(key.to_string(), value.to_string());
            }
            self.manager.config().add_sdk_config(sdk).unwrap();
        }

        fn publish(&self, name: &str, version: &str) {
            sdk_archive(&self.mirror(), &format!("{name}-{version}"), name);
        }

        fn add(&self, name: &str, version: &str) -> PathBuf {
            self.publish(name, version);
            self.manager
                .add_sdk(name, version, &CancelToken::new())
                .unwrap()
        }
    }

    #[test]
    fn test_use_requires_install() {
        let fx = Fixture::new();
        fx.configure("go", &[]);

        let err = fx.manager.use_sdk("go", "1.21.5", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);
        assert!(err
            .to_string()
            .starts_with("failed to use go:1.21.5: SDK go:1.21.5 is not installed"));

        fx.add("go", "1.21.5");
        fx.manager.use_sdk("go", "1.21.5", false).unwrap();
        assert_eq!(
            fx.manager.state().get_current_sdks().unwrap()["go"],
            "1.21.5"
        );
    }

    #[test]
    fn test_add_then_use_node() {
        let fx = Fixture::new();
        fx.configure("node", &[("NODE_HOME", "{sdk_path}")]);

        let install = fx.add("node", "18.0.0");
        assert_eq!(install, fx.sdk_root().join("node18.0.0"));
        assert!(install.is_dir());

        let delta = fx.manager.use_sdk("node", "18.0.0", false).unwrap();
        let bin = install.join("bin").to_string_lossy().into_owned();
        assert_eq!(delta.add_paths, vec![bin.clone()]);
        assert_eq!(delta.set_envs["NODE_HOME"], install.to_string_lossy());

        let state = fx.manager.get_active_state().unwrap();
        assert_eq!(
            state.current_sdks,
            BTreeMap::from([("node".to_string(), "18.0.0".to_string())])
        );
        assert!(state.add_paths.contains(&bin));
    }

    #[test]
    fn test_add_unknown_or_installed_sdk_fails() {
        let fx = Fixture::new();
        let err = fx
            .manager
            .add_sdk("zig", "0.11.0", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        fx.configure("go", &[]);
        fx.add("go", "1.21.5");
        let err = fx
            .manager
            .add_sdk("go", "1.21.5", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInstalled);
        assert!(err.to_string().starts_with("failed to add go:1.21.5"));
    }

    #[test]
    fn test_add_rolls_back_invalid_install() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        // The archive ships `node`, so the go executable check fails.
        sdk_archive(&fx.mirror(), "go-1.0", "node");

        let err = fx
            .manager
            .add_sdk("go", "1.0", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!fx.manager.sdks().is_installed("go", "1.0"));
    }

    #[test]
    fn test_switching_versions_retires_old_entries() {
        let fx = Fixture::new();
        fx.configure("go", &[("GOROOT", "{sdk_path}")]);
        let old = fx.add("go", "1.21.5");
        let new = fx.add("go", "1.22.0");

        fx.manager.use_sdk("go", "1.21.5", false).unwrap();
        let delta = fx.manager.use_sdk("go", "1.22.0", false).unwrap();
        let old_bin = old.join("bin").to_string_lossy().into_owned();
        let new_bin = new.join("bin").to_string_lossy().into_owned();
        assert_eq!(delta.remove_paths, vec![old_bin.clone()]);
        assert_eq!(delta.add_paths, vec![new_bin.clone()]);
        assert!(delta.unset_envs.is_empty());

        let state = fx.manager.get_active_state().unwrap();
        assert_eq!(state.current_sdks["go"], "1.22.0");
        assert!(!state.add_paths.contains(&old_bin));
        assert_eq!(state.add_paths.iter().filter(|p| **p == new_bin).count(), 1);
        assert_eq!(state.add_envs["GOROOT"], new.to_string_lossy());
    }

    #[test]
    fn test_use_same_version_twice_keeps_single_path() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.add("go", "1.21.5");

        fx.manager.use_sdk("go", "1.21.5", false).unwrap();
        let delta = fx.manager.use_sdk("go", "1.21.5", false).unwrap();
        assert!(delta.remove_paths.is_empty());
        assert_eq!(fx.manager.get_active_state().unwrap().add_paths.len(), 1);
    }

    #[test]
    fn test_unuse() {
        let fx = Fixture::new();
        fx.configure("go", &[("GOROOT", "{sdk_path}")]);
        let install = fx.add("go", "1.21.5");

        let err = fx.manager.unuse_sdk("go").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotActive);

        fx.manager.use_sdk("go", "1.21.5", false).unwrap();
        let delta = fx.manager.unuse_sdk("go").unwrap();
        assert_eq!(
            delta.remove_paths,
            vec![install.join("bin").to_string_lossy().into_owned()]
        );
        assert_eq!(delta.unset_envs, vec!["GOROOT".to_string()]);

        let state = fx.manager.get_active_state().unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_unuse_after_config_entry_removed() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.add("go", "1.0");
        fx.manager.use_sdk("go", "1.0", false).unwrap();

        fx.manager.config().remove_sdk_config("go").unwrap();
        let delta = fx.manager.unuse_sdk("go").unwrap();
        assert!(delta.is_empty());
        assert!(fx.manager.active_sdks().unwrap().is_empty());

        let err = fx.manager.unuse_sdk("go").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotActive);
    }

    #[test]
    fn test_remove_refuses_active_version() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.add("go", "1.21.5");
        fx.manager.use_sdk("go", "1.21.5", false).unwrap();

        let err = fx.manager.remove_sdk("go", "1.21.5").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        fx.manager.unuse_sdk("go").unwrap();
        fx.manager.remove_sdk("go", "1.21.5").unwrap();
        assert!(!fx.manager.sdks().is_installed("go", "1.21.5"));
    }

    #[test]
    fn test_list_sdks() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.configure("node", &[]);
        fx.add("go", "1.21.5");
        fx.add("go", "1.22.0");
        fx.manager.use_sdk("go", "1.22.0", false).unwrap();

        let list = fx.manager.list_sdks(None).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].version.as_deref(), Some("1.21.5"));
        assert!(!list[0].is_active);
        assert!(list[1].is_active);
        assert!(list[1].installed);
        assert_eq!(list[2].name, "node");
        assert!(!list[2].installed);
        assert!(list[2].version.is_none());

        let only_node = fx.manager.list_sdks(Some("NODE")).unwrap();
        assert_eq!(only_node.len(), 1);
    }

    #[test]
    fn test_merge_config_and_state() {
        let config = ShellEnvConfig {
            add_paths: vec!["/opt/tool/bin".to_string()],
            add_envs: BTreeMap::from([("EDITOR".to_string(), "vim".to_string())]),
            ..Default::default()
        };
        let mut state = ActiveState::default();
        state.push_path("/opt/tool/bin");
        state.push_path("/sdk/go1.21/bin");
        state.add_envs.insert("EDITOR".to_string(), "nano".to_string());

        let merged = EnvManager::merge_config_and_state(&config, &state);
        assert_eq!(merged.add_paths, vec!["/opt/tool/bin", "/sdk/go1.21/bin"]);
        assert_eq!(merged.add_envs["EDITOR"], "vim");
    }

    #[test]
    fn test_generate_shell_script_includes_config_and_state() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        let install = fx.add("go", "1.21.5");
        fx.manager.use_sdk("go", "1.21.5", false).unwrap();

        let mut config = fx.manager.config().load_config().unwrap();
        config.add_paths.push("/opt/tool/bin".to_string());
        fx.manager.config().save_config(&config).unwrap();

        let script = fx.manager.generate_shell_script(ShellType::Bash).unwrap();
        let bin = install.join("bin").to_string_lossy().into_owned();
        assert!(script.contains(&format!("*\":{bin}:\"*")));
        assert!(script.contains("*\":/opt/tool/bin:\"*"));
        assert!(script.contains("ktenv() {"));
    }

    #[test]
    fn test_use_save_and_use_project() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.configure("node", &[]);
        fx.add("go", "1.21.5");
        fx.add("node", "18.0.0");

        fx.manager.use_sdk("go", "1.21.5", true).unwrap();
        fx.manager.use_sdk("node", "18.0.0", true).unwrap();
        let project_dir = fx.temp.path().join("project");
        assert!(project_dir.join(crate::project::PROJECT_FILE).is_file());

        fx.manager.unuse_sdk("go").unwrap();
        fx.manager.unuse_sdk("node").unwrap();

        let delta = fx.manager.use_project(&project_dir).unwrap();
        assert_eq!(delta.add_paths.len(), 2);
        assert_eq!(fx.manager.active_sdks().unwrap().len(), 2);
    }

    #[test]
    fn test_stats() {
        let fx = Fixture::new();
        fx.configure("go", &[]);
        fx.configure("node", &[]);
        fx.add("go", "1.21.5");
        fx.manager.use_sdk("go", "1.21.5", false).unwrap();

        let stats = fx.manager.stats().unwrap();
        assert_eq!(stats.configured_sdks, 2);
        assert_eq!(stats.installed_versions, 1);
        assert_eq!(stats.active_sdks, 1);
        assert!(stats.state.file_size > 0);
    }
}
