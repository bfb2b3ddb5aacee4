use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{EnvError, Result};

/// What is active right now: SDK versions plus the PATH entries and env vars they contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveState {
    #[serde(default)]
    pub current_sdks: BTreeMap<String, String>,
    /// Ordered, duplicate-free
    #[serde(default)]
    pub add_paths: Vec<String>,
    #[serde(default)]
    pub add_envs: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ActiveState {
    fn default() -> Self {
        Self {
            current_sdks: BTreeMap::new(),
            add_paths: Vec::new(),
            add_envs: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

impl ActiveState {
    pub fn is_empty(&self) -> bool {
        self.current_sdks.is_empty() && self.add_paths.is_empty() && self.add_envs.is_empty()
    }

    /// Append `path` unless already present. Returns whether it was added.
    pub fn push_path(&mut self, path: &str) -> bool {
        if self.add_paths.iter().any(|existing| existing == path) {
            return false;
        }
        self.add_paths.push(path.to_string());
        true
    }

    pub fn remove_path(&mut self, path: &str) -> bool {
        let before = self.add_paths.len();
        self.add_paths.retain(|existing| existing != path);
        self.add_paths.len() != before
    }

    /// Fold `other` into this state: SDKs and envs from `other` win, paths are appended de-duplicated.
    pub fn merge(&mut self, other: &ActiveState) {
        for (sdk, version) in &other.current_sdks {
            self.current_sdks.insert(sdk.clone(), version.clone());
        }
        for path in &other.add_paths {
            self.push_path(path);
        }
        for (name, value) in &other.add_envs {
            self.add_envs.insert(name.clone(), value.clone());
        }
        if other.updated_at > self.updated_at {
            self.updated_at = other.updated_at;
        }
    }
}

/// Summary of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateStats {
    pub active_sdk_count: usize,
    pub path_count: usize,
    pub env_count: usize,
    pub last_updated: DateTime<Utc>,
    pub file_size: u64,
}

/// Persists [`ActiveState`] as JSON.
///
/// Every mutator is a full read-modify-write under a process-local lock. Across
/// processes, writes are check-and-set on `updated_at`: if another process saved
/// since we loaded, the write is abandoned with [`EnvError::StateConflict`].
#[derive(Debug)]
pub struct StateManager {
    state_file: PathBuf,
    lock: RwLock<()>,
}

impl StateManager {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn exists(&self) -> bool {
        self.state_file.is_file()
    }

    pub fn load_state(&self) -> Result<ActiveState> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| EnvError::StateIo("state lock poisoned".to_string()))?;
        self.read_state()
    }

    /// Stamp `updated_at` and write the state atomically.
    pub fn save_state(&self, state: &mut ActiveState) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| EnvError::StateIo("state lock poisoned".to_string()))?;
        state.updated_at = Utc::now();
        self.write_state(state)
    }

    /// Activate (`active = true`) or drop an SDK entry.
    pub fn update_sdk_state(&self, sdk: &str, version: &str, active: bool) -> Result<()> {
        self.update(|state| {
            if active {
                state.current_sdks.insert(sdk.to_string(), version.to_string()) != Some(version.to_string())
            } else {
                state.current_sdks.remove(sdk).is_some()
            }
        })
    }

    pub fn get_current_sdks(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.load_state()?.current_sdks)
    }

    pub fn add_path(&self, path: &str) -> Result<()> {
        self.update(|state| state.push_path(path))
    }

    pub fn remove_path(&self, path: &str) -> Result<()> {
        self.update(|state| state.remove_path(path))
    }

    pub fn set_env(&self, name: &str, value: &str) -> Result<()> {
        self.update(|state| {
            state.add_envs.insert(name.to_string(), value.to_string()) != Some(value.to_string())
        })
    }

    pub fn unset_env(&self, name: &str) -> Result<()> {
        self.update(|state| state.add_envs.remove(name).is_some())
    }

    /// Reset to an empty state.
    pub fn clear_state(&self) -> Result<()> {
        self.update(|state| {
            let changed = !state.is_empty();
            state.current_sdks.clear();
            state.add_paths.clear();
            state.add_envs.clear();
            changed
        })
    }

    /// Run one read-modify-write cycle. `apply` returns whether it changed anything;
    /// unchanged states are not rewritten.
    pub fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ActiveState) -> bool,
    {
        let _guard = self
            .lock
            .write()
            .map_err(|_| EnvError::StateIo("state lock poisoned".to_string()))?;

        let mut state = self.read_state()?;
        let observed = self.exists().then_some(state.updated_at);
        if !apply(&mut state) {
            return Ok(());
        }

        if self.on_disk_updated_at()? != observed {
            return Err(EnvError::StateConflict(self.state_file.clone()));
        }

        state.updated_at = next_timestamp(observed);
        self.write_state(&state)
    }

    pub fn get_state_stats(&self) -> Result<StateStats> {
        let state = self.load_state()?;
        let file_size = fs::metadata(&self.state_file)
            .map(|meta| meta.len())
            .unwrap_or(0);

        Ok(StateStats {
            active_sdk_count: state.current_sdks.len(),
            path_count: state.add_paths.len(),
            env_count: state.add_envs.len(),
            last_updated: state.updated_at,
            file_size,
        })
    }

    /// Copy the state file to `<state>.backup.<timestamp>` and return the backup path.
    pub fn backup_state(&self) -> Result<PathBuf> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| EnvError::StateIo("state lock poisoned".to_string()))?;

        if !self.exists() {
            return Err(EnvError::not_found(
                "state file",
                self.state_file.display().to_string(),
            ));
        }

        let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        let backup = PathBuf::from(format!("{}.backup.{stamp}", self.state_file.display()));
        fs::copy(&self.state_file, &backup).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to write backup file {}: {err}",
                backup.display()
            ))
        })?;

        debug!(backup = %backup.display(), "backed up state");
        Ok(backup)
    }

    /// Backups next to the state file, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        let (Some(dir), Some(file_name)) = (self.state_file.parent(), self.state_file.file_name())
        else {
            return Ok(Vec::new());
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}.backup.", file_name.to_string_lossy());
        let entries = fs::read_dir(dir).map_err(|err| {
            EnvError::StateIo(format!("failed to list {}: {err}", dir.display()))
        })?;

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        backups.sort();
        Ok(backups)
    }

    /// Replace the state file with a validated backup.
    pub fn restore_state(&self, backup_file: &Path) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| EnvError::StateIo("state lock poisoned".to_string()))?;

        if !backup_file.is_file() {
            return Err(EnvError::not_found(
                "backup file",
                backup_file.display().to_string(),
            ));
        }

        let data = fs::read(backup_file).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to read backup file {}: {err}",
                backup_file.display()
            ))
        })?;
        let state: ActiveState = serde_json::from_slice(&data).map_err(|err| {
            EnvError::StateIo(format!(
                "invalid backup file format {}: {err}",
                backup_file.display()
            ))
        })?;

        self.write_state(&state)?;
        debug!(backup = %backup_file.display(), "restored state");
        Ok(())
    }

    fn read_state(&self) -> Result<ActiveState> {
        if !self.exists() {
            return Ok(ActiveState::default());
        }

        let data = fs::read(&self.state_file).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to read state file {}: {err}",
                self.state_file.display()
            ))
        })?;

        serde_json::from_slice(&data).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to parse state file {}: {err}",
                self.state_file.display()
            ))
        })
    }

    fn on_disk_updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_state()?.updated_at))
    }

    fn write_state(&self, state: &ActiveState) -> Result<()> {
        let dir = self
            .state_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to create state directory {}: {err}",
                dir.display()
            ))
        })?;

        let data = serde_json::to_vec_pretty(state)
            .map_err(|err| EnvError::StateIo(format!("failed to serialize state: {err}")))?;

        let io_err = |err: std::io::Error| {
            EnvError::StateIo(format!(
                "failed to write state file {}: {err}",
                self.state_file.display()
            ))
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&data).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.state_file)
            .map_err(|err| io_err(err.error))?;

        debug!(path = %self.state_file.display(), "saved state");
        Ok(())
    }
}

/// A timestamp strictly after `previous`, so check-and-set can tell writes apart.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + chrono::Duration::microseconds(1),
        _ => now,
    }
}
