//! Shell script generation.
//!
//! A child process cannot change its parent's environment, so every mutation is
//! printed as shell source for the calling shell to evaluate. The full script
//! (`ktenv shell <type>`) sets up the `ktenv` wrapper function plus the whole
//! environment; `use`/`unuse` only print the [`EnvDelta`] they caused.

mod templates;

pub use templates::{escape_cmd, escape_posix, escape_powershell};

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::ShellEnvConfig;
use crate::error::{EnvError, Result};
use crate::state::ActiveState;

/// Supported shell dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
}

impl ShellType {
    pub const ALL: [ShellType; 5] = [
        ShellType::Bash,
        ShellType::Zsh,
        ShellType::Fish,
        ShellType::PowerShell,
        ShellType::Cmd,
    ];

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bash" | "sh" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            "pwsh" | "powershell" => Ok(ShellType::PowerShell),
            "cmd" | "bat" => Ok(ShellType::Cmd),
            _ => Err(EnvError::UnsupportedShell(name.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
            ShellType::PowerShell => "pwsh",
            ShellType::Cmd => "cmd",
        }
    }

    fn is_posix(self) -> bool {
        matches!(self, ShellType::Bash | ShellType::Zsh)
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellType {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Guess the calling shell from `SHELL`, then `PSModulePath`, then `ComSpec`.
/// Falls back to bash.
pub fn detect_shell_type() -> ShellType {
    let var = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());
    detect_from(
        var("SHELL").as_deref(),
        var("PSModulePath").as_deref(),
        var("ComSpec").as_deref(),
    )
}

fn detect_from(shell: Option<&str>, ps_module_path: Option<&str>, comspec: Option<&str>) -> ShellType {
    if let Some(shell) = shell {
        let name = Path::new(shell)
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains("zsh") {
            return ShellType::Zsh;
        }
        if name.contains("fish") {
            return ShellType::Fish;
        }
        if name.contains("bash") {
            return ShellType::Bash;
        }
        if name.contains("pwsh") || name.contains("powershell") {
            return ShellType::PowerShell;
        }
    }

    if ps_module_path.is_some() {
        return ShellType::PowerShell;
    }

    if comspec.is_some_and(|comspec| comspec.to_lowercase().contains("cmd")) {
        return ShellType::Cmd;
    }

    ShellType::Bash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOperation {
    /// Prepend, skipping entries already on PATH
    Add,
    Remove,
}

/// The environment change caused by one `use`/`unuse`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDelta {
    pub add_paths: Vec<String>,
    pub remove_paths: Vec<String>,
    pub set_envs: BTreeMap<String, String>,
    pub unset_envs: Vec<String>,
}

impl EnvDelta {
    pub fn is_empty(&self) -> bool {
        self.add_paths.is_empty()
            && self.remove_paths.is_empty()
            && self.set_envs.is_empty()
            && self.unset_envs.is_empty()
    }

    /// Fold a later delta into this one; where the two disagree `other` wins.
    pub fn merge(&mut self, other: EnvDelta) {
        for path in other.remove_paths {
            self.add_paths.retain(|existing| existing != &path);
            if !self.remove_paths.contains(&path) {
                self.remove_paths.push(path);
            }
        }
        for name in other.unset_envs {
            self.set_envs.remove(&name);
            if !self.unset_envs.contains(&name) {
                self.unset_envs.push(name);
            }
        }
        for (name, value) in other.set_envs {
            self.unset_envs.retain(|existing| existing != &name);
            self.set_envs.insert(name, value);
        }
        for path in other.add_paths {
            self.remove_paths.retain(|existing| existing != &path);
            if !self.add_paths.contains(&path) {
                self.add_paths.push(path);
            }
        }
    }
}

/// Renders environment changes as source for one shell dialect.
#[derive(Debug, Clone)]
pub struct ShellScriptGenerator {
    program: String,
    custom_dir: PathBuf,
}

impl ShellScriptGenerator {
    /// `program` is what the wrapper function invokes; `custom_dir` holds user
    /// scripts sourced at the end of the full script.
    pub fn new(program: impl Into<String>, custom_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            custom_dir: custom_dir.into(),
        }
    }

    /// Full integration script: header, wrapper function, env vars, unsets for
    /// `config.remove_envs`, PATH, then custom scripts.
    ///
    /// `state` should already be merged with `config` (see
    /// `EnvManager::merge_config_and_state`); only `remove_envs` is read from `config`.
    pub fn generate_script(&self, shell: ShellType, state: &ActiveState, config: &ShellEnvConfig) -> String {
        let mut script = templates::header(shell);
        script.push('\n');
        script.push_str(&templates::dispatcher(shell, &self.program));

        for block in [
            self.generate_env_vars(shell, &state.add_envs),
            self.generate_env_unset(shell, &config.remove_envs),
            self.generate_path_update(shell, &state.add_paths, PathOperation::Add),
            templates::custom_scripts(shell, &self.custom_dir),
        ] {
            if !block.is_empty() {
                script.push('\n');
                script.push_str(&block);
            }
        }

        if shell == ShellType::Cmd {
            script.push('\n');
            script.push_str(&templates::cmd_dispatch_routine(&self.program));
        }
        script
    }

    /// Only the wrapper function.
    pub fn generate_dispatcher(&self, shell: ShellType) -> String {
        let mut script = templates::dispatcher(shell, &self.program);
        if shell == ShellType::Cmd {
            script.push_str(&templates::cmd_dispatch_routine(&self.program));
        }
        script
    }

    pub fn generate_env_vars(&self, shell: ShellType, envs: &BTreeMap<String, String>) -> String {
        if envs.is_empty() {
            return String::new();
        }

        let mut script = comment(shell, "Environment variables");
        for (name, value) in envs {
            let line = match shell {
                ShellType::Bash | ShellType::Zsh => {
                    format!("export {name}=\"{}\"\n", escape_posix(value))
                }
                ShellType::Fish => format!("set -gx {name} {}\n", templates::quote_fish(value)),
                ShellType::PowerShell => {
                    format!("$env:{name} = \"{}\"\n", escape_powershell(value))
                }
                ShellType::Cmd => format!("set {name}={}\n", escape_cmd(value)),
            };
            script.push_str(&line);
        }
        script
    }

    pub fn generate_env_unset(&self, shell: ShellType, names: &[String]) -> String {
        if names.is_empty() {
            return String::new();
        }

        let mut script = comment(shell, "Removed environment variables");
        for name in names {
            let line = match shell {
                ShellType::Bash | ShellType::Zsh => format!("unset {name}\n"),
                ShellType::Fish => format!("set -e {name}\n"),
                ShellType::PowerShell => {
                    format!("Remove-Item Env:{name} -ErrorAction SilentlyContinue\n")
                }
                ShellType::Cmd => format!("set {name}=\n"),
            };
            script.push_str(&line);
        }
        script
    }

    /// PATH edits that are safe to evaluate repeatedly.
    ///
    /// For [`PathOperation::Add`] the entries end up at the front of PATH in
    /// the order given.
    pub fn generate_path_update(&self, shell: ShellType, paths: &[String], operation: PathOperation) -> String {
        if paths.is_empty() {
            return String::new();
        }

        let mut script = comment(shell, "PATH updates");
        match operation {
            PathOperation::Add => {
                for path in paths.iter().rev() {
                    script.push_str(&prepend_path(shell, path));
                }
            }
            PathOperation::Remove => {
                for path in paths {
                    script.push_str(&remove_path(shell, path));
                }
            }
        }
        script
    }

    /// Script for a single `use`/`unuse`: removals first, then additions.
    pub fn generate_delta(&self, shell: ShellType, delta: &EnvDelta) -> String {
        let script = [
            self.generate_path_update(shell, &delta.remove_paths, PathOperation::Remove),
            self.generate_env_unset(shell, &delta.unset_envs),
            self.generate_env_vars(shell, &delta.set_envs),
            self.generate_path_update(shell, &delta.add_paths, PathOperation::Add),
        ]
        .concat();

        // The cmd wrapper runs the delta as a batch file.
        if shell == ShellType::Cmd && !script.is_empty() {
            return format!("@echo off\n{script}");
        }
        script
    }

    pub fn activation_hint(&self, shell: ShellType) -> String {
        templates::activation_hint(shell)
    }
}

fn comment(shell: ShellType, text: &str) -> String {
    match shell {
        ShellType::Cmd => format!("@REM {text}\n"),
        _ => format!("# {text}\n"),
    }
}

fn prepend_path(shell: ShellType, path: &str) -> String {
    match shell {
        _ if shell.is_posix() => {
            let path = escape_posix(path);
            format!(
                "case \":${{PATH}}:\" in *\":{path}:\"*) ;; *) export PATH=\"{path}${{PATH:+:$PATH}}\" ;; esac\n"
            )
        }
        ShellType::Fish => {
            let path = templates::quote_fish(path);
            format!("contains -- {path} $PATH; or set -gx PATH {path} $PATH\n")
        }
        ShellType::PowerShell => {
            let path = escape_powershell(path);
            format!(
                "if (-not (($env:PATH -split [IO.Path]::PathSeparator) -contains \"{path}\")) {{ $env:PATH = \"{path}\" + [IO.Path]::PathSeparator + $env:PATH }}\n"
            )
        }
        _ => {
            let path = escape_cmd(path);
            format!("echo ;%PATH%; | find /i \";{path};\" >nul || set PATH={path};%PATH%\n")
        }
    }
}

fn remove_path(shell: ShellType, path: &str) -> String {
    match shell {
        _ if shell.is_posix() => {
            let path = escape_posix(path);
            format!(
                "PATH=\":${{PATH}}:\"; PATH=${{PATH//\":{path}:\"/:}}; PATH=${{PATH#:}}; PATH=${{PATH%:}}; export PATH\n"
            )
        }
        ShellType::Fish => {
            let path = templates::quote_fish(path);
            format!("if set -l __ktenv_idx (contains -i -- {path} $PATH); set -e PATH[$__ktenv_idx]; end\n")
        }
        ShellType::PowerShell => {
            let path = escape_powershell(path);
            format!(
                "$env:PATH = (($env:PATH -split [IO.Path]::PathSeparator) | Where-Object {{ $_ -ne \"{path}\" }}) -join [IO.Path]::PathSeparator\n"
            )
        }
        _ => {
            let path = escape_cmd(path);
            format!("set PATH=;%PATH%;\nset PATH=%PATH:;{path};=;%\nset PATH=%PATH:~1,-1%\n")
        }
    }
}
