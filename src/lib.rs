// Public API
pub mod cli;
pub mod commands;
pub mod config;
pub mod manager;
pub mod paths;
pub mod project;
pub mod sdk;
pub mod shell;
pub mod state;

// Core domain types
mod cancel;
mod error;
mod receipt;
mod ui;
mod version;

#[cfg(test)]
mod testutil;

// Re-export main types
pub use cancel::CancelToken;
pub use config::{ConfigManager, SdkConfig, ShellEnvConfig};
pub use error::{EnvError, ErrorKind, Result, ResultExt};
pub use manager::{EnvManager, EnvStats, SdkInfo};
pub use paths::{KtenvPath, Paths};
pub use project::ProjectFile;
pub use receipt::InstallReceipt;
pub use sdk::SdkManager;
pub use shell::{EnvDelta, ShellScriptGenerator, ShellType};
pub use state::{ActiveState, StateManager, StateStats};
pub use version::VersionSpec;
