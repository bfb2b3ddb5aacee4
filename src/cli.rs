use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ktenv - Local SDK and shell environment manager
///
/// ktenv installs SDK versions (Go, Node, Java, Flutter, ...) into a local
/// directory and switches the active version in your shell. Load the shell
/// integration once (`ktenv shell --hint`) and `ktenv use go:1.21.5` updates
/// PATH and SDK variables in place.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base directory for config, state and SDKs (default: ~/.ktenv)
    #[arg(long, global = true, value_name = "DIR", env = "KTENV_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate installed SDK versions in the current shell
    ///
    /// Prints a script that the shell integration evaluates. Without
    /// arguments, activates the versions pinned in the nearest .ktenv.toml.
    Use {
        /// SDK versions to activate (sdk:version or sdk@version)
        #[arg(value_name = "SDK:VERSION")]
        specs: Vec<String>,

        /// Pin the versions in .ktenv.toml in the current directory
        #[arg(long)]
        save: bool,

        /// Shell to generate the script for (auto-detected if not specified)
        #[arg(long, value_name = "SHELL", overrides_with = "shell")]
        shell: Option<String>,
    },

    /// Deactivate SDKs in the current shell
    Unuse {
        /// SDK names to deactivate
        #[arg(value_name = "SDK", required = true)]
        sdks: Vec<String>,

        /// Shell to generate the script for (auto-detected if not specified)
        #[arg(long, value_name = "SHELL", overrides_with = "shell")]
        shell: Option<String>,
    },

    /// Download and install SDK versions
    Add {
        /// SDK versions to install (sdk:version or sdk@version)
        #[arg(value_name = "SDK:VERSION", required = true)]
        specs: Vec<String>,
    },

    /// Uninstall an SDK version
    #[command(alias = "rm")]
    Remove {
        /// SDK version to remove (sdk:version or sdk@version)
        #[arg(value_name = "SDK:VERSION")]
        spec: String,
    },

    /// List configured SDKs and installed versions
    #[command(alias = "ls")]
    List {
        /// Only show this SDK
        #[arg(value_name = "SDK")]
        sdk: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Output the shell integration script
    Shell {
        /// Shell type (bash, zsh, fish, pwsh, cmd; auto-detected if not specified)
        #[arg(value_name = "SHELL")]
        shell: Option<String>,

        /// Print the profile line that loads the integration instead
        #[arg(long)]
        hint: bool,
    },

    /// Show active SDKs and environment summary
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the active state file
    #[command(subcommand)]
    State(StateAction),

    /// Validate the configuration and installed SDKs
    Check,
}

#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Copy the state file to a timestamped backup
    Backup,

    /// Replace the state file with a backup
    Restore {
        /// Backup file to restore
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List state backups, oldest first
    List,

    /// Deactivate everything by resetting the state file
    Clear,
}
