use crate::cli::{Cli, Commands};
use crate::manager::EnvManager;
use crate::paths::Paths;
use crate::shell::{detect_shell_type, ShellType};
use crate::CancelToken;
use anyhow::Result;
use std::env;
use std::thread;
use tracing::debug;

mod add;
mod check;
mod list;
mod remove;
mod shell;
mod state;
mod status;
mod unuse;
mod use_sdk;

pub fn execute(cli: Cli) -> Result<()> {
    let paths = match cli.base_dir {
        Some(dir) => Paths::new(dir),
        None => Paths::from_env()?,
    };
    debug!(base = %paths.base_dir().display(), "using base directory");

    let manager = EnvManager::new(&paths, program_name())?;

    match cli.command {
        Commands::Use { specs, save, shell } => {
            use_sdk::execute(&manager, &specs, save, resolve_shell(shell)?)
        }

        Commands::Unuse { sdks, shell } => unuse::execute(&manager, &sdks, resolve_shell(shell)?),

        Commands::Add { specs } => add::execute(&manager, &specs, &cancel_on_ctrl_c()),

        Commands::Remove { spec } => remove::execute(&manager, &spec),

        Commands::List { sdk, json } => list::execute(&manager, sdk.as_deref(), json),

        Commands::Shell { shell, hint } => shell::execute(&manager, resolve_shell(shell)?, hint),

        Commands::Status { json } => status::execute(&manager, json),

        Commands::State(action) => state::execute(&manager, action),

        Commands::Check => check::execute(&manager),
    }
}

/// Explicit `--shell`, otherwise whatever the environment looks like.
fn resolve_shell(shell: Option<String>) -> Result<ShellType> {
    match shell {
        Some(name) => Ok(ShellType::from_name(&name)?),
        None => Ok(detect_shell_type()),
    }
}

/// What the generated wrapper function should run: this binary when its path
/// is known, otherwise `ktenv` from PATH.
fn program_name() -> String {
    env::current_exe()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "ktenv".to_string())
}

/// Token that is cancelled on the first Ctrl-C. A second Ctrl-C exits with
/// status 130. The listener runs on its own thread and dies with the process.
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let listener = token.clone();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
    match runtime {
        Ok(runtime) => {
            thread::spawn(move || {
                runtime.block_on(async {
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                    listener.cancel();
                    // A second interrupt gives up on a stalled connect or read.
                    if tokio::signal::ctrl_c().await.is_ok() {
                        std::process::exit(130);
                    }
                });
            });
        }
        Err(err) => debug!(error = %err, "failed to start signal listener"),
    }

    token
}
