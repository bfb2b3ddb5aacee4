use crate::cli::StateAction;
use crate::manager::EnvManager;
use crate::ui;
use anyhow::Result;

pub fn execute(manager: &EnvManager, action: StateAction) -> Result<()> {
    let state = manager.state();

    match action {
        StateAction::Backup => {
            let backup = state.backup_state()?;
            ui::success("Saved", backup.display());
        }
        StateAction::Restore { file } => {
            state.restore_state(&file)?;
            ui::success("Restored", file.display());
            ui::info("Open a new shell or run 'ktenv use' to apply the restored state");
        }
        StateAction::List => {
            let backups = state.list_backups()?;
            if backups.is_empty() {
                ui::info("No state backups");
            }
            for backup in backups {
                println!("{}", backup.display());
            }
        }
        StateAction::Clear => {
            state.clear_state()?;
            ui::success("Cleared", state.state_file().display());
        }
    }

    Ok(())
}
