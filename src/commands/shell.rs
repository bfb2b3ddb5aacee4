use crate::manager::EnvManager;
use crate::shell::ShellType;
use anyhow::Result;

pub fn execute(manager: &EnvManager, shell: ShellType, hint: bool) -> Result<()> {
    if hint {
        println!("{}", manager.activation_hint(shell));
    } else {
        print!("{}", manager.generate_shell_script(shell)?);
    }
    Ok(())
}
