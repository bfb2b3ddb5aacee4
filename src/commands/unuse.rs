use crate::manager::EnvManager;
use crate::shell::{EnvDelta, ShellType};
use crate::ui;
use anyhow::Result;

pub fn execute(manager: &EnvManager, sdks: &[String], shell: ShellType) -> Result<()> {
    let mut delta = EnvDelta::default();
    for sdk in sdks {
        delta.merge(manager.unuse_sdk(sdk)?);
        ui::success("Deactivated", sdk);
    }

    print!("{}", manager.generate_delta_script(shell, &delta));
    Ok(())
}
