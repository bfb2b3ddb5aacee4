use crate::manager::EnvManager;
use crate::shell::{EnvDelta, ShellType};
use crate::{ui, VersionSpec};
use anyhow::Result;
use std::env;

pub fn execute(manager: &EnvManager, specs: &[String], save: bool, shell: ShellType) -> Result<()> {
    let delta = if specs.is_empty() {
        let cwd = env::current_dir()?;
        manager.use_project(&cwd)?
    } else {
        // Reject malformed arguments before touching any state.
        let specs = VersionSpec::parse_many(specs)?;

        let mut delta = EnvDelta::default();
        for spec in &specs {
            delta.merge(manager.use_sdk(spec.sdk(), spec.version(), save)?);
            ui::success("Using", spec);
        }
        delta
    };

    if delta.is_empty() {
        ui::info("Nothing to activate");
        return Ok(());
    }
    print!("{}", manager.generate_delta_script(shell, &delta));
    Ok(())
}
