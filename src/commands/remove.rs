use crate::manager::EnvManager;
use crate::{ui, VersionSpec};
use anyhow::Result;

pub fn execute(manager: &EnvManager, spec: &str) -> Result<()> {
    let spec = VersionSpec::parse(spec)?;
    manager.remove_sdk(spec.sdk(), spec.version())?;
    ui::success("Removed", &spec);
    Ok(())
}
