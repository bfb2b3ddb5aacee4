use crate::manager::EnvManager;
use crate::ui::{self, Progress};
use crate::{CancelToken, ErrorKind, VersionSpec};
use anyhow::Result;

pub fn execute(manager: &EnvManager, specs: &[String], cancel: &CancelToken) -> Result<()> {
    let specs = VersionSpec::parse_many(specs)?;

    for spec in &specs {
        let progress = Progress::new("Installing", spec.to_string());
        match manager.add_sdk(spec.sdk(), spec.version(), cancel) {
            Ok(path) => progress.success("Installed", format!("to {}", path.display())),
            Err(err) if err.is(ErrorKind::Cancelled) => {
                progress.cancel("interrupted");
                return Err(err.into());
            }
            Err(err) => {
                progress.fail("Failed", err.kind());
                return Err(err.into());
            }
        }
    }

    if let [spec] = specs.as_slice() {
        ui::info(format!("Run 'ktenv use {spec}' to activate it"));
    }
    Ok(())
}
