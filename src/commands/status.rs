use crate::manager::EnvManager;
use crate::ui;
use anyhow::Result;
use serde_json::json;

pub fn execute(manager: &EnvManager, json: bool) -> Result<()> {
    let active = manager.active_sdks()?;
    let stats = manager.stats()?;

    if json {
        let report = json!({
            "active": active,
            "stats": stats,
            "state_file": manager.state().state_file(),
            "config_file": manager.config().config_file(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if active.is_empty() {
        ui::info("No SDKs active");
    } else {
        for (sdk, version) in &active {
            println!("{sdk}:{version}");
        }
    }

    ui::status(
        "Config",
        format!(
            "{} ({} SDKs, {} installed versions)",
            manager.config().config_file().display(),
            stats.configured_sdks,
            stats.installed_versions
        ),
    );
    ui::status(
        "State",
        format!(
            "{} ({} paths, {} variables, updated {})",
            manager.state().state_file().display(),
            stats.state.path_count,
            stats.state.env_count,
            stats.state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    );
    Ok(())
}
