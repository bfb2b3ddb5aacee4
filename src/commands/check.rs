use crate::manager::EnvManager;
use crate::ui;
use anyhow::Result;

pub fn execute(manager: &EnvManager) -> Result<()> {
    let config_file = manager.config().config_file().display().to_string();
    let mut issues = Vec::new();
    let mut validated = 0usize;

    // A broken config makes every other check meaningless.
    let config = match manager.config().load_config() {
        Ok(config) => config,
        Err(err) => {
            ui::error(&err);
            anyhow::bail!("Configuration check failed ({config_file}).");
        }
    };

    let active = manager.active_sdks()?;
    for (sdk, version) in &active {
        if config.sdk(sdk).is_none() {
            issues.push(format!("{sdk}:{version} is active but no longer configured"));
        }
    }

    for sdk in &config.sdks {
        let versions = match manager.sdks().list_versions(&sdk.name) {
            Ok(versions) => versions,
            Err(err) => {
                issues.push(err.to_string());
                continue;
            }
        };

        for version in versions {
            match manager.sdks().validate_sdk(&sdk.name, &version) {
                Ok(()) => validated += 1,
                Err(err) => issues.push(err.to_string()),
            }
        }

        if let Some(version) = active.get(&sdk.name) {
            if !manager.sdks().is_installed(&sdk.name, version) {
                issues.push(format!("{}:{version} is active but not installed", sdk.name));
            }
        }
    }

    if issues.is_empty() {
        ui::success(
            "Check",
            format!(
                "{} SDK(s) configured, {validated} install(s) validated without issues.",
                config.sdks.len()
            ),
        );
        Ok(())
    } else {
        for issue in &issues {
            ui::error(issue);
        }
        anyhow::bail!("Check failed ({} issue(s)).", issues.len());
    }
}
