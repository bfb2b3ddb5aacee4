use crate::manager::{EnvManager, SdkInfo};
use crate::ui;
use anyhow::Result;

pub fn execute(manager: &EnvManager, sdk: Option<&str>, json: bool) -> Result<()> {
    let sdks = manager.list_sdks(sdk)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sdks)?);
        return Ok(());
    }

    if sdks.is_empty() {
        match sdk {
            Some(name) => ui::info(format!("No SDK named '{name}' is configured")),
            None => ui::info(format!(
                "No SDKs configured, add them to {}",
                manager.config().config_file().display()
            )),
        }
        return Ok(());
    }

    print!("{}", render_table(&sdks));
    Ok(())
}

fn render_table(sdks: &[SdkInfo]) -> String {
    let name_width = sdks.iter().map(|info| info.name.len()).max().unwrap_or(0).max(3);
    let version_width = sdks
        .iter()
        .map(|info| info.version.as_deref().map_or(1, str::len))
        .max()
        .unwrap_or(0)
        .max(7);

    let mut out = format!("  {:<name_width$}  {:<version_width$}  PATH\n", "SDK", "VERSION");
    for info in sdks {
        let marker = if info.is_active { '*' } else { ' ' };
        let version = info.version.as_deref().unwrap_or("-");
        let location = match (&info.path, info.installed) {
            (Some(path), true) => path.display().to_string(),
            _ => "(not installed)".to_string(),
        };
        out.push_str(&format!(
            "{marker} {:<name_width$}  {:<version_width$}  {location}\n",
            info.name, version
        ));
    }
    out
}
