//! Configuration commands.

use anyhow::Context;

use super::ConfigFormat;
use crate::cli::icons::dim_arrow;
use crate::config::Config;

/// Print the effective configuration with secrets masked.
pub fn cmd_config_show(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    eprintln!("{} Source: {}", dim_arrow(), source);

    let shown = config.redacted();
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(&shown).context("Failed to render TOML")?,
        ConfigFormat::Json => {
            serde_json::to_string_pretty(&shown).context("Failed to render JSON")?
        }
    };
    println!("{}", rendered);
    Ok(())
}
