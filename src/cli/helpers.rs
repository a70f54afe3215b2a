//! Shared helper functions for CLI commands.

use std::path::Path;

use anyhow::Context;
use tokio::io::AsyncReadExt;

/// Read a file, or stdin when the path is absent or `-`.
pub async fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Pretty JSON for stdout.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}
