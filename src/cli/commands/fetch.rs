//! Fetch and block-classification commands.

use std::path::Path;

use console::style;
use serde_json::json;

use crate::cli::helpers::{read_input, to_pretty_json};
use crate::cli::icons::{dim_arrow, error, success, warn};
use crate::config::Config;
use crate::scrapers::{BlockDetector, FetchController};

/// Fetch a URL and print its text.
pub async fn cmd_fetch(config: &Config, url: &str, trace: bool) -> anyhow::Result<()> {
    let controller = FetchController::from_config(config)?;
    let tiers: Vec<&str> = controller.tiers().iter().map(|t| t.as_str()).collect();
    eprintln!("{} Tiers: {}", dim_arrow(), tiers.join(" → "));

    let result = controller.fetch_traced(url).await;

    if trace {
        let report = json!({
            "url": url,
            "attempts": result.attempts,
            "strategy": result.result.as_ref().ok().map(|p| p.strategy),
            "error": result.result.as_ref().err().map(|e| json!({
                "kind": e.kind,
                "status": e.status,
                "message": e.to_string(),
            })),
        });
        eprintln!("{}", to_pretty_json(&report)?);
    }

    match result.result {
        Ok(page) => {
            eprintln!(
                "{} Fetched {} bytes via {}",
                success(),
                page.text.len(),
                style(page.strategy).cyan()
            );
            println!("{}", page.text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", error(), e);
            Err(e.into())
        }
    }
}

/// Print the block verdict for some text.
pub async fn cmd_classify(config: &Config, file: Option<&Path>) -> anyhow::Result<()> {
    let text = read_input(file).await?;
    let detector = BlockDetector::new(config.block.clone());
    let verdict = detector.classify(&text);

    if verdict.is_blocked {
        eprintln!("{} Blocked ({:?})", warn(), verdict.reason);
    } else {
        eprintln!("{} Content", success());
    }
    println!("{}", to_pretty_json(&verdict)?);
    Ok(())
}
