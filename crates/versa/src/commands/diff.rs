//! File comparison without touching storage.

use anyhow::Context;
use std::path::Path;
use versa_core::VersaConfig;
use versa_diff::{diff_stats, format_diff, ContentFormat, DiffEngine};

pub async fn run(
    config: &VersaConfig,
    old: &Path,
    new: &Path,
    format: ContentFormat,
    json: bool,
) -> anyhow::Result<()> {
    let old_text = tokio::fs::read_to_string(old)
        .await
        .with_context(|| format!("Failed to read {}", old.display()))?;
    let new_text = tokio::fs::read_to_string(new)
        .await
        .with_context(|| format!("Failed to read {}", new.display()))?;

    let engine = DiffEngine::new(config.diff_config());
    let diff = engine.compare(&old_text, &new_text, format)?;

    if json {
        let output = serde_json::json!({
            "format": format.as_str(),
            "diff": diff,
            "stats": diff_stats(&diff),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_diff(&diff));
    }
    Ok(())
}
