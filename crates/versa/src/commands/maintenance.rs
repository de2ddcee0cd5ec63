//! Retention and snapshot housekeeping.

use anyhow::Context;
use std::path::Path;
use versa_core::VersaConfig;

pub async fn cleanup(config: &VersaConfig, memory: bool, days: u32) -> anyhow::Result<()> {
    let services = super::services(config, memory);
    let removed = services.policy.cleanup_old_content_versions(days).await?;
    println!("Removed {removed} version(s) older than {days} day(s)");
    Ok(())
}

pub async fn autosave(
    config: &VersaConfig,
    memory: bool,
    content_id: i64,
    user_id: i64,
    file: &Path,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let services = super::services(config, memory);
    match services
        .policy
        .check_and_create_version(content_id, &content, user_id)
        .await?
    {
        Some(version_id) => println!("Created version {version_id}"),
        None => println!("No new version needed"),
    }
    Ok(())
}

pub async fn usage(config: &VersaConfig, memory: bool, content_id: i64) -> anyhow::Result<()> {
    let services = super::services(config, memory);
    let usage = services.history.storage_usage(content_id).await?;

    println!(
        "Content {}: {} version(s), {} byte(s)",
        usage.content_id, usage.total_versions, usage.total_bytes
    );
    for (version_id, size) in &usage.largest_versions {
        let summary = services.history.summarize(*version_id).await?;
        println!("  {version_id:>6}  {size:>10}  {summary}");
    }
    Ok(())
}
