//! One-shot JSON API requests.

use anyhow::Context;
use std::io::Read;
use versa_core::VersaConfig;

pub async fn run(config: &VersaConfig, memory: bool, json: Option<String>) -> anyhow::Result<()> {
    let raw = match json.as_deref() {
        Some(json) if json != "-" => json.to_string(),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };
    let request: serde_json::Value =
        serde_json::from_str(&raw).context("Request is not valid JSON")?;

    let services = super::services(config, memory);
    let response = services.api.handle_request(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response["status"] != "success" {
        std::process::exit(1);
    }
    Ok(())
}
