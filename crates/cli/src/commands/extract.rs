use std::path::Path;

use anyhow::Context;
use paperflow_infra::{HttpExtractionClient, WorkerConfig};

pub fn run(config: &WorkerConfig, file: &Path, endpoint: Option<String>) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let endpoint = endpoint.unwrap_or_else(|| config.ocr_service_url.clone());
    let client = HttpExtractionClient::new(endpoint, config.fetch_timeout, config.extract_timeout)?;
    let response = client.extract_bytes(&filename, bytes)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
