use std::path::Path;

use anyhow::Context;
use paperflow_core::DocumentBatch;
use paperflow_infra::{UpsertEngine, WorkerConfig};
use serde_json::Value;

use super::open_store;

pub fn run(config: &WorkerConfig, payload: &Path) -> anyhow::Result<()> {
    let batch = load_batch(payload)?;
    let engine = UpsertEngine::new(open_store(config)?);
    let report = engine.persist_batch(&batch)?;
    println!(
        "Persisted {} customer(s), {} offer(s), {} receipt(s)",
        report.customers, report.offers, report.receipts
    );
    Ok(())
}

/// Accepts a batch file or a saved `/extract` response.
pub fn load_batch(path: &Path) -> anyhow::Result<DocumentBatch> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(DocumentBatch::from_extraction_response(value)?)
}
