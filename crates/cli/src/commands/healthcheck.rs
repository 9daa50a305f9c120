//! Latency probes for the services the worker depends on.

use std::time::{Duration, Instant};

use anyhow::bail;
use paperflow_infra::store::DocumentStore;
use paperflow_infra::{JobQueue, PostgresDocumentStore, WorkerConfig};
use serde_json::{Map, Value, json};

use super::open_queue;

const OCR_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(config: &WorkerConfig) -> anyhow::Result<()> {
    let mut results = Map::new();
    record(&mut results, "ocr", probe(|| ping_ocr(&config.ocr_health_url())));
    record(&mut results, "queue", probe(|| Ok(open_queue(config)?.ping()?)));
    record(
        &mut results,
        "store",
        probe(|| {
            let store = PostgresDocumentStore::connect(config.database_url()?)?;
            Ok(store.ping()?)
        }),
    );

    let failed = results.keys().any(|k| k.ends_with("_error"));
    println!("{}", serde_json::to_string_pretty(&Value::Object(results))?);
    if failed {
        bail!("one or more dependencies are unhealthy");
    }
    Ok(())
}

fn ping_ocr(url: &str) -> anyhow::Result<()> {
    reqwest::blocking::Client::new()
        .get(url)
        .timeout(OCR_TIMEOUT)
        .send()?
        .error_for_status()?;
    Ok(())
}

/// Runs `check` and returns its latency in milliseconds.
fn probe(check: impl FnOnce() -> anyhow::Result<()>) -> anyhow::Result<f64> {
    let started = Instant::now();
    check()?;
    Ok((started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0)
}

fn record(results: &mut Map<String, Value>, name: &str, outcome: anyhow::Result<f64>) {
    match outcome {
        Ok(latency_ms) => results.insert(name.to_string(), json!({ "latency_ms": latency_ms })),
        Err(e) => results.insert(format!("{name}_error"), json!({ "error": format!("{e:#}") })),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_recorded_under_error_keys() {
        let mut results = Map::new();
        record(&mut results, "ocr", Ok(12.5));
        record(&mut results, "store", Err(anyhow::anyhow!("DATABASE_URL missing")));
        assert_eq!(results["ocr"]["latency_ms"], 12.5);
        assert_eq!(results["store_error"]["error"], "DATABASE_URL missing");
    }

    #[test]
    fn probe_measures_successful_checks() {
        let latency = probe(|| Ok(())).unwrap();
        assert!(latency >= 0.0);
        assert!(probe(|| anyhow::bail!("down")).is_err());
    }
}
