use std::sync::Arc;

use paperflow_infra::{HttpExtractionClient, QueueWorker, WorkerConfig, retry_with_backoff};
use tracing::{error, info};

use super::{open_queue, open_store};

pub fn run(config: &WorkerConfig, once: bool) -> anyhow::Result<()> {
    let queue = open_queue(config)?;
    let store = open_store(config)?;
    let extractor = HttpExtractionClient::new(
        config.ocr_service_url.clone(),
        config.fetch_timeout,
        config.extract_timeout,
    )?;
    let worker = QueueWorker::new(queue, store, Arc::new(extractor)).with_poll_interval(config.poll_interval);

    if once {
        let report = worker.drain()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!(
        queue = %config.queue_key,
        max_attempts = config.retry.max_attempts,
        "starting worker"
    );
    retry_with_backoff(&config.retry, std::thread::sleep, |attempt| {
        info!(attempt, "worker run loop starting");
        worker.run_forever()
    })
    .inspect_err(|e| error!(error = %e, "worker giving up"))?;
    Ok(())
}
