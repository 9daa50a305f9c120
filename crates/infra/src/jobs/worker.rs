//! Queue Worker.
//!
//! `Idle -> Processing -> Idle` on success, `Processing -> DeadLettered` on
//! failure. One job at a time; an empty queue sleeps for the poll interval
//! before the next pop.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use paperflow_core::{DocumentBatch, DocumentError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::types::{Job, JobDecodeError, JobSource};
use crate::extraction_client::{BatchExtractor, ExtractionClientError};
use crate::persist::{PersistError, PersistReport, UpsertEngine};
use crate::queue::{JobQueue, QueueError};
use crate::store::DocumentStore;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed job: {0}")]
    QueueDecode(#[from] JobDecodeError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Extraction(#[from] ExtractionClientError),

    /// The job failed and its payload could not be dead-lettered either.
    #[error("{cause}; dead-lettering also failed: {source}")]
    DeadLetterFailed {
        cause: Box<WorkerError>,
        #[source]
        source: QueueError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Persisted(PersistReport),
    /// Malformed entry moved to the dead-letter list. Not an error for the loop.
    DeadLettered { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub persisted: usize,
    pub dead_lettered: usize,
}

pub struct QueueWorker<Q, S> {
    queue: Q,
    engine: UpsertEngine<S>,
    extractor: Arc<dyn BatchExtractor>,
    poll_interval: Duration,
}

impl<Q: JobQueue, S: DocumentStore> QueueWorker<Q, S> {
    pub fn new(queue: Q, store: S, extractor: Arc<dyn BatchExtractor>) -> Self {
        Self {
            queue,
            engine: UpsertEngine::new(store),
            extractor,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn engine(&self) -> &UpsertEngine<S> {
        &self.engine
    }

    /// Pops and processes at most one job. `None` when the queue was empty.
    pub fn run_once(&self) -> Result<Option<JobOutcome>, WorkerError> {
        match self.queue.pop()? {
            Some(raw) => self.process_raw(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Polls until an error escapes. Never returns `Ok`.
    pub fn run_forever(&self) -> Result<(), WorkerError> {
        info!(poll_ms = self.poll_interval.as_millis() as u64, "worker started");
        loop {
            if self.run_once()?.is_none() {
                thread::sleep(self.poll_interval);
            }
        }
    }

    /// Processes jobs until the queue is empty, stopping at the first error.
    pub fn drain(&self) -> Result<DrainReport, WorkerError> {
        let mut report = DrainReport::default();
        while let Some(outcome) = self.run_once()? {
            match outcome {
                JobOutcome::Persisted(_) => report.persisted += 1,
                JobOutcome::DeadLettered { .. } => report.dead_lettered += 1,
            }
        }
        Ok(report)
    }

    /// Handles one raw entry.
    ///
    /// Decode failures are dead-lettered and reported as an outcome. Any later
    /// failure dead-letters `raw` unchanged and is returned.
    #[instrument(skip_all)]
    pub fn process_raw(&self, raw: &str) -> Result<JobOutcome, WorkerError> {
        let job = match Job::parse(raw) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "dead-lettering malformed job");
                let reason = e.to_string();
                if let Err(source) = self.queue.dead_letter(raw) {
                    return Err(WorkerError::DeadLetterFailed { cause: Box::new(e.into()), source });
                }
                return Ok(JobOutcome::DeadLettered { reason });
            }
        };

        let started = Instant::now();
        match self.process(&job) {
            Ok(report) => {
                info!(
                    job = job.source.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "job persisted"
                );
                Ok(JobOutcome::Persisted(report))
            }
            Err(e) => {
                error!(job = job.source.kind(), error = %e, "job failed, dead-lettering");
                Err(self.dead_letter(&job.raw, e))
            }
        }
    }

    /// Moves `raw` to the dead-letter list and hands back the error to report.
    fn dead_letter(&self, raw: &str, cause: WorkerError) -> WorkerError {
        match self.queue.dead_letter(raw) {
            Ok(()) => cause,
            Err(source) => WorkerError::DeadLetterFailed { cause: Box::new(cause), source },
        }
    }

    fn process(&self, job: &Job) -> Result<PersistReport, WorkerError> {
        let batch = self.resolve_batch(&job.source)?;
        debug!(entities = batch.len(), "batch resolved");
        Ok(self.engine.persist_batch(&batch)?)
    }

    fn resolve_batch(&self, source: &JobSource) -> Result<DocumentBatch, WorkerError> {
        match source {
            JobSource::Inline(value) => Ok(DocumentBatch::try_from(value.clone())?),
            JobSource::Path(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| WorkerError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(DocumentBatch::from_json_str(&raw)?)
            }
            JobSource::Remote(file_url) => {
                let response = self.extractor.extract_remote(file_url)?;
                Ok(DocumentBatch::from_extraction_response(response)?)
            }
        }
    }
}
