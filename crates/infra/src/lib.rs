//! Infrastructure layer: configuration, storage, queueing, and the worker
//! that ties them together.

pub mod config;
pub mod extraction_client;
pub mod jobs;
pub mod persist;
pub mod queue;
pub mod store;

pub use config::{ApiConfig, ConfigError, WorkerConfig};
pub use extraction_client::{BatchExtractor, ExtractionClientError, HttpExtractionClient};
pub use jobs::{
    BackoffStrategy, DrainReport, Job, JobDecodeError, JobOutcome, JobSource, QueueWorker,
    RetryPolicy, WorkerError, retry_with_backoff,
};
pub use persist::{PersistError, PersistReport, UpsertEngine};
pub use queue::{InMemoryJobQueue, JobQueue, QueueError, QueueStats};
pub use store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, StoreError, StoredRow};

#[cfg(feature = "redis")]
pub use queue::RedisJobQueue;
