//! Queue jobs, the worker that consumes them, and the retry wrapper around it.
//!
//! ## Design
//!
//! - One job at a time per worker; scale out by running more workers
//! - Malformed jobs are dead-lettered immediately, they can never succeed
//! - Any other failure dead-letters the raw payload and is returned to the caller
//! - Retry with backoff wraps the whole run loop, not individual jobs
//!
//! ## Components
//!
//! - `Job`: a decoded queue entry and where its batch comes from
//! - `QueueWorker`: pops, resolves, persists, dead-letters
//! - `RetryPolicy` / `retry_with_backoff`: bounded supervision of the run loop

pub mod retry;
pub mod types;
pub mod worker;

pub use retry::{BackoffStrategy, RetryPolicy, retry_with_backoff};
pub use types::{Job, JobDecodeError, JobSource};
pub use worker::{DrainReport, JobOutcome, QueueWorker, WorkerError};
