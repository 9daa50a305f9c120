//! Work queue and dead-letter channel.
//!
//! Entries are raw strings. The queue never interprets them: decoding is the
//! worker's job, and dead-lettering stores the original bytes untouched.

mod in_memory;
#[cfg(feature = "redis")]
mod redis;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub use in_memory::InMemoryJobQueue;
#[cfg(feature = "redis")]
pub use self::redis::RedisJobQueue;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("queue command failed: {0}")]
    Command(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub dead_lettered: usize,
}

/// FIFO work queue with an append-only dead-letter list.
///
/// `pop` removes the entry. Nothing is re-enqueued automatically; a job that
/// is popped and then lost to a crash is gone.
pub trait JobQueue: Send + Sync {
    /// Appends a job to the tail.
    fn push(&self, raw: &str) -> Result<(), QueueError>;

    /// Removes and returns the head, if any.
    fn pop(&self) -> Result<Option<String>, QueueError>;

    /// Records a failed job, newest first.
    fn dead_letter(&self, raw: &str) -> Result<(), QueueError>;

    fn stats(&self) -> Result<QueueStats, QueueError>;

    /// Up to `limit` dead-lettered entries, newest first.
    fn dead_letters(&self, limit: usize) -> Result<Vec<String>, QueueError>;

    /// Moves up to `limit` dead-lettered entries, oldest first, back to the
    /// head of the queue. Returns how many moved.
    fn requeue_dead_letters(&self, limit: usize) -> Result<usize, QueueError>;

    fn ping(&self) -> Result<(), QueueError>;
}

impl<Q: JobQueue + ?Sized> JobQueue for Arc<Q> {
    fn push(&self, raw: &str) -> Result<(), QueueError> {
        (**self).push(raw)
    }

    fn pop(&self) -> Result<Option<String>, QueueError> {
        (**self).pop()
    }

    fn dead_letter(&self, raw: &str) -> Result<(), QueueError> {
        (**self).dead_letter(raw)
    }

    fn stats(&self) -> Result<QueueStats, QueueError> {
        (**self).stats()
    }

    fn dead_letters(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        (**self).dead_letters(limit)
    }

    fn requeue_dead_letters(&self, limit: usize) -> Result<usize, QueueError> {
        (**self).requeue_dead_letters(limit)
    }

    fn ping(&self) -> Result<(), QueueError> {
        (**self).ping()
    }
}
