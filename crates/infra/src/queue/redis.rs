//! Redis list-backed queue: `RPUSH`/`LPOP` on the job list, `LPUSH` on the
//! dead-letter list. Multiple workers may share one list; `LPOP` hands each
//! entry to exactly one of them.

use tracing::instrument;

use super::{JobQueue, QueueError, QueueStats};

pub const DEFAULT_QUEUE_KEY: &str = "ocr_jobs";
pub const DEFAULT_DEAD_LETTER_KEY: &str = "ocr_dead_letter";

#[derive(Debug, Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
    queue_key: String,
    dead_letter_key: String,
}

impl RedisJobQueue {
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379/0")
    /// * `queue_key` - job list key (default: "ocr_jobs")
    /// * `dead_letter_key` - dead-letter list key (default: "ocr_dead_letter")
    pub fn new(
        redis_url: impl AsRef<str>,
        queue_key: Option<String>,
        dead_letter_key: Option<String>,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            queue_key: queue_key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
            dead_letter_key: dead_letter_key.unwrap_or_else(|| DEFAULT_DEAD_LETTER_KEY.to_string()),
        })
    }

    fn connection(&self) -> Result<redis::Connection, QueueError> {
        self.client
            .get_connection()
            .map_err(|e| QueueError::Connection(e.to_string()))
    }
}

fn command_error(cmd: &str, e: redis::RedisError) -> QueueError {
    QueueError::Command(format!("{cmd} failed: {e}"))
}

impl JobQueue for RedisJobQueue {
    #[instrument(skip(self, raw), fields(queue = %self.queue_key), err)]
    fn push(&self, raw: &str) -> Result<(), QueueError> {
        let mut conn = self.connection()?;
        let _: usize = redis::cmd("RPUSH")
            .arg(&self.queue_key)
            .arg(raw)
            .query(&mut conn)
            .map_err(|e| command_error("RPUSH", e))?;
        Ok(())
    }

    fn pop(&self) -> Result<Option<String>, QueueError> {
        let mut conn = self.connection()?;
        redis::cmd("LPOP")
            .arg(&self.queue_key)
            .query(&mut conn)
            .map_err(|e| command_error("LPOP", e))
    }

    #[instrument(skip(self, raw), fields(dead_letter = %self.dead_letter_key), err)]
    fn dead_letter(&self, raw: &str) -> Result<(), QueueError> {
        let mut conn = self.connection()?;
        let _: usize = redis::cmd("LPUSH")
            .arg(&self.dead_letter_key)
            .arg(raw)
            .query(&mut conn)
            .map_err(|e| command_error("LPUSH", e))?;
        Ok(())
    }

    fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.connection()?;
        let pending: usize = redis::cmd("LLEN")
            .arg(&self.queue_key)
            .query(&mut conn)
            .map_err(|e| command_error("LLEN", e))?;
        let dead_lettered: usize = redis::cmd("LLEN")
            .arg(&self.dead_letter_key)
            .query(&mut conn)
            .map_err(|e| command_error("LLEN", e))?;
        Ok(QueueStats {
            pending,
            dead_lettered,
        })
    }

    fn dead_letters(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection()?;
        redis::cmd("LRANGE")
            .arg(&self.dead_letter_key)
            .arg(0)
            .arg(limit as i64 - 1)
            .query(&mut conn)
            .map_err(|e| command_error("LRANGE", e))
    }

    fn requeue_dead_letters(&self, limit: usize) -> Result<usize, QueueError> {
        let mut conn = self.connection()?;
        let mut moved = 0;
        while moved < limit {
            // RPOPLPUSH moves atomically, so a crash never loses the entry.
            let entry: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.dead_letter_key)
                .arg(&self.queue_key)
                .query(&mut conn)
                .map_err(|e| command_error("RPOPLPUSH", e))?;
            if entry.is_none() {
                break;
            }
            moved += 1;
        }
        Ok(moved)
    }

    fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection()?;
        let _: String = redis::cmd("PING")
            .query(&mut conn)
            .map_err(|e| command_error("PING", e))?;
        Ok(())
    }
}
