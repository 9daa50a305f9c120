use std::collections::VecDeque;
use std::sync::Mutex;

use super::{JobQueue, QueueError, QueueStats};

/// In-memory queue for tests/dev, with the same ordering as the Redis lists.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    pending: Mutex<VecDeque<String>>,
    dead: Mutex<VecDeque<String>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs<I, S>(jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: Mutex::new(jobs.into_iter().map(Into::into).collect()),
            dead: Mutex::default(),
        }
    }
}

fn poisoned() -> QueueError {
    QueueError::Connection("in-memory queue lock poisoned".into())
}

impl JobQueue for InMemoryJobQueue {
    fn push(&self, raw: &str) -> Result<(), QueueError> {
        self.pending.lock().map_err(|_| poisoned())?.push_back(raw.to_string());
        Ok(())
    }

    fn pop(&self) -> Result<Option<String>, QueueError> {
        Ok(self.pending.lock().map_err(|_| poisoned())?.pop_front())
    }

    fn dead_letter(&self, raw: &str) -> Result<(), QueueError> {
        self.dead.lock().map_err(|_| poisoned())?.push_front(raw.to_string());
        Ok(())
    }

    fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(QueueStats {
            pending: self.pending.lock().map_err(|_| poisoned())?.len(),
            dead_lettered: self.dead.lock().map_err(|_| poisoned())?.len(),
        })
    }

    fn dead_letters(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        let dead = self.dead.lock().map_err(|_| poisoned())?;
        Ok(dead.iter().take(limit).cloned().collect())
    }

    fn requeue_dead_letters(&self, limit: usize) -> Result<usize, QueueError> {
        let mut dead = self.dead.lock().map_err(|_| poisoned())?;
        let mut pending = self.pending.lock().map_err(|_| poisoned())?;
        let mut moved = 0;
        while moved < limit {
            let Some(raw) = dead.pop_back() else { break };
            pending.push_front(raw);
            moved += 1;
        }
        Ok(moved)
    }

    fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let queue = InMemoryJobQueue::new();
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        assert_eq!(queue.pop().unwrap().as_deref(), Some("a"));
        assert_eq!(queue.pop().unwrap().as_deref(), Some("b"));
        assert_eq!(queue.pop().unwrap(), None);
    }

    #[test]
    fn dead_letters_newest_first_and_requeue_oldest_first() {
        let queue = InMemoryJobQueue::with_jobs(["next"]);
        queue.dead_letter("old").unwrap();
        queue.dead_letter("new").unwrap();
        assert_eq!(queue.dead_letters(10).unwrap(), vec!["new", "old"]);
        assert_eq!(queue.stats().unwrap(), QueueStats { pending: 1, dead_lettered: 2 });

        assert_eq!(queue.requeue_dead_letters(1).unwrap(), 1);
        assert_eq!(queue.pop().unwrap().as_deref(), Some("old"));
        assert_eq!(queue.dead_letters(10).unwrap(), vec!["new"]);
    }
}
