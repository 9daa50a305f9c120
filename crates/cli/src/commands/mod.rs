pub mod extract;
pub mod healthcheck;
pub mod persist;
pub mod queue;
pub mod worker;

use paperflow_infra::{PostgresDocumentStore, RedisJobQueue, WorkerConfig};

pub fn open_queue(config: &WorkerConfig) -> anyhow::Result<RedisJobQueue> {
    Ok(RedisJobQueue::new(
        &config.redis_url,
        Some(config.queue_key.clone()),
        Some(config.dead_letter_key.clone()),
    )?)
}

pub fn open_store(config: &WorkerConfig) -> anyhow::Result<PostgresDocumentStore> {
    let store = PostgresDocumentStore::connect(config.database_url()?)?;
    store.ensure_schema()?;
    Ok(store)
}
