use anyhow::{Context, bail};
use paperflow_infra::{Job, JobQueue, WorkerConfig};
use serde_json::Value;

use super::open_queue;

pub fn enqueue(config: &WorkerConfig, payload: Option<&str>, file_url: Option<&str>) -> anyhow::Result<()> {
    let raw = job_from_args(payload, file_url)?;
    let job = Job::parse(&raw).context("refusing to enqueue a job the worker cannot decode")?;
    open_queue(config)?.push(&raw)?;
    println!("Enqueued {} job on {}", job.source.kind(), config.queue_key);
    Ok(())
}

/// Inline JSON objects are embedded; anything else is taken as a file path.
pub fn job_from_args(payload: Option<&str>, file_url: Option<&str>) -> anyhow::Result<String> {
    match (payload, file_url) {
        (Some(payload), None) => match serde_json::from_str::<Value>(payload) {
            Ok(value @ Value::Object(_)) => Ok(Job::inline(value)),
            _ => Ok(Job::path(payload)),
        },
        (None, Some(url)) => Ok(Job::remote(url)),
        _ => bail!("pass exactly one of --payload or --file-url"),
    }
}

pub fn status(config: &WorkerConfig, json: bool) -> anyhow::Result<()> {
    let stats = open_queue(config)?.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Pending jobs: {} | Dead-lettered: {}", stats.pending, stats.dead_lettered);
    }
    Ok(())
}

pub fn dead_letters(config: &WorkerConfig, limit: usize) -> anyhow::Result<()> {
    let entries = open_queue(config)?.dead_letters(limit)?;
    if entries.is_empty() {
        eprintln!("No dead-lettered jobs");
    }
    for entry in entries {
        println!("{entry}");
    }
    Ok(())
}

pub fn requeue(config: &WorkerConfig, limit: usize) -> anyhow::Result<()> {
    let moved = open_queue(config)?.requeue_dead_letters(limit)?;
    println!("Requeued {moved} job(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperflow_infra::JobSource;

    #[test]
    fn inline_payload_is_embedded() {
        let raw = job_from_args(Some(r#"{"customers": {"name": "Acme AB"}}"#), None).unwrap();
        let job = Job::parse(&raw).unwrap();
        assert!(matches!(job.source, JobSource::Inline(_)));
    }

    #[test]
    fn non_json_payload_is_a_path() {
        let raw = job_from_args(Some("/data/batch.json"), None).unwrap();
        let job = Job::parse(&raw).unwrap();
        assert_eq!(job.source, JobSource::Path("/data/batch.json".into()));
    }

    #[test]
    fn file_url_becomes_remote_job() {
        let raw = job_from_args(None, Some("https://files.example.com/r.pdf")).unwrap();
        assert_eq!(
            Job::parse(&raw).unwrap().source,
            JobSource::Remote("https://files.example.com/r.pdf".into())
        );
    }

    #[test]
    fn exactly_one_source_is_required() {
        assert!(job_from_args(None, None).is_err());
        assert!(job_from_args(Some("{}"), Some("https://x")).is_err());
    }
}
