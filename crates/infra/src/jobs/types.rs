//! Queue job decoding.
//!
//! A job is a JSON object carrying either `payload` (an inline batch object or
//! a path to a batch file) or `file_url` (a document to fetch and extract).
//! The raw string is kept alongside the decoded form so a failed job can be
//! dead-lettered exactly as it arrived.

use std::path::PathBuf;

use serde_json::{Value, json};
use thiserror::Error;

/// Why a raw queue entry is not a job. Such entries can never succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDecodeError {
    #[error("job is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("job must be a JSON object")]
    NotAnObject,

    #[error("job has neither `payload` nor `file_url`")]
    MissingSource,

    #[error("job `{0}` has the wrong type")]
    InvalidField(&'static str),
}

/// Where a job's batch comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSource {
    /// Batch-shaped JSON carried in the job itself.
    Inline(Value),
    /// Path to a JSON batch file readable by the worker.
    Path(PathBuf),
    /// Document to download and send to the extraction endpoint.
    Remote(String),
}

impl JobSource {
    pub fn kind(&self) -> &'static str {
        match self {
            JobSource::Inline(_) => "inline",
            JobSource::Path(_) => "path",
            JobSource::Remote(_) => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// The entry exactly as popped from the queue.
    pub raw: String,
    pub source: JobSource,
}

impl Job {
    pub fn parse(raw: &str) -> Result<Self, JobDecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| JobDecodeError::InvalidJson(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(JobDecodeError::NotAnObject);
        };

        let source = match fields.remove("payload") {
            Some(payload @ Value::Object(_)) => JobSource::Inline(payload),
            Some(Value::String(path)) if !path.trim().is_empty() => JobSource::Path(PathBuf::from(path)),
            None | Some(Value::Null) => match fields.remove("file_url") {
                Some(Value::String(url)) if !url.trim().is_empty() => JobSource::Remote(url),
                None | Some(Value::Null) => return Err(JobDecodeError::MissingSource),
                Some(Value::String(_)) => return Err(JobDecodeError::MissingSource),
                Some(_) => return Err(JobDecodeError::InvalidField("file_url")),
            },
            Some(_) => return Err(JobDecodeError::InvalidField("payload")),
        };

        Ok(Self {
            raw: raw.to_string(),
            source,
        })
    }

    /// Serialized job carrying an inline batch.
    pub fn inline(batch: Value) -> String {
        json!({ "payload": batch }).to_string()
    }

    /// Serialized job pointing at a batch file.
    pub fn path(path: impl Into<String>) -> String {
        json!({ "payload": path.into() }).to_string()
    }

    /// Serialized job pointing at a remote document.
    pub fn remote(file_url: impl Into<String>) -> String {
        json!({ "file_url": file_url.into() }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_payload() {
        let job = Job::parse(r#"{"payload": {"customers": {"name": "Solo"}}}"#).unwrap();
        assert!(matches!(job.source, JobSource::Inline(_)));
        assert_eq!(job.source.kind(), "inline");
    }

    #[test]
    fn path_payload() {
        let job = Job::parse(&Job::path("/data/batch.json")).unwrap();
        assert_eq!(job.source, JobSource::Path(PathBuf::from("/data/batch.json")));
    }

    #[test]
    fn remote_file() {
        let job = Job::parse(&Job::remote("https://files.example/scan.png")).unwrap();
        assert_eq!(job.source, JobSource::Remote("https://files.example/scan.png".into()));
    }

    #[test]
    fn raw_is_preserved_verbatim() {
        let raw = r#"{ "file_url" : "https://x/y.pdf" ,"extra": 1}"#;
        assert_eq!(Job::parse(raw).unwrap().raw, raw);
    }

    #[test]
    fn malformed_entries() {
        assert!(matches!(Job::parse("{not json"), Err(JobDecodeError::InvalidJson(_))));
        assert_eq!(Job::parse("[1,2]"), Err(JobDecodeError::NotAnObject));
        assert_eq!(Job::parse("{}"), Err(JobDecodeError::MissingSource));
        assert_eq!(Job::parse(r#"{"file_url": ""}"#), Err(JobDecodeError::MissingSource));
        assert_eq!(Job::parse(r#"{"payload": 42}"#), Err(JobDecodeError::InvalidField("payload")));
        assert_eq!(Job::parse(r#"{"file_url": 7}"#), Err(JobDecodeError::InvalidField("file_url")));
    }
}
