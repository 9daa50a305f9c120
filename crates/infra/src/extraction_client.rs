//! Client for the remote half of a `file_url` job: download the document,
//! post it to the extraction endpoint, return the JSON body.

use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ExtractionClientError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("extraction request failed: {0}")]
    Extract(String),

    #[error("extraction endpoint returned invalid JSON: {0}")]
    InvalidResponse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Turns a document URL into an extraction response body.
pub trait BatchExtractor: Send + Sync {
    fn extract_remote(&self, file_url: &str) -> Result<Value, ExtractionClientError>;
}

impl<T: BatchExtractor + ?Sized> BatchExtractor for std::sync::Arc<T> {
    fn extract_remote(&self, file_url: &str) -> Result<Value, ExtractionClientError> {
        (**self).extract_remote(file_url)
    }
}

/// Blocking HTTP implementation; the worker is synchronous.
#[derive(Debug, Clone)]
pub struct HttpExtractionClient {
    client: Client,
    endpoint: String,
    fetch_timeout: Duration,
    extract_timeout: Duration,
}

impl HttpExtractionClient {
    pub fn new(
        endpoint: impl Into<String>,
        fetch_timeout: Duration,
        extract_timeout: Duration,
    ) -> Result<Self, ExtractionClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ExtractionClientError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            fetch_timeout,
            extract_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fetch(&self, file_url: &str) -> Result<Vec<u8>, ExtractionClientError> {
        let fetch_error = |e: reqwest::Error| ExtractionClientError::Fetch {
            url: file_url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(file_url)
            .timeout(self.fetch_timeout)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let body = response.bytes().map_err(fetch_error)?;
        Ok(body.to_vec())
    }

    /// Posts raw document bytes as the multipart `file` field.
    pub fn extract_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<Value, ExtractionClientError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.extract_timeout)
            .multipart(form)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractionClientError::Extract(e.to_string()))?;
        response
            .json::<Value>()
            .map_err(|e| ExtractionClientError::InvalidResponse(e.to_string()))
    }
}

impl BatchExtractor for HttpExtractionClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint), err)]
    fn extract_remote(&self, file_url: &str) -> Result<Value, ExtractionClientError> {
        let bytes = self.fetch(file_url)?;
        debug!(size = bytes.len(), "downloaded document");
        self.extract_bytes(&filename_from_url(file_url), bytes)
    }
}

/// Last path segment of the URL, without query or fragment.
pub fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("document")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(filename_from_url("https://cdn.example.com/a/b/scan.pdf"), "scan.pdf");
        assert_eq!(filename_from_url("https://cdn.example.com/r.jpg?sig=abc#x"), "r.jpg");
        assert_eq!(filename_from_url("https://cdn.example.com/"), "document");
    }

    #[test]
    fn unreachable_host_is_a_fetch_error() {
        let client = HttpExtractionClient::new(
            "http://127.0.0.1:9/extract",
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.extract_remote("http://127.0.0.1:9/doc.png").unwrap_err();
        assert!(matches!(err, ExtractionClientError::Fetch { .. }));
    }
}
