//! Domain error model.

use thiserror::Error;

/// Result type used across the document domain.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures of the data itself (shape,
/// identity, schema). Transport and storage concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A batch (or one of its elements) could not be coerced into entity shape.
    #[error("batch validation failed: {0}")]
    BatchValidation(String),

    /// An entity carries none of the fields that identify it in the store.
    #[error("cannot upsert {entity} without {field}")]
    MissingNaturalKey {
        entity: &'static str,
        field: &'static str,
    },

    /// A structured extraction payload did not match the document schema.
    #[error("extraction payload does not match schema: {0}")]
    ExtractionParseFailed(String),
}

impl DocumentError {
    pub fn batch(msg: impl Into<String>) -> Self {
        Self::BatchValidation(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::ExtractionParseFailed(msg.into())
    }

    pub fn missing_key(entity: &'static str, field: &'static str) -> Self {
        Self::MissingNaturalKey { entity, field }
    }
}
