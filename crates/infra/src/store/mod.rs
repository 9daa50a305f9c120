//! Document store: natural-key upserts against a backing table per entity kind.

mod in_memory;
mod postgres;

use std::sync::Arc;

use paperflow_core::{EntityKind, NaturalKey, RecordId, Row};
use thiserror::Error;

pub use in_memory::{InMemoryDocumentStore, StoredRow};
pub use postgres::PostgresDocumentStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A constraint (foreign key, not-null, type) rejected the write.
    #[error("constraint violated in {table}: {message}")]
    Constraint { table: &'static str, message: String },

    #[error("query failed: {0}")]
    Query(String),
}

/// Insert-or-merge keyed by natural key.
///
/// A write whose natural key already exists merges into that row: non-null
/// values in `row` overwrite, null values keep what is stored. Implementations
/// return the id of the resulting row when the backend reports one.
pub trait DocumentStore: Send + Sync {
    fn upsert(&self, kind: EntityKind, key: &NaturalKey, row: &Row) -> Result<Option<RecordId>, StoreError>;

    /// Cheap connectivity check.
    fn ping(&self) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn upsert(&self, kind: EntityKind, key: &NaturalKey, row: &Row) -> Result<Option<RecordId>, StoreError> {
        (**self).upsert(kind, key, row)
    }

    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }
}
