use std::collections::HashMap;
use std::sync::RwLock;

use paperflow_core::{EntityKind, NaturalKey, RecordId, Row};
use serde_json::Value;

use super::{DocumentStore, StoreError};

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RecordId,
    pub natural_key: String,
    pub data: Row,
}

/// In-memory document store for tests/dev.
///
/// Mirrors the Postgres schema's guarantees: a unique natural key per table,
/// a `customer_id` foreign key that must reference an existing customer, and
/// null-preserving merges on conflict. Every write is also appended to a log
/// so callers can assert on write order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    tables: RwLock<HashMap<EntityKind, Vec<StoredRow>>>,
    writes: RwLock<Vec<(EntityKind, String)>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of one table, in insertion order.
    pub fn rows(&self, kind: EntityKind) -> Vec<StoredRow> {
        self.tables
            .read()
            .map(|t| t.get(&kind).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn find(&self, kind: EntityKind, natural_key: &str) -> Option<StoredRow> {
        self.rows(kind).into_iter().find(|r| r.natural_key == natural_key)
    }

    /// `(table, natural key)` of every upsert, in call order.
    pub fn write_log(&self) -> Vec<(EntityKind, String)> {
        self.writes.read().map(|w| w.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".into())
}

impl DocumentStore for InMemoryDocumentStore {
    fn upsert(&self, kind: EntityKind, key: &NaturalKey, row: &Row) -> Result<Option<RecordId>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;

        if let Some(customer_id) = row.get("customer_id").filter(|v| !v.is_null()) {
            let exists = tables
                .get(&EntityKind::Customer)
                .is_some_and(|rows| rows.iter().any(|r| Value::String(r.id.to_string()) == *customer_id));
            if !exists {
                return Err(StoreError::Constraint {
                    table: kind.table(),
                    message: format!("customer_id {customer_id} does not reference a customer"),
                });
            }
        }

        let rows = tables.entry(kind).or_default();
        let id = match rows.iter_mut().find(|r| r.natural_key == key.value) {
            Some(existing) => {
                for (column, value) in row {
                    if !value.is_null() {
                        existing.data.insert(column.clone(), value.clone());
                    } else {
                        existing.data.entry(column.clone()).or_insert(Value::Null);
                    }
                }
                existing.id
            }
            None => {
                let id = RecordId::new();
                rows.push(StoredRow {
                    id,
                    natural_key: key.value.clone(),
                    data: row.clone(),
                });
                id
            }
        };

        self.writes
            .write()
            .map_err(|_| poisoned())?
            .push((kind, key.value.clone()));
        Ok(Some(id))
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.tables.read().map(|_| ()).map_err(|_| poisoned())
    }
}
