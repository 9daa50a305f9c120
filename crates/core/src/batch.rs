//! Document batches and the collection coercion that feeds them.
//!
//! Producers are sloppy about shape: a collection may be missing, `null`, a
//! single object, or a list. [`Collection`] names those cases explicitly and
//! [`coerce_collection`] turns any of them into a typed `Vec`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Customer, Offer, Receipt};
use crate::error::{DocumentError, DocumentResult};
use crate::payload::DocumentPayload;

/// The accepted shapes of one entity collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Absent,
    Single(Map<String, Value>),
    Many(Vec<Value>),
}

impl Collection {
    pub fn classify(field: &str, value: Option<&Value>) -> DocumentResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Collection::Absent),
            Some(Value::Object(map)) => Ok(Collection::Single(map.clone())),
            Some(Value::Array(items)) => Ok(Collection::Many(items.clone())),
            Some(other) => Err(DocumentError::batch(format!(
                "{field}: expected an object or a list, got {}",
                kind_of(other)
            ))),
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            Collection::Absent => Vec::new(),
            Collection::Single(map) => vec![Value::Object(map)],
            Collection::Many(items) => items,
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Coerces one collection field into typed entities.
pub fn coerce_collection<T: DeserializeOwned>(
    field: &str,
    value: Option<&Value>,
) -> DocumentResult<Vec<T>> {
    Collection::classify(field, value)?
        .into_items()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| DocumentError::batch(format!("{field}[{i}]: {e}")))
        })
        .collect()
}

/// A transient unit of work: everything one job wants persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct DocumentBatch {
    pub customers: Vec<Customer>,
    pub offers: Vec<Offer>,
    pub receipts: Vec<Receipt>,
}

impl DocumentBatch {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.offers.is_empty() && self.receipts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.customers.len() + self.offers.len() + self.receipts.len()
    }

    /// Accepts either a batch-shaped body or an `/extract` response
    /// (`{filename, content_type, payload}`).
    pub fn from_extraction_response(value: Value) -> DocumentResult<Self> {
        if let Some(payload) = value.get("payload").filter(|p| p.get("document_type").is_some()) {
            return DocumentPayload::from_value(payload.clone())?.into_batch();
        }
        Self::try_from(value)
    }

    pub fn from_json_str(raw: &str) -> DocumentResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DocumentError::batch(format!("invalid JSON: {e}")))?;
        Self::try_from(value)
    }
}

impl TryFrom<Value> for DocumentBatch {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(DocumentError::batch(format!(
                "batch: expected an object, got {}",
                kind_of(&value)
            )));
        };
        Ok(Self {
            customers: coerce_collection("customers", map.get("customers"))?,
            offers: coerce_collection("offers", map.get("offers"))?,
            receipts: coerce_collection("receipts", map.get("receipts"))?,
        })
    }
}
