//! Entity trait: natural-key identity + row projection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentResult;

/// Column/value mapping written to the backing store.
pub type Row = Map<String, Value>;

/// The persisted entity families. Each maps to exactly one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Offer,
    Receipt,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customers",
            EntityKind::Offer => "offers",
            EntityKind::Receipt => "receipts",
        }
    }

    /// Data columns (besides `id` and `natural_key`) the table stores.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Customer => &["name", "organization_number", "email", "phone"],
            EntityKind::Offer => &[
                "offer_number",
                "customer_id",
                "total_amount",
                "currency",
                "issued_at",
            ],
            EntityKind::Receipt => &[
                "receipt_number",
                "customer_id",
                "total_amount",
                "vat_amount",
                "issued_at",
            ],
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.table())
    }
}

/// Business-meaningful identity used as the conflict target of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Field the value was taken from (e.g. `organization_number`).
    pub field: &'static str,
    pub value: String,
}

impl NaturalKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl core::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// A persistable document entity.
pub trait Entity {
    const KIND: EntityKind;

    /// Natural key of this entity, or `MissingNaturalKey` if none is present.
    fn natural_key(&self) -> DocumentResult<NaturalKey>;

    /// Own columns of the entity. Foreign keys are attached by the upsert engine.
    fn to_row(&self) -> Row;
}

/// Returns the trimmed value if it carries any non-whitespace content.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
