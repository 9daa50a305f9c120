//! `paperflow-core`: document domain building blocks.
//!
//! This crate contains the **pure domain** model shared by every other crate:
//! the entities we persist, the batch they travel in, and the structured payload
//! returned by the extraction provider. No I/O lives here.

pub mod batch;
pub mod document;
pub mod entity;
pub mod error;
pub mod id;
pub mod payload;

pub use batch::{Collection, DocumentBatch, coerce_collection};
pub use document::{Customer, Offer, Receipt, DEFAULT_CURRENCY};
pub use entity::{Entity, EntityKind, NaturalKey, Row};
pub use error::{DocumentError, DocumentResult};
pub use id::RecordId;
pub use payload::{DocumentPayload, DocumentType, LineItem, MonetaryAmount, Party};
