//! Idempotent Upsert Engine.
//!
//! Customers are written first. Every offer and receipt then re-resolves its
//! customer by natural key and carries the resulting id as `customer_id`. No
//! mapping is cached across batches, and nothing spans a transaction: a crash
//! between the customer write and the dependent write leaves the customer.

use paperflow_core::{
    Customer, DocumentBatch, DocumentError, Entity, EntityKind, NaturalKey, RecordId, Row,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store accepted the customer write but reported no id for it.
    #[error("customer {0} was written but its id could not be resolved")]
    UnresolvedCustomer(NaturalKey),
}

/// Counts of rows written per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub customers: usize,
    pub offers: usize,
    pub receipts: usize,
}

pub struct UpsertEngine<S> {
    store: S,
}

impl<S: DocumentStore> UpsertEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes one batch: standalone customers, then offers, then receipts.
    #[instrument(skip_all, fields(customers = batch.customers.len(), offers = batch.offers.len(), receipts = batch.receipts.len()))]
    pub fn persist_batch(&self, batch: &DocumentBatch) -> Result<PersistReport, PersistError> {
        let mut report = PersistReport::default();

        for customer in &batch.customers {
            self.upsert(customer, Row::new())?;
            report.customers += 1;
        }
        for offer in &batch.offers {
            let customer_id = self.resolve_customer(&offer.customer)?;
            self.upsert(offer, customer_ref(customer_id))?;
            report.offers += 1;
        }
        for receipt in &batch.receipts {
            let customer_id = self.resolve_customer(&receipt.customer)?;
            self.upsert(receipt, customer_ref(customer_id))?;
            report.receipts += 1;
        }

        info!(?report, "batch persisted");
        Ok(report)
    }

    /// Upserts `customer` and returns the id dependent rows must reference.
    pub fn resolve_customer(&self, customer: &Customer) -> Result<RecordId, PersistError> {
        let key = customer.natural_key()?;
        self.store
            .upsert(EntityKind::Customer, &key, &customer.to_row())?
            .ok_or(PersistError::UnresolvedCustomer(key))
    }

    fn upsert<E: Entity>(&self, entity: &E, extra: Row) -> Result<Option<RecordId>, PersistError> {
        let key = entity.natural_key()?;
        let mut row = entity.to_row();
        row.extend(extra);
        debug!(table = E::KIND.table(), key = %key, "upsert");
        Ok(self.store.upsert(E::KIND, &key, &row)?)
    }
}

fn customer_ref(id: RecordId) -> Row {
    let mut row = Row::new();
    row.insert("customer_id".into(), json!(id));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use paperflow_core::{Offer, Receipt};
    use std::sync::Arc;

    fn sample_batch() -> DocumentBatch {
        DocumentBatch::try_from(json!({
            "customers": { "name": "Acme AB", "organization_number": "556677-8899" },
            "offers": [{
                "offer_number": "OFF-1001",
                "customer": { "name": "Acme AB", "organization_number": "556677-8899" },
                "total_amount": 1234.5
            }],
            "receipts": [{
                "receipt_number": "RCPT-9001",
                "customer": { "name": "Acme AB", "organization_number": "556677-8899" },
                "vat_amount": 25.0
            }]
        }))
        .unwrap()
    }

    #[test]
    fn persists_all_entities_with_foreign_keys() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = UpsertEngine::new(store.clone());
        let report = engine.persist_batch(&sample_batch()).unwrap();
        assert_eq!(report, PersistReport { customers: 1, offers: 1, receipts: 1 });

        let customers = store.rows(EntityKind::Customer);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].data["organization_number"], "556677-8899");
        let customer_id = json!(customers[0].id);

        let offers = store.rows(EntityKind::Offer);
        assert_eq!(offers[0].data["offer_number"], "OFF-1001");
        assert_eq!(offers[0].data["customer_id"], customer_id);
        assert_eq!(offers[0].data["currency"], "SEK");
        assert_eq!(store.rows(EntityKind::Receipt)[0].data["customer_id"], customer_id);
    }

    #[test]
    fn rerunning_a_batch_creates_no_duplicates() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = UpsertEngine::new(store.clone());
        engine.persist_batch(&sample_batch()).unwrap();
        engine.persist_batch(&sample_batch()).unwrap();
        assert_eq!(store.rows(EntityKind::Customer).len(), 1);
        assert_eq!(store.rows(EntityKind::Offer).len(), 1);
        assert_eq!(store.rows(EntityKind::Receipt).len(), 1);
    }

    #[test]
    fn latest_customer_fields_win() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = UpsertEngine::new(store.clone());
        let first = Customer::named("Acme").with_organization_number("556677-8899");
        let mut second = Customer::named("Acme Holding AB").with_organization_number("556677-8899");
        second.email = Some("hej@acme.se".into());

        let a = engine.resolve_customer(&first).unwrap();
        let b = engine.resolve_customer(&second).unwrap();
        assert_eq!(a, b);
        let rows = store.rows(EntityKind::Customer);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["name"], "Acme Holding AB");
        assert_eq!(rows[0].data["email"], "hej@acme.se");
    }

    #[test]
    fn customer_is_written_before_each_dependent_row() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = UpsertEngine::new(store.clone());
        engine.persist_batch(&sample_batch()).unwrap();
        engine.persist_batch(&sample_batch()).unwrap();

        let log = store.write_log();
        for (i, (kind, _)) in log.iter().enumerate() {
            if *kind != EntityKind::Customer {
                assert_eq!(log[i - 1].0, EntityKind::Customer, "write {i} not preceded by its customer");
            }
        }
    }

    #[test]
    fn missing_natural_key_fails_before_writing() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = UpsertEngine::new(store.clone());
        let batch = DocumentBatch {
            offers: vec![Offer {
                offer_number: "OFF-1".into(),
                customer: Customer::named(" "),
                total_amount: None,
                currency: "SEK".into(),
                issued_at: None,
            }],
            ..Default::default()
        };
        let err = engine.persist_batch(&batch).unwrap_err();
        assert!(matches!(err, PersistError::Document(DocumentError::MissingNaturalKey { .. })));
        assert!(store.write_log().is_empty());
    }

    /// Accepts writes but never returns ids, like a store with row-level
    /// security hiding the returned row.
    struct Blind;

    impl DocumentStore for Blind {
        fn upsert(&self, _: EntityKind, _: &NaturalKey, _: &Row) -> Result<Option<RecordId>, StoreError> {
            Ok(None)
        }

        fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn unresolved_customer_stops_the_dependent_write() {
        let engine = UpsertEngine::new(Blind);
        let batch = DocumentBatch {
            receipts: vec![Receipt {
                receipt_number: "R-1".into(),
                customer: Customer::named("Shop"),
                total_amount: None,
                vat_amount: None,
                issued_at: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            engine.persist_batch(&batch),
            Err(PersistError::UnresolvedCustomer(_))
        ));
    }
}
