//! Persisted document entities: customers, offers and receipts.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::entity::{Entity, EntityKind, NaturalKey, Row, present};
use crate::error::{DocumentError, DocumentResult};

/// Currency assumed when an offer does not state one.
pub const DEFAULT_CURRENCY: &str = "SEK";

/// A counterparty. Identified by organization number, else by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub organization_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            organization_number: None,
            email: None,
            phone: None,
        }
    }

    pub fn with_organization_number(mut self, org: impl Into<String>) -> Self {
        self.organization_number = Some(org.into());
        self
    }
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;

    fn natural_key(&self) -> DocumentResult<NaturalKey> {
        if let Some(org) = present(self.organization_number.as_deref()) {
            return Ok(NaturalKey::new("organization_number", org));
        }
        match present(Some(self.name.as_str())) {
            Some(name) => Ok(NaturalKey::new("name", name)),
            None => Err(DocumentError::missing_key("customer", "organization_number or name")),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".into(), json!(self.name));
        row.insert("organization_number".into(), json!(self.organization_number));
        row.insert("email".into(), json!(self.email));
        row.insert("phone".into(), json!(self.phone));
        row
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// A quotation issued to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_number: String,
    pub customer: Customer,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl Entity for Offer {
    const KIND: EntityKind = EntityKind::Offer;

    fn natural_key(&self) -> DocumentResult<NaturalKey> {
        present(Some(self.offer_number.as_str()))
            .map(|n| NaturalKey::new("offer_number", n))
            .ok_or(DocumentError::missing_key("offer", "offer_number"))
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("offer_number".into(), json!(self.offer_number));
        row.insert("total_amount".into(), json!(self.total_amount));
        row.insert("currency".into(), Value::String(self.currency.clone()));
        row.insert("issued_at".into(), json!(self.issued_at));
        row
    }
}

/// A purchase receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_number: String,
    pub customer: Customer,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub vat_amount: Option<f64>,
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl Entity for Receipt {
    const KIND: EntityKind = EntityKind::Receipt;

    fn natural_key(&self) -> DocumentResult<NaturalKey> {
        present(Some(self.receipt_number.as_str()))
            .map(|n| NaturalKey::new("receipt_number", n))
            .ok_or(DocumentError::missing_key("receipt", "receipt_number"))
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("receipt_number".into(), json!(self.receipt_number));
        row.insert("total_amount".into(), json!(self.total_amount));
        row.insert("vat_amount".into(), json!(self.vat_amount));
        row.insert("issued_at".into(), json!(self.issued_at));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_key_prefers_organization_number() {
        let c = Customer::named("Acme AB").with_organization_number("556677-8899");
        assert_eq!(
            c.natural_key().unwrap(),
            NaturalKey::new("organization_number", "556677-8899")
        );
    }

    #[test]
    fn customer_key_falls_back_to_name() {
        let mut c = Customer::named("  Acme AB ");
        c.organization_number = Some("   ".into());
        assert_eq!(c.natural_key().unwrap(), NaturalKey::new("name", "Acme AB"));
    }

    #[test]
    fn customer_without_any_key_is_rejected() {
        let c = Customer::named("");
        assert!(matches!(
            c.natural_key(),
            Err(DocumentError::MissingNaturalKey { entity: "customer", .. })
        ));
    }

    #[test]
    fn offer_defaults_currency_to_sek() {
        let offer: Offer = serde_json::from_value(serde_json::json!({
            "offer_number": "OFF-1",
            "customer": { "name": "Acme" }
        }))
        .unwrap();
        assert_eq!(offer.currency, "SEK");
        assert_eq!(offer.total_amount, None);
    }

    #[test]
    fn rows_do_not_embed_the_customer() {
        let offer = Offer {
            offer_number: "OFF-1".into(),
            customer: Customer::named("Acme"),
            total_amount: Some(100.0),
            currency: "SEK".into(),
            issued_at: None,
        };
        let row = offer.to_row();
        assert!(!row.contains_key("customer"));
        assert_eq!(row["total_amount"], serde_json::json!(100.0));
    }

    #[test]
    fn blank_receipt_number_is_missing_key() {
        let r = Receipt {
            receipt_number: " ".into(),
            customer: Customer::named("Shop"),
            total_amount: None,
            vat_amount: None,
            issued_at: None,
        };
        assert_eq!(
            r.natural_key(),
            Err(DocumentError::missing_key("receipt", "receipt_number"))
        );
    }
}
