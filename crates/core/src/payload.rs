//! Structured document payload returned by the vision extraction provider.
//!
//! The payload is richer than what we persist: line items, subtotals, notes.
//! [`DocumentPayload::into_batch`] narrows it down to the entities the store
//! knows about.

use serde::{Deserialize, Serialize};

use crate::batch::DocumentBatch;
use crate::document::{Customer, DEFAULT_CURRENCY, Offer, Receipt};
use crate::entity::present;
use crate::error::{DocumentError, DocumentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Offer,
    Invoice,
    Receipt,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Offer => "offer",
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Tax or VAT number. Swedish VAT numbers embed the organization number.
    #[serde(default)]
    pub vat_number: Option<String>,
}

impl Party {
    fn to_customer(&self) -> Option<Customer> {
        let name = present(self.name.as_deref())?;
        Some(Customer {
            name: name.to_string(),
            organization_number: present(self.vat_number.as_deref()).map(str::to_string),
            email: None,
            phone: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonetaryAmount {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub document_type: DocumentType,
    /// Offer, invoice or receipt number as printed on the document.
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub total: Option<MonetaryAmount>,
    #[serde(default)]
    pub subtotal: Option<MonetaryAmount>,
    #[serde(default)]
    pub tax: Option<MonetaryAmount>,
    #[serde(default)]
    pub supplier: Option<Party>,
    #[serde(default)]
    pub customer: Option<Party>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DocumentPayload {
    /// Parses and validates a provider response body.
    pub fn from_json_str(raw: &str) -> DocumentResult<Self> {
        serde_json::from_str(raw).map_err(|e| DocumentError::schema(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> DocumentResult<Self> {
        serde_json::from_value(value).map_err(|e| DocumentError::schema(e.to_string()))
    }

    /// The party we book the document against.
    ///
    /// Offers and invoices are addressed to `customer`; on a receipt the
    /// interesting party is the shop, i.e. `supplier`. Either falls back to
    /// the other when the preferred one has no name.
    pub fn counterparty(&self) -> Option<Customer> {
        let (preferred, other) = match self.document_type {
            DocumentType::Receipt => (&self.supplier, &self.customer),
            DocumentType::Offer | DocumentType::Invoice => (&self.customer, &self.supplier),
        };
        preferred
            .as_ref()
            .and_then(Party::to_customer)
            .or_else(|| other.as_ref().and_then(Party::to_customer))
    }

    /// Converts the payload into a persistable batch.
    ///
    /// Invoices have no table of their own and contribute only their customer.
    pub fn into_batch(self) -> DocumentResult<DocumentBatch> {
        let customer = self
            .counterparty()
            .ok_or(DocumentError::missing_key("customer", "name"))?;

        let mut batch = DocumentBatch::default();
        match self.document_type {
            DocumentType::Invoice => batch.customers.push(customer),
            DocumentType::Offer => {
                let offer_number = present(self.document_number.as_deref())
                    .ok_or(DocumentError::missing_key("offer", "document_number"))?
                    .to_string();
                let total = self.total.unwrap_or_default();
                batch.offers.push(Offer {
                    offer_number,
                    customer,
                    total_amount: total.amount,
                    currency: total
                        .currency
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                    issued_at: self.issue_date,
                });
            }
            DocumentType::Receipt => {
                let receipt_number = present(self.document_number.as_deref())
                    .ok_or(DocumentError::missing_key("receipt", "document_number"))?
                    .to_string();
                batch.receipts.push(Receipt {
                    receipt_number,
                    customer,
                    total_amount: self.total.and_then(|t| t.amount),
                    vat_amount: self.tax.and_then(|t| t.amount),
                    issued_at: self.issue_date,
                });
            }
        }
        Ok(batch)
    }
}
