//! Ordered, case-insensitive field rules for offer/invoice style text.
//!
//! Each rule is independent: it looks at the whole text, the first match
//! wins, and its capture group is post-processed into the field value. The
//! table order is the order fields are reported in and is kept stable so
//! results are reproducible.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::amount::parse_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    OrganizationNumber,
    Date,
    Vat,
    Total,
    OfferNumber,
    ValidUntil,
    Email,
    Phone,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::OrganizationNumber => "organization_number",
            Field::Date => "date",
            Field::Vat => "vat",
            Field::Total => "total",
            Field::OfferNumber => "offer_number",
            Field::ValidUntil => "valid_until",
            Field::Email => "email",
            Field::Phone => "phone",
        }
    }
}

/// One `(field, pattern, post-process)` entry of the rule table.
pub struct FieldRule {
    pub field: Field,
    pub pattern: Regex,
    pub post: fn(&str) -> String,
}

impl FieldRule {
    fn new(field: Field, pattern: &str, post: fn(&str) -> String) -> Self {
        let pattern = Regex::new(pattern).expect("field rule pattern must compile");
        Self {
            field,
            pattern,
            post,
        }
    }

    /// Value of the first match, post-processed. Empty results count as no match.
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let raw = caps.get(1)?.as_str();
        let value = (self.post)(raw);
        (!value.is_empty()).then_some(value)
    }
}

impl core::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldRule")
            .field("field", &self.field)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

fn trimmed(raw: &str) -> String {
    raw.trim().to_string()
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

static RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::new(
            Field::OrganizationNumber,
            r"(?i)(?:Org\.?\s*nr|Orgnummer)\s*[:\s]*([0-9]{6}-[0-9]{4}|[0-9]{10})",
            trimmed,
        ),
        FieldRule::new(
            Field::Date,
            r"(?i)\b(20\d{2}[-/.]\d{2}[-/.]\d{2}|[0-3]?\d[-/.][01]?\d[-/.]20\d{2})\b",
            trimmed,
        ),
        FieldRule::new(
            Field::Vat,
            r"(?i)(?:Moms|Mervärdesskatt|VAT)\s*[:\s]*([0-9.,]+)\s*%?",
            trimmed,
        ),
        FieldRule::new(
            Field::Total,
            r"(?i)(?:Summa|Att\s*betala|Total)\s*[:\s]*([0-9.,]+)\s*(?:SEK|kr)?",
            trimmed,
        ),
        FieldRule::new(
            Field::OfferNumber,
            r"(?i)Offert(?:nr|nummer)?\s*[:#]?\s*([A-Za-z0-9-]+)",
            trimmed,
        ),
        FieldRule::new(
            Field::ValidUntil,
            r"(?i)Giltig(?:t)?\s*t\.?o\.?m\.?\s*[:\s]*([0-9./-]+)",
            trimmed,
        ),
        FieldRule::new(
            Field::Email,
            r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})",
            trimmed,
        ),
        FieldRule::new(
            Field::Phone,
            r"((?:\+46|0)\s?\d[\d\s\-]{6,})",
            collapse_whitespace,
        ),
    ]
});

/// The rule table, in evaluation order.
pub fn rules() -> &'static [FieldRule] {
    &RULES
}

/// Fields recovered from one text. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub organization_number: Option<String>,
    pub date: Option<String>,
    /// `date` rewritten as `YYYY-MM-DD` when it is a real calendar date.
    pub date_iso: Option<String>,
    pub vat: Option<String>,
    pub total: Option<String>,
    pub offer_number: Option<String>,
    pub valid_until: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::OrganizationNumber => &self.organization_number,
            Field::Date => &self.date,
            Field::Vat => &self.vat,
            Field::Total => &self.total,
            Field::OfferNumber => &self.offer_number,
            Field::ValidUntil => &self.valid_until,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::OrganizationNumber => &mut self.organization_number,
            Field::Date => &mut self.date,
            Field::Vat => &mut self.vat,
            Field::Total => &mut self.total,
            Field::OfferNumber => &mut self.offer_number,
            Field::ValidUntil => &mut self.valid_until,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
        }
    }

    /// Numeric value of `total`, if it parses.
    pub fn total_amount(&self) -> Option<f64> {
        self.total.as_deref().and_then(parse_amount)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Runs every rule over `text`.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for rule in rules() {
        *fields.slot_mut(rule.field) = rule.apply(text);
    }
    fields.date_iso = fields
        .date
        .as_deref()
        .and_then(normalize_date)
        .map(|d| d.format("%Y-%m-%d").to_string());
    fields
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];

/// Parses the date shapes the `date` rule accepts.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_number_and_total() {
        let fields = extract_fields("Org nr: 556677-8899\nTotal: 1234,50 SEK");
        assert_eq!(fields.organization_number.as_deref(), Some("556677-8899"));
        assert!(fields.total.as_deref().unwrap().contains("1234,50"));
        assert_eq!(fields.total_amount(), Some(1234.5));
    }

    #[test]
    fn labels_are_case_insensitive() {
        let fields = extract_fields("ORGNUMMER 5566778899\natt betala: 99,00 kr");
        assert_eq!(fields.organization_number.as_deref(), Some("5566778899"));
        assert_eq!(fields.total.as_deref(), Some("99,00"));
    }

    #[test]
    fn first_match_wins() {
        let fields = extract_fields("Summa: 10,00\nTotal: 20,00");
        assert_eq!(fields.total.as_deref(), Some("10,00"));
    }

    #[test]
    fn offer_header_fields() {
        let text = "Offertnr: OFF-1001\nDatum 2024-03-01\nGiltig t.o.m. 2024-04-01\nMoms 25%";
        let fields = extract_fields(text);
        assert_eq!(fields.offer_number.as_deref(), Some("OFF-1001"));
        assert_eq!(fields.date.as_deref(), Some("2024-03-01"));
        assert_eq!(fields.date_iso.as_deref(), Some("2024-03-01"));
        assert_eq!(fields.valid_until.as_deref(), Some("2024-04-01"));
        assert_eq!(fields.vat.as_deref(), Some("25"));
    }

    #[test]
    fn day_month_year_dates_get_an_iso_form() {
        let fields = extract_fields("Utfärdad 5.3.2024");
        assert_eq!(fields.date.as_deref(), Some("5.3.2024"));
        assert_eq!(fields.date_iso.as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn impossible_dates_keep_raw_value_only() {
        let fields = extract_fields("2024-13-45");
        assert_eq!(fields.date.as_deref(), Some("2024-13-45"));
        assert_eq!(fields.date_iso, None);
    }

    #[test]
    fn contact_rules() {
        let fields = extract_fields("Kontakt: info@acme.se\nTel +46 70 123 45 67");
        assert_eq!(fields.email.as_deref(), Some("info@acme.se"));
        assert_eq!(fields.phone.as_deref(), Some("+46 70 123 45 67"));
    }

    #[test]
    fn nothing_matches_in_unrelated_text() {
        assert!(extract_fields("hello world").is_empty());
    }

    #[test]
    fn table_order_is_stable() {
        let order: Vec<_> = rules().iter().map(|r| r.field).collect();
        assert_eq!(order.first(), Some(&Field::OrganizationNumber));
        assert_eq!(order.len(), 8);
        assert_eq!(rules()[3].field.as_str(), "total");
    }
}
