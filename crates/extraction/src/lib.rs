//! `paperflow-extraction`: best-effort field recovery from recognized text.
//!
//! Two strategies live here, and callers pick exactly one per input:
//!
//! - [`rules`]: an ordered table of case-insensitive patterns for offer and
//!   invoice style documents (organization number, dates, VAT, totals...).
//! - [`receipt`]: a line-walking heuristic that guesses company, total and VAT
//!   on a shop receipt.
//!
//! Neither is a validator. Missing fields are `None`, and no cross-field
//! consistency is checked.

pub mod amount;
pub mod receipt;
pub mod rules;

pub use amount::{decimal_tokens, normalize_decimal_token, parse_amount};
pub use receipt::{ReceiptSummary, summarize_receipt};
pub use rules::{ExtractedFields, Field, FieldRule, extract_fields, rules};
