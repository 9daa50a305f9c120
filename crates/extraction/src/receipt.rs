//! Receipt heuristic: company, total and VAT from line-grouped text.
//!
//! Known-fragile by construction. The company is the first line that is not
//! boilerplate and has a letter in it; the total is the largest
//! monetary-looking number anywhere on the receipt.

use serde::{Deserialize, Serialize};

use crate::amount::{DECIMAL_TOKEN, decimal_tokens, normalize_decimal_token};

/// Lines containing any of these (lowercased) are never the company name.
pub const BOILERPLATE: &[&str] = &[
    "kvitto", "receipt", "total", "summa", "moms", "vat", "belopp", "inkl", "exkl",
];

/// Markers identifying the VAT line.
const VAT_MARKERS: &[&str] = &["moms", "vat"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    /// Empty when no candidate line was found.
    pub company: String,
    pub total: Option<f64>,
    pub vat: Option<f64>,
}

/// Summarizes a receipt from its recognized `lines` and the joined `raw_text`.
pub fn summarize_receipt<S: AsRef<str>>(lines: &[S], raw_text: &str) -> ReceiptSummary {
    ReceiptSummary {
        company: company_name(lines).unwrap_or_default(),
        total: largest_amount(raw_text),
        vat: vat_amount(raw_text),
    }
}

fn company_name<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| {
            let lower = line.to_lowercase();
            !BOILERPLATE.iter().any(|w| lower.contains(w))
        })
        .find(|line| line.chars().any(char::is_alphabetic))
        .map(|line| line.trim().to_string())
}

fn largest_amount(text: &str) -> Option<f64> {
    decimal_tokens(text).into_iter().reduce(f64::max)
}

fn vat_amount(text: &str) -> Option<f64> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            VAT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .find_map(|line| {
            DECIMAL_TOKEN
                .find(line)
                .and_then(|m| normalize_decimal_token(m.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn typical_receipt() {
        let text = "KVITTO\nICA Nära Centrum\nMjölk 12,90\nBröd 24,50\nMoms 12% 4,49\nTotalt 37,40";
        let summary = summarize_receipt(&lines(text), text);
        assert_eq!(summary.company, "ICA Nära Centrum");
        assert_eq!(summary.total, Some(37.4));
        assert_eq!(summary.vat, Some(4.49));
    }

    #[test]
    fn company_skips_lines_without_letters() {
        let text = "2024-03-01 12:00\n  Pressbyrån  \nSumma 45,00";
        let summary = summarize_receipt(&lines(text), text);
        assert_eq!(summary.company, "Pressbyrån");
    }

    #[test]
    fn largest_number_wins_even_when_it_is_not_the_total() {
        // Documented failure mode: a long article line beats the real total.
        let text = "Shop\nTV 4999,00\nTotal 100,00";
        let summary = summarize_receipt(&lines(text), text);
        assert_eq!(summary.total, Some(4999.0));
    }

    #[test]
    fn empty_input() {
        let summary = summarize_receipt::<&str>(&[], "");
        assert_eq!(summary, ReceiptSummary::default());
    }

    #[test]
    fn vat_line_without_amount_is_skipped() {
        let text = "Shop\nVAT included\nMoms 25,00\nTotal 125,00";
        let summary = summarize_receipt(&lines(text), text);
        assert_eq!(summary.vat, Some(25.0));
    }

    #[test]
    fn summary_serializes_with_null_amounts() {
        let text = "Bageriet\nKaffe";
        let summary = summarize_receipt(&lines(text), text);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value, json!({ "company": "Bageriet", "total": null, "vat": null }));
        let back: ReceiptSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back, summary);
    }
}
