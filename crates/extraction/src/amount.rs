//! Monetary token handling.

use std::sync::LazyLock;

use regex::Regex;

/// Decimal-looking token as printed on receipts: `12,50`, `1234.00`.
pub static DECIMAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,4}[.,]\d{2})").expect("valid decimal token regex"));

/// Normalizes a `\d{1,4}[.,]\d{2}` token: the last two digits are the
/// fractional part, whichever separator was used.
pub fn normalize_decimal_token(token: &str) -> Option<f64> {
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 3 {
        return None;
    }
    let cents: u64 = digits.parse().ok()?;
    Some(cents as f64 / 100.0)
}

/// All decimal tokens in `text`, normalized, in order of appearance.
pub fn decimal_tokens(text: &str) -> Vec<f64> {
    DECIMAL_TOKEN
        .find_iter(text)
        .filter_map(|m| normalize_decimal_token(m.as_str()))
        .collect()
}

/// Parses a free-form amount such as `1 234,50`, `1.234,50` or `1234.5`.
///
/// The right-most separator followed by one or two digits is the decimal
/// separator. Every other separator is a thousands separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let decimal_at = cleaned
        .rfind([',', '.'])
        .filter(|&i| matches!(cleaned.len() - i - 1, 1 | 2));
    let mut normalized = String::with_capacity(cleaned.len());
    for (i, c) in cleaned.char_indices() {
        match c {
            ',' | '.' if Some(i) == decimal_at => normalized.push('.'),
            ',' | '.' => {}
            d => normalized.push(d),
        }
    }
    normalized.parse().ok()
}
