//! Recognition and normalization of monetary literals inside free OCR text.

use std::str::FromStr;
use std::sync::OnceLock;

use billsplit_core::Money;
use regex::Regex;
use rust_decimal::Decimal;

/// Optional currency glyph, then either a grouped literal (`1,234.56`, `1 234,56`)
/// or a plain one (`1234.56`). Both end in exactly two fractional digits.
fn re_amount() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)(?:[$€£₹]\s?)?(?:\d{1,3}(?:[.,\s]\d{3})*[.,]\d{2}|\d+[.,]\d{2})")
            .expect("invalid regex")
    })
}

/// A monetary literal located in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountMatch<'a> {
    /// Byte offset of the literal (including any currency glyph).
    pub start: usize,
    pub end: usize,
    pub literal: &'a str,
}

impl AmountMatch<'_> {
    pub fn value(&self) -> Option<Money> {
        parse_amount(self.literal)
    }
}

/// All monetary literals in left-to-right scan order.
///
/// A literal may not start right after a word character, so digit runs inside
/// identifiers such as `A12.50` or `SKU4411.20` are skipped.
pub fn find_amounts(text: &str) -> Vec<AmountMatch<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(m) = re_amount().find_at(text, pos) else {
            break;
        };
        if preceded_by_word_char(text, m.start()) {
            // Retry one character further on, the way a lookbehind would.
            pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        found.push(AmountMatch { start: m.start(), end: m.end(), literal: m.as_str() });
        pos = m.end();
    }
    found
}

/// The rightmost monetary literal, if any.
pub fn last_amount(text: &str) -> Option<AmountMatch<'_>> {
    find_amounts(text).pop()
}

/// Value of the rightmost monetary literal in `text`. Receipts print prices after
/// item names and totals after their labels, so the last literal wins.
pub fn extract_amount(text: &str) -> Option<Money> {
    last_amount(text)?.value()
}

/// Canonical numeric spelling of a literal: only digits and a `.` decimal point.
///
/// - commas only: a single comma followed by one or two digits is a decimal
///   comma (`12,34` -> `12.34`); otherwise commas are grouping (`1,234` -> `1234`)
/// - commas and dots: commas are grouping, the dot is decimal
pub fn normalize_literal(literal: &str) -> String {
    let cleaned: String = literal
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let commas = cleaned.matches(',').count();
    if commas == 0 {
        return cleaned;
    }
    if !cleaned.contains('.') && commas == 1 {
        if let Some((_, frac)) = cleaned.split_once(',') {
            if (1..=2).contains(&frac.len()) && frac.chars().all(|c| c.is_ascii_digit()) {
                return cleaned.replace(',', ".");
            }
        }
    }
    cleaned.replace(',', "")
}

/// Parse a literal into money. Anything that does not normalize to a number is
/// `None`; amount extraction is advisory and never fails loudly.
pub fn parse_amount(literal: &str) -> Option<Money> {
    let normalized = normalize_literal(literal);
    Decimal::from_str(&normalized).ok().map(Money::from_decimal)
}

fn preceded_by_word_char(text: &str, at: usize) -> bool {
    text[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}
