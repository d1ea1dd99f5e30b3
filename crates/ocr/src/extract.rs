use billsplit_core::Money;
use regex::Regex;

use crate::amount;
use crate::config::{ConfigError, ParserConfig};
use crate::fuzzy::{best_similarity, contains_keyword, normalize_letters};
use crate::layout;
use crate::types::{Item, ParsedReceipt, Token};

/// What a receipt line stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Subtotal,
    Tax,
    Total,
    /// A purchase row, a header, or noise.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordMatch {
    /// Substring or similarity on letters only; tolerates OCR corruption.
    Fuzzy,
    /// Case-insensitive substring; used when only plain text lines are available.
    Exact,
}

/// A row of receipt text with its rightmost amount split off.
#[derive(Debug, Clone)]
struct ReceiptLine {
    /// Text before the amount, or the whole line when there is none.
    leading: String,
    amount: Option<Money>,
    y_center: f64,
}

impl ReceiptLine {
    fn new(text: &str, y_center: f64) -> Self {
        let found = amount::last_amount(text).and_then(|m| m.value().map(|v| (m.start, v)));
        match found {
            Some((start, value)) => Self {
                leading: trim_separators(&text[..start]).to_string(),
                amount: Some(value),
                y_center,
            },
            None => Self { leading: text.trim().to_string(), amount: None, y_center },
        }
    }
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '.' | ',' | '*' | '=' | '|' | '@'))
}

// ── Public parsing API ────────────────────────────────────────────────────────

/// Turns OCR output into a [`ParsedReceipt`]. Immutable once built, so one parser
/// can serve any number of concurrent parse calls.
#[derive(Debug, Clone)]
pub struct ReceiptParser {
    config: ParserConfig,
    noise: Option<Regex>,
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new(ParserConfig::default()).expect("default parser config is valid")
    }
}

impl ReceiptParser {
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let words: Vec<String> = config
            .noise_keywords
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        let noise = if words.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)\b(?:{})", words.join("|")))?)
        };
        Ok(Self { config, noise })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Position-aware parse of raw OCR tokens. Never fails: an empty or hopeless
    /// token set produces an all-zero receipt with no items.
    pub fn parse_tokens(&self, tokens: &[Token]) -> ParsedReceipt {
        let lines: Vec<ReceiptLine> =
            layout::group_into_lines(tokens, self.config.height_factor, self.config.fallback_height)
                .iter()
                .map(|l| ReceiptLine::new(&l.text, l.y_center))
                .collect();
        self.assemble(&lines, KeywordMatch::Fuzzy)
    }

    /// Degraded parse for text that already comes split into lines (no boxes).
    /// Keywords must appear verbatim (case-insensitive).
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> ParsedReceipt {
        let lines: Vec<ReceiptLine> = lines
            .iter()
            .enumerate()
            .map(|(idx, l)| ReceiptLine::new(l.as_ref(), idx as f64))
            .collect();
        self.assemble(&lines, KeywordMatch::Exact)
    }

    /// Classify the label part of a line under OCR noise.
    pub fn classify(&self, leading: &str) -> LineKind {
        self.classify_with(leading, KeywordMatch::Fuzzy)
    }

    fn keyword_sets(&self) -> [(LineKind, &[String]); 3] {
        [
            (LineKind::Subtotal, self.config.subtotal_keywords.as_slice()),
            (LineKind::Tax, self.config.tax_keywords.as_slice()),
            (LineKind::Total, self.config.total_keywords.as_slice()),
        ]
    }

    fn classify_with(&self, leading: &str, mode: KeywordMatch) -> LineKind {
        let sets = self.keyword_sets();
        match mode {
            KeywordMatch::Exact => {
                let lower = leading.to_lowercase();
                sets.iter()
                    .find(|(_, kws)| {
                        kws.iter().any(|kw| {
                            let kw = kw.trim().to_lowercase();
                            !kw.is_empty() && lower.contains(&kw)
                        })
                    })
                    .map_or(LineKind::Other, |(kind, _)| *kind)
            }
            KeywordMatch::Fuzzy => {
                let normalized = normalize_letters(leading);
                if normalized.is_empty() {
                    return LineKind::Other;
                }
                // A keyword spelled out in full decides on its own, in priority order.
                if let Some((kind, _)) = sets.iter().find(|(_, kws)| contains_keyword(&normalized, *kws)) {
                    return *kind;
                }
                // Otherwise the closest set wins; "total" is closer to itself than
                // to "subtotal".
                let mut best: Option<(LineKind, f64)> = None;
                for (kind, kws) in sets {
                    let score = best_similarity(&normalized, kws);
                    if score >= self.config.similarity_threshold && best.map_or(true, |(_, b)| score > b) {
                        best = Some((kind, score));
                    }
                }
                best.map_or(LineKind::Other, |(kind, _)| kind)
            }
        }
    }

    fn is_noise(&self, leading: &str) -> bool {
        self.noise.as_ref().is_some_and(|re| re.is_match(leading))
    }

    fn assemble(&self, lines: &[ReceiptLine], mode: KeywordMatch) -> ParsedReceipt {
        let mut receipt = ParsedReceipt::empty();
        let kinds: Vec<LineKind> = lines.iter().map(|l| self.classify_with(&l.leading, mode)).collect();

        // Later lines restate earlier ones, so the last labelled amount wins.
        for (line, kind) in lines.iter().zip(&kinds) {
            let Some(value) = line.amount else { continue };
            match kind {
                LineKind::Subtotal => receipt.subtotal = value,
                LineKind::Tax => receipt.tax = value,
                LineKind::Total => receipt.total = value,
                LineKind::Other => {}
            }
        }

        let unlabelled = || {
            lines
                .iter()
                .zip(&kinds)
                .filter(|(_, kind)| **kind == LineKind::Other)
                .filter_map(|(line, _)| line.amount.map(|value| (line, value)))
        };

        if receipt.total.is_zero() {
            // Largest unlabelled amount; on a tie the one lower on the page.
            if let Some((line, value)) = unlabelled()
                .max_by(|(a, av), (b, bv)| av.cmp(bv).then(a.y_center.total_cmp(&b.y_center)))
            {
                tracing::debug!(total = %value, y = line.y_center, "no total line, using largest amount");
                receipt.total = value;
            }
        }

        receipt.items = unlabelled()
            .filter(|(line, _)| !line.leading.is_empty())
            .filter(|(line, _)| line.leading.chars().any(char::is_alphabetic))
            .filter(|(line, _)| !self.is_noise(&line.leading))
            .map(|(line, value)| Item { name: line.leading.clone(), price: value })
            .collect();

        receipt.reconcile();

        tracing::debug!(
            lines = lines.len(),
            items = receipt.items.len(),
            subtotal = %receipt.subtotal,
            tax = %receipt.tax,
            total = %receipt.total,
            "parsed receipt"
        );
        receipt
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
