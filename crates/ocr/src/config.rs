use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse parser config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid parser config: {0}")]
    Invalid(String),
    #[error("Invalid noise pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Keyword sets and tuning knobs for receipt parsing. Every field is optional in TOML;
/// missing ones take the reference defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub subtotal_keywords: Vec<String>,
    pub tax_keywords: Vec<String>,
    pub total_keywords: Vec<String>,
    /// Lines whose leading text has a word starting with one of these are never items.
    pub noise_keywords: Vec<String>,
    /// Minimum similarity ratio for a fuzzy keyword match.
    pub similarity_threshold: f64,
    /// Line clustering tolerance, in multiples of the median token height.
    pub height_factor: f64,
    /// Token height assumed when none can be measured.
    pub fallback_height: f64,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            subtotal_keywords: strings(&["subtotal", "sub total"]),
            tax_keywords: strings(&["sales tax", "tax", "gst", "vat"]),
            total_keywords: strings(&["grand total", "total amount", "total"]),
            noise_keywords: strings(&[
                "qty", "item", "price", "order", "visa", "sale", "host", "cash", "card",
                "payment", "authorization", "approved", "reader",
            ]),
            similarity_threshold: 0.65,
            height_factor: 1.6,
            fallback_height: 12.0,
        }
    }
}

impl ParserConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ParserConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(self.height_factor.is_finite() && self.height_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "height_factor must be positive, got {}",
                self.height_factor
            )));
        }
        if !(self.fallback_height.is_finite() && self.fallback_height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fallback_height must be positive, got {}",
                self.fallback_height
            )));
        }
        for (name, set) in [
            ("subtotal_keywords", &self.subtotal_keywords),
            ("tax_keywords", &self.tax_keywords),
            ("total_keywords", &self.total_keywords),
        ] {
            if set.iter().all(|kw| kw.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}
