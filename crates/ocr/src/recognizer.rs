use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Token;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR backend '{0}' not available")]
    NotAvailable(String),
    #[error("No OCR backend available (tried: {0})")]
    NoBackend(String),
}

/// Abstraction over an OCR engine.
/// Implementations accept raw PNG/JPEG image bytes and return positioned text fragments.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Token>, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Token>, OcrError> {
        (**self).recognize(image_bytes)
    }
}

// ── Backend selection ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Tesseract,
    Mock,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Tesseract => write!(f, "tesseract"),
            BackendKind::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Backends to try, in order. The first one that initializes is used.
    pub backends: Vec<BackendKind>,
    pub tesseract_data_path: Option<String>,
    pub tesseract_lang: String,
    /// Text the `mock` backend answers with, one entry per printed line.
    pub mock_lines: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::Tesseract],
            tesseract_data_path: None,
            tesseract_lang: "eng".to_string(),
            mock_lines: Vec::new(),
        }
    }
}

/// Walk the configured fallback chain once (at startup) and return the first
/// backend that can be constructed.
pub fn select_backend(config: &OcrConfig) -> Result<Box<dyn OcrBackend>, OcrError> {
    for kind in &config.backends {
        match build_backend(*kind, config) {
            Ok(backend) => {
                tracing::info!(backend = %kind, "OCR backend selected");
                return Ok(backend);
            }
            Err(e) => tracing::warn!(backend = %kind, "OCR backend unavailable: {e}"),
        }
    }
    let tried = config.backends.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ");
    Err(OcrError::NoBackend(tried))
}

fn build_backend(kind: BackendKind, config: &OcrConfig) -> Result<Box<dyn OcrBackend>, OcrError> {
    match kind {
        BackendKind::Mock => Ok(Box::new(MockRecognizer::from_lines(&config.mock_lines))),
        #[cfg(feature = "tesseract")]
        BackendKind::Tesseract => Ok(Box::new(tesseract_backend::TesseractRecognizer::probe(
            config.tesseract_data_path.clone(),
            &config.tesseract_lang,
        )?)),
        #[cfg(not(feature = "tesseract"))]
        BackendKind::Tesseract => Err(OcrError::NotAvailable(
            "tesseract (build with the `tesseract` feature)".to_string(),
        )),
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set token list, useful for exercising the parsing pipeline
/// without an OCR engine installed.
pub struct MockRecognizer {
    pub tokens: Vec<Token>,
}

impl MockRecognizer {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Lay `lines` out as a printed receipt: one token per word, one row per line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        const ROW_PITCH: f64 = 40.0;
        const GLYPH_HEIGHT: f64 = 20.0;
        const GLYPH_WIDTH: f64 = 10.0;

        let mut tokens = Vec::new();
        for (row, line) in lines.iter().enumerate() {
            let top = row as f64 * ROW_PITCH;
            let mut left = 0.0;
            for word in line.as_ref().split_whitespace() {
                let width = word.chars().count() as f64 * GLYPH_WIDTH;
                tokens.push(Token::from_rect(left, top, width, GLYPH_HEIGHT, word, 1.0));
                left += width + GLYPH_WIDTH;
            }
        }
        Self { tokens }
    }
}

impl OcrBackend for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<Token>, OcrError> {
        Ok(self.tokens.clone())
    }
}

// ── Tesseract TSV ─────────────────────────────────────────────────────────────

/// Tesseract's page-iterator level for single words.
const TSV_WORD_LEVEL: &str = "5";

/// Convert Tesseract TSV output into word tokens. Only word-level rows with text are
/// kept; malformed rows are skipped. Confidence is rescaled from 0–100 to 0–1.
pub fn tokens_from_tsv(tsv: &str) -> Vec<Token> {
    tsv.lines()
        .filter_map(|row| {
            let cols: Vec<&str> = row.splitn(12, '\t').collect();
            if cols.len() < 12 || cols[0] != TSV_WORD_LEVEL {
                return None;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                return None;
            }
            let left: f64 = cols[6].parse().ok()?;
            let top: f64 = cols[7].parse().ok()?;
            let width: f64 = cols[8].parse().ok()?;
            let height: f64 = cols[9].parse().ok()?;
            let conf: f32 = cols[10].parse().ok()?;
            Some(Token::from_rect(left, top, width, height, text, (conf / 100.0).clamp(0.0, 1.0)))
        })
        .collect()
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{tokens_from_tsv, OcrBackend, OcrError};
    use crate::types::Token;
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }

        /// Build the recognizer only if Tesseract can load the requested language data.
        pub fn probe(data_path: Option<String>, lang: &str) -> Result<Self, OcrError> {
            LepTess::new(data_path.as_deref(), lang)
                .map_err(|e| OcrError::NotAvailable(format!("tesseract: {e}")))?;
            Ok(Self::new(data_path, lang))
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn name(&self) -> &str {
            "tesseract"
        }

        fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Token>, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let tsv = lt.get_tsv_text(0).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(tokens_from_tsv(&tsv))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_tokens() {
        let r = MockRecognizer::new(vec![Token::from_rect(0.0, 0.0, 40.0, 12.0, "VISA", 0.9)]);
        let tokens = r.recognize(b"fake image data").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "VISA");
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockRecognizer::from_lines(&["hello"]);
        assert_eq!(r.recognize(b"anything").unwrap(), r.recognize(b"").unwrap());
    }

    #[test]
    fn from_lines_lays_out_rows() {
        let r = MockRecognizer::from_lines(&["Coffee 3.50", "Total 3.50"]);
        assert_eq!(r.tokens.len(), 4);
        assert!(r.tokens[2].y_center() > r.tokens[0].y_center());
        assert!(r.tokens[1].x_center() > r.tokens[0].x_center());
        assert_eq!(r.tokens[0].height(), Some(20.0));
    }

    #[test]
    fn tsv_keeps_word_rows_only() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
                   4\t1\t1\t1\t1\t0\t20\t40\t200\t18\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t20\t40\t60\t18\t96.5\tCoffee\n\
                   5\t1\t1\t1\t1\t2\t180\t41\t40\t18\t91\t3.50\n\
                   5\t1\t1\t1\t1\t3\t240\t41\t40\t18\t95\t \n\
                   5\t1\t1\t1\t1\t4\tx\t41\t40\t18\t95\tbroken";
        let tokens = tokens_from_tsv(tsv);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "Coffee");
        assert_eq!(tokens[0].x_center(), 50.0);
        assert_eq!(tokens[0].height(), Some(18.0));
        assert!((tokens[0].confidence - 0.965).abs() < 1e-6);
        assert_eq!(tokens[1].text, "3.50");
    }

    #[test]
    fn mock_backend_selected_from_chain() {
        let config = OcrConfig {
            backends: vec![BackendKind::Mock],
            mock_lines: vec!["Total 1.00".into()],
            ..OcrConfig::default()
        };
        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.name(), "mock");
        assert_eq!(backend.recognize(b"").unwrap().len(), 2);
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn chain_falls_through_unavailable_backends() {
        let config = OcrConfig {
            backends: vec![BackendKind::Tesseract, BackendKind::Mock],
            ..OcrConfig::default()
        };
        assert_eq!(select_backend(&config).unwrap().name(), "mock");

        let config = OcrConfig { backends: vec![BackendKind::Tesseract], ..OcrConfig::default() };
        let err = select_backend(&config).err().unwrap();
        assert!(matches!(err, OcrError::NoBackend(ref tried) if tried == "tesseract"));
    }
}
