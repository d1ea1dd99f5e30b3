use serde::Serialize;
use thiserror::Error;

use crate::extract::ReceiptParser;
use crate::layout;
use crate::preprocess;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{ParsedReceipt, Token};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Raw tokens as recognized by the backend.
    pub tokens: Vec<Token>,
    /// Reassembled line texts, top to bottom.
    pub lines: Vec<String>,
    /// Structured fields extracted from the tokens.
    pub receipt: ParsedReceipt,
}

/// Orchestrates: preprocess → OCR → line assembly → extraction.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    parser: ReceiptParser,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, parser: ReceiptParser) -> Self {
        Self { recognizer, parser }
    }

    pub fn backend_name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn parser(&self) -> &ReceiptParser {
        &self.parser
    }

    /// Process raw image bytes (from an upload or a file read). CPU-bound; async
    /// callers should run it on a blocking thread.
    pub fn process_bytes(&self, data: &[u8]) -> Result<OcrResult, PipelineError> {
        let image_bytes = preprocess::prepare_for_ocr_from_bytes(data)?;

        let tokens = self.recognizer.recognize(&image_bytes)?;
        tracing::debug!(backend = self.recognizer.name(), tokens = tokens.len(), "recognized");

        let config = self.parser.config();
        let lines = layout::group_into_lines(&tokens, config.height_factor, config.fallback_height)
            .into_iter()
            .map(|l| l.text)
            .collect();
        let receipt = self.parser.parse_tokens(&tokens);

        Ok(OcrResult { tokens, lines, receipt })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
