//! Receipt OCR: from positioned text fragments to a structured receipt.

pub mod amount;
pub mod config;
pub mod extract;
pub mod fuzzy;
pub mod layout;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use amount::{extract_amount, normalize_literal, parse_amount};
pub use config::{ConfigError, ParserConfig};
pub use extract::{LineKind, ReceiptParser};
pub use fuzzy::fuzzy_contains;
pub use layout::{group_into_lines, Line};
pub use pipeline::{OcrResult, PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr_from_bytes, PreprocessError};
pub use recognizer::{select_backend, tokens_from_tsv, BackendKind, MockRecognizer, OcrBackend, OcrConfig, OcrError};
pub use types::{Item, ParsedReceipt, Point, Token};
