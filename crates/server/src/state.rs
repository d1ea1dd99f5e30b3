use std::sync::Arc;

use billsplit_ocr::{OcrBackend, ReceiptParser, ReceiptPipeline};

pub type Pipeline = ReceiptPipeline<Box<dyn OcrBackend>>;

/// Shared handler state. `pipeline` is `None` when no OCR backend could be
/// initialized; the text endpoints keep working through `parser`.
#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<ReceiptParser>,
    pub pipeline: Option<Arc<Pipeline>>,
}

impl AppState {
    pub fn new(parser: ReceiptParser, backend: Option<Box<dyn OcrBackend>>) -> Self {
        let pipeline = backend.map(|b| Arc::new(ReceiptPipeline::new(b, parser.clone())));
        Self { parser: Arc::new(parser), pipeline }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.pipeline.as_deref().map(|p| p.backend_name())
    }
}
