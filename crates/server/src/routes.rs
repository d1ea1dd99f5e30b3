//! Receipt endpoints

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use billsplit_ocr::{ParsedReceipt, Token};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/receipt/parse", post(parse_image))
        .route("/receipt/tokens", post(parse_tokens))
        .route("/receipt/lines", post(parse_lines))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend_name().map(str::to_string),
    })
}

/// Multipart upload in a field named `file` (or `image`).
async fn parse_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParsedReceipt>> {
    let pipeline = state
        .pipeline
        .clone()
        .ok_or_else(|| AppError::OcrUnavailable("no OCR backend configured".to_string()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if matches!(field.name(), Some("file" | "image")) {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
            upload = Some(data);
            break;
        }
    }

    let data = upload
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("No image provided".to_string()))?;

    let result = tokio::task::spawn_blocking(move || pipeline.process_bytes(&data))
        .await
        .map_err(|e| AppError::Internal(format!("OCR task failed: {e}")))??;

    tracing::info!(
        tokens = result.tokens.len(),
        items = result.receipt.items.len(),
        total = %result.receipt.total,
        "Parsed receipt image"
    );
    Ok(Json(result.receipt))
}

async fn parse_tokens(
    State(state): State<AppState>,
    Json(tokens): Json<Vec<Token>>,
) -> Result<Json<ParsedReceipt>> {
    let parser = state.parser.clone();
    let receipt = tokio::task::spawn_blocking(move || parser.parse_tokens(&tokens))
        .await
        .map_err(|e| AppError::Internal(format!("Parse task failed: {e}")))?;
    Ok(Json(receipt))
}

#[derive(Debug, Deserialize)]
pub struct LinesRequest {
    pub lines: Vec<String>,
}

async fn parse_lines(
    State(state): State<AppState>,
    Json(body): Json<LinesRequest>,
) -> Result<Json<ParsedReceipt>> {
    let parser = state.parser.clone();
    let receipt = tokio::task::spawn_blocking(move || parser.parse_lines(&body.lines))
        .await
        .map_err(|e| AppError::Internal(format!("Parse task failed: {e}")))?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use billsplit_ocr::{MockRecognizer, OcrBackend, ReceiptParser};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "billsplit-test-boundary";

    fn app_with(backend: Option<Box<dyn OcrBackend>>) -> Router {
        let state = AppState::new(ReceiptParser::default(), backend);
        crate::app(state, &ServerConfig::default())
    }

    fn mock_app() -> Router {
        app_with(Some(Box::new(MockRecognizer::from_lines(&[
            "Burger 12.50",
            "Fries 4.00",
            "Subtotal 16.50",
            "Tax 1.32",
            "Total 17.82",
        ]))))
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |x, _| Luma([60 * x as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn multipart_request(field: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"receipt.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/receipt/parse")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let (status, body) = send(mock_app(), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "mock");

        let (_, body) = send(app_with(None), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(body["backend"], Value::Null);
    }

    #[tokio::test]
    async fn parse_image_returns_receipt() {
        let (status, body) = send(mock_app(), multipart_request("file", &tiny_png())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "items": [
                    {"name": "Burger", "price": 12.5},
                    {"name": "Fries", "price": 4.0}
                ],
                "subtotal": 16.5,
                "tax": 1.32,
                "total": 17.82
            })
        );
    }

    #[tokio::test]
    async fn image_field_name_is_accepted() {
        let (status, body) = send(mock_app(), multipart_request("image", &tiny_png())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 17.82);
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let (status, body) = send(mock_app(), multipart_request("notes", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn undecodable_image_is_unprocessable() {
        let (status, body) = send(mock_app(), multipart_request("file", b"not a picture")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "unreadable_image");
    }

    #[tokio::test]
    async fn no_backend_is_service_unavailable() {
        let (status, body) = send(app_with(None), multipart_request("file", &tiny_png())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "ocr_unavailable");
    }

    #[tokio::test]
    async fn tokens_endpoint_parses_geometry() {
        let tokens = json!([
            {"quad": [[0, 0], [60, 0], [60, 20], [0, 20]], "text": "Coffee", "confidence": 0.9},
            {"quad": [[200, 2], [240, 2], [240, 22], [200, 22]], "text": "3.50", "confidence": 0.9},
            {"quad": [[0, 60], [50, 60], [50, 80], [0, 80]], "text": "Total", "confidence": 0.9},
            {"quad": [[200, 61], [240, 61], [240, 81], [200, 81]], "text": "3.50", "confidence": 0.9}
        ]);
        let (status, body) = send(app_with(None), json_request("/receipt/tokens", tokens)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([{"name": "Coffee", "price": 3.5}]));
        assert_eq!(body["total"], 3.5);
    }

    #[tokio::test]
    async fn lines_endpoint_parses_text() {
        let req = json_request("/receipt/lines", json!({"lines": ["Tea 2.00", "TOTAL 2.00"]}));
        let (status, body) = send(app_with(None), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2.0);
        assert_eq!(body["subtotal"], 2.0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let req = Request::post("/receipt/lines")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"lines\": 5}"))
            .unwrap();
        let resp = mock_app().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
