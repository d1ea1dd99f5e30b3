use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Largest side handed to the OCR engine.
const MAX_SIDE: u32 = 2800;

/// Process raw image bytes (JPEG / PNG / WEBP / …) and return normalized PNG bytes.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img))
}

/// Grayscale + histogram equalization.
fn normalize(img: DynamicImage) -> DynamicImage {
    let img = if img.width() > MAX_SIDE || img.height() > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();
    match equalize(&gray) {
        Some(eq) => DynamicImage::ImageLuma8(eq),
        // Uniform image: nothing to spread.
        None => DynamicImage::ImageLuma8(gray),
    }
}

/// Spread the intensity histogram over the full range. `None` when every pixel
/// has the same value.
fn equalize(gray: &GrayImage) -> Option<GrayImage> {
    let mut levels = gray.pixels().map(|p| p[0]);
    let first = levels.next()?;
    if levels.all(|v| v == first) {
        return None;
    }
    Some(equalize_histogram(gray))
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
