use billsplit_core::Money;
use serde::{Deserialize, Serialize};

/// A planar point in image coordinates. Serialized as `[x, y]`, the shape OCR
/// engines emit for box corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// One recognized text fragment as handed over by an OCR backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Bounding quadrilateral, normally four corners.
    pub quad: Vec<Point>,
    pub text: String,
    /// Recognition confidence (0.0–1.0). Informational only.
    #[serde(default)]
    pub confidence: f32,
}

impl Token {
    pub fn new(quad: Vec<Point>, text: impl Into<String>, confidence: f32) -> Self {
        Self { quad, text: text.into(), confidence }
    }

    /// Axis-aligned token: `(left, top)` corner plus width and height.
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64, text: impl Into<String>, confidence: f32) -> Self {
        let quad = vec![
            Point::new(left, top),
            Point::new(left + width, top),
            Point::new(left + width, top + height),
            Point::new(left, top + height),
        ];
        Self::new(quad, text, confidence)
    }

    /// The quad's points, or `None` when the quad is empty or holds non-finite coordinates.
    fn usable_quad(&self) -> Option<&[Point]> {
        let finite = self.quad.iter().all(|p| p.x.is_finite() && p.y.is_finite());
        (!self.quad.is_empty() && finite).then_some(self.quad.as_slice())
    }

    /// Whether the quad places the token anywhere on the page.
    pub fn has_position(&self) -> bool {
        self.usable_quad().is_some()
    }

    pub fn x_center(&self) -> f64 {
        self.usable_quad()
            .map(|q| q.iter().map(|p| p.x).sum::<f64>() / q.len() as f64)
            .unwrap_or(0.0)
    }

    pub fn y_center(&self) -> f64 {
        self.usable_quad()
            .map(|q| q.iter().map(|p| p.y).sum::<f64>() / q.len() as f64)
            .unwrap_or(0.0)
    }

    /// Vertical extent of the quad. `None` for degenerate geometry (empty,
    /// non-finite or zero-height quads).
    pub fn height(&self) -> Option<f64> {
        let q = self.usable_quad()?;
        let (min, max) = q
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), p| (mn.min(p.y), mx.max(p.y)));
        let h = max - min;
        (h > 0.0).then_some(h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: Money,
}

/// The structured result handed to consumers. Field names are part of the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub items: Vec<Item>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl ParsedReceipt {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fill zero subtotal/tax from the other known values. Never overwrites a
    /// non-zero field, so running it again is a no-op. A field whose derivation
    /// overflows stays zero.
    pub fn reconcile(&mut self) {
        if self.subtotal.is_zero() && !self.items.is_empty() {
            match Money::checked_sum(self.items.iter().map(|i| i.price)) {
                Some(sum) => self.subtotal = sum,
                None => tracing::debug!("item prices overflow, leaving subtotal unset"),
            }
        }
        if self.tax.is_zero()
            && !self.total.is_zero()
            && !self.subtotal.is_zero()
            && self.total > self.subtotal
        {
            if let Some(tax) = self.total.checked_sub(self.subtotal) {
                self.tax = tax;
            }
        }
    }
}
