use serde::{Deserialize, Deserializer, Serialize};

pub type Point = (f64, f64);

/// One OCR-recognized text span with its quadrilateral box.
///
/// Deserializes from the OCR dump shape `{"text", "confidence", "box": [[x, y]; 4]}`.
/// Confidence is clamped into `[0, 1]` on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    #[serde(rename = "box", alias = "bbox", alias = "corners")]
    pub corners: [Point; 4],
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f64, corners: [Point; 4]) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_unit(confidence),
            corners,
        }
    }

    /// Axis-aligned box with top-left corner `(x, y)`.
    pub fn from_rect(
        text: impl Into<String>,
        confidence: f64,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self::new(
            text,
            confidence,
            [
                (x, y),
                (x + width, y),
                (x + width, y + height),
                (x, y + height),
            ],
        )
    }

    pub fn center(&self) -> Point {
        let (sum_x, sum_y) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        (sum_x / 4.0, sum_y / 4.0)
    }

    pub fn min_x(&self) -> f64 {
        self.corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min)
    }

    pub fn max_x(&self) -> f64 {
        self.corners
            .iter()
            .map(|p| p.0)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_y(&self) -> f64 {
        self.corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min)
    }

    pub fn max_y(&self) -> f64 {
        self.corners
            .iter()
            .map(|p| p.1)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    /// A box with a non-finite coordinate or no area.
    pub fn is_degenerate(&self) -> bool {
        let non_finite = self
            .corners
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite());
        non_finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Uppercased text with all whitespace removed.
    pub fn normalized_text(&self) -> String {
        normalize_code_text(&self.text)
    }
}

pub fn normalize_code_text(text: &str) -> String {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_unit(value))
}
