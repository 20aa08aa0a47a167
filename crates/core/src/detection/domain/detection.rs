use super::bounding_box::BoundingBox;

/// One class guess for a detected object.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub index: i32,
    pub score: f32,
    pub category_name: String,
    pub display_name: Option<String>,
}

impl Category {
    pub fn new(index: i32, category_name: impl Into<String>, score: f32) -> Self {
        Self {
            index,
            score,
            category_name: category_name.into(),
            display_name: None,
        }
    }

    /// Preferred human-readable name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.category_name)
    }

    /// Confidence as a whole percentage, rounded to nearest.
    pub fn percent(&self) -> u32 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// A single detected object: location plus ranked class guesses.
///
/// Both parts are optional because detector backends are allowed to omit
/// them; consumers decide what to do with partial results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    pub bounding_box: Option<BoundingBox>,
    pub categories: Vec<Category>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<Category>) -> Self {
        Self {
            bounding_box: Some(bounding_box),
            categories,
        }
    }

    /// Highest-ranked category; backends return categories sorted by score.
    pub fn top_category(&self) -> Option<&Category> {
        self.categories.first()
    }

    pub fn top_score(&self) -> f32 {
        self.top_category().map_or(0.0, |c| c.score)
    }
}

/// Detections produced for one frame. Not retained across frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}
