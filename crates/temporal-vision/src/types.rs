//! Core data types for temporal change analysis.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A decoded raster image plus a stable identity fingerprint.
///
/// Immutable once constructed. The fingerprint covers dimensions and raw
/// pixel bytes and keys annotation cache entries, so identity follows the
/// pixels rather than any file path the image came from.
#[derive(Debug, Clone)]
pub struct SceneImage {
    image: DynamicImage,
    identity: u64,
}

impl SceneImage {
    pub fn new(image: DynamicImage) -> Self {
        let identity = fingerprint(&image);
        Self { image, identity }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channel_count(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Identity fingerprint used as the cache key for this image.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }
}

fn fingerprint(image: &DynamicImage) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.width().hash(&mut hasher);
    image.height().hash(&mut hasher);
    image.color().channel_count().hash(&mut hasher);
    image.as_bytes().hash(&mut hasher);
    hasher.finish()
}

/// Axis-aligned detection box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// A labeled, confidence-scored detection from the semantic annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounds: BoundingBox,
}

/// Bounding box and pixel-count area of one connected change component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub area: u32,
}

/// Per-label count change between the two images' detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCountDelta {
    pub label: String,
    pub count_before: u32,
    pub count_after: u32,
    pub delta: i64,
    pub percent_change: f64,
}

/// Fixed severity tiers over the similarity score.
///
/// Boundaries are half-open and contiguous: `[0, 0.30)` critical,
/// `[0.30, 0.60)` high, `[0.60, 0.85)` medium, `[0.85, ..]` low. Both the
/// report narrative and the programmatic severity field derive from this one
/// mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ChangeSeverity {
    pub const CRITICAL_BELOW: f64 = 0.30;
    pub const HIGH_BELOW: f64 = 0.60;
    pub const MEDIUM_BELOW: f64 = 0.85;

    pub fn from_score(score: f64) -> Self {
        if score < Self::CRITICAL_BELOW {
            Self::Critical
        } else if score < Self::HIGH_BELOW {
            Self::High
        } else if score < Self::MEDIUM_BELOW {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Similarity-level wording for the report's similarity section.
    pub fn assessment(&self) -> &'static str {
        match self {
            Self::Critical => "VERY LOW - potentially different locations or extreme changes",
            Self::High => "LOW - major changes detected",
            Self::Medium => "MODERATE - notable changes present",
            Self::Low => "HIGH - minor or seasonal changes only",
        }
    }

    /// Closing interpretation paragraph for the narrative.
    pub fn interpretation(&self) -> &'static str {
        match self {
            Self::Critical => {
                "WARNING: very low similarity suggests these may be different locations \
                 or that catastrophic changes have occurred."
            }
            Self::High => {
                "MAJOR CHANGES: significant transformation of the scene detected. This \
                 could indicate construction, land clearing, natural disasters, or other \
                 large-scale changes."
            }
            Self::Medium => {
                "MODERATE CHANGES: notable differences observed. These could be seasonal \
                 variation, gradual development, or environmental changes."
            }
            Self::Low => {
                "MINOR CHANGES: high similarity indicates only small changes, likely \
                 seasonal variation or minor modifications."
            }
        }
    }
}

/// Serializable summary of the similarity stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilaritySummary {
    pub score: f64,
    pub severity: ChangeSeverity,
    pub changed_region_count: usize,
    /// Sum of the surfaced regions' pixel-count areas.
    pub total_change_area: u64,
}

/// Metadata echoed into the report. Date fields survive only if they parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub date_before: Option<String>,
    pub date_after: Option<String>,
    pub location: Option<String>,
    pub time_span_days: Option<i64>,
}

/// Full structured output of one change analysis. Immutable after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub metadata: ReportMetadata,
    pub caption_before: String,
    pub caption_after: String,
    pub similarity: SimilaritySummary,
    pub regions: Vec<ChangeRegion>,
    pub object_changes: Vec<ObjectCountDelta>,
    pub narrative: String,
}

impl ChangeReport {
    /// Machine-consumable JSON form of the report.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Errors that can occur during change analysis.
#[derive(thiserror::Error, Debug)]
pub enum ChangeError {
    /// Fatal: an input image could not be decoded.
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    /// Non-fatal: a supplied capture date could not be parsed. The report
    /// drops the date-derived fields and continues.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The external caption/detection capability failed. Captured at the
    /// annotator boundary and converted to empty results, never surfaced to
    /// the caller.
    #[error("Annotation unavailable: {0}")]
    AnnotationUnavailable(String),

    /// Internal invariant violation: the normalizer reconciles dimensions
    /// before scoring, so the scorer must never see unequal buffers.
    #[error("Dimension mismatch: {width_a}x{height_a} vs {width_b}x{height_b}")]
    DimensionMismatch {
        width_a: u32,
        height_a: u32,
        width_b: u32,
        height_b: u32,
    },
}

/// Convenience result type.
pub type ChangeResult<T> = Result<T, ChangeError>;
