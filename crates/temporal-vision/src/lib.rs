//! Temporal visual change detection — structural similarity, change regions,
//! and object-level differencing between two captures of the same scene.
//!
//! The pipeline is synchronous: normalize, score, extract regions, annotate
//! both images through the result cache, diff the detections, and assemble a
//! single [`ChangeReport`]. Captioning and object detection live behind the
//! [`SemanticAnnotator`] boundary so the core stays testable with
//! deterministic stubs.

pub mod annotate;
pub mod cache;
pub mod capture;
pub mod normalize;
pub mod object_diff;
pub mod pipeline;
pub mod regions;
pub mod report;
pub mod ssim;
pub mod types;

pub use annotate::{Annotated, CachedAnnotator, SemanticAnnotator};
pub use cache::{AnnotationCache, CacheKey, CacheKind, CachedValue};
pub use capture::{is_supported_format, load_from_base64, load_from_file, load_from_memory};
pub use normalize::normalize_pair;
pub use object_diff::{diff_object_counts, partition_changes};
pub use pipeline::{
    AnalysisOptions, ChangeDetector, DetectorConfig, DEFAULT_DETECTION_THRESHOLD,
    DEFAULT_MIN_CHANGE_AREA,
};
pub use regions::{extract_change_regions, otsu_threshold};
pub use report::{assemble_report, parse_capture_date, ReportInputs};
pub use ssim::{structural_similarity, SimilarityResult, SSIM_WINDOW};
pub use types::*;
