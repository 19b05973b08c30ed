//! The end-to-end change analysis pipeline.

use crate::annotate::{CachedAnnotator, SemanticAnnotator};
use crate::cache::AnnotationCache;
use crate::capture;
use crate::normalize;
use crate::object_diff;
use crate::regions;
use crate::report::{self, ReportInputs};
use crate::ssim;
use crate::types::{ChangeReport, ChangeResult, SceneImage};

/// Minimum pixel count for a connected change region to be reported.
pub const DEFAULT_MIN_CHANGE_AREA: u32 = 100;

/// Minimum confidence for detections from the semantic annotator.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.7;

/// Tuning constants for one detector instance.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_change_area: u32,
    pub detection_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_change_area: DEFAULT_MIN_CHANGE_AREA,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

/// Optional per-analysis metadata.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub date_before: Option<String>,
    pub date_after: Option<String>,
    pub location: Option<String>,
}

/// Temporal change detector: orchestrates normalization, similarity scoring,
/// region extraction, cached semantic annotation, object differencing, and
/// report assembly.
///
/// One analysis is a synchronous sequence of stages; the annotation cache is
/// the only state shared between analyses.
pub struct ChangeDetector<A: SemanticAnnotator> {
    annotator: CachedAnnotator<A>,
    config: DetectorConfig,
}

impl<A: SemanticAnnotator> ChangeDetector<A> {
    pub fn new(annotator: A) -> Self {
        Self::with_config(annotator, DetectorConfig::default())
    }

    pub fn with_config(annotator: A, config: DetectorConfig) -> Self {
        Self {
            annotator: CachedAnnotator::new(annotator),
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The annotation result cache, exposed for inspection and explicit
    /// clearing.
    pub fn cache(&self) -> &AnnotationCache {
        self.annotator.cache()
    }

    /// Analyze two images loaded from disk. Fails only if an input cannot be
    /// decoded.
    pub fn analyze_files(
        &self,
        path_before: &str,
        path_after: &str,
        options: &AnalysisOptions,
    ) -> ChangeResult<ChangeReport> {
        let before = capture::load_from_file(path_before)?;
        let after = capture::load_from_file(path_after)?;
        self.analyze(&before, &after, options)
    }

    /// Analyze two already-decoded images.
    pub fn analyze(
        &self,
        before: &SceneImage,
        after: &SceneImage,
        options: &AnalysisOptions,
    ) -> ChangeResult<ChangeReport> {
        tracing::info!(
            "starting change analysis: {}x{} vs {}x{}",
            before.width(),
            before.height(),
            after.width(),
            after.height()
        );

        let (gray_before, gray_after) = normalize::normalize_pair(before, after);
        let similarity = ssim::structural_similarity(&gray_before, &gray_after)?;
        tracing::debug!("structural similarity score: {:.4}", similarity.score);

        let change_regions =
            regions::extract_change_regions(&similarity.dissimilarity, self.config.min_change_area);

        let caption_before = self.annotator.caption(before);
        let caption_after = self.annotator.caption(after);
        let detections_before = self
            .annotator
            .detect(before, self.config.detection_threshold);
        let detections_after = self
            .annotator
            .detect(after, self.config.detection_threshold);

        let object_changes =
            object_diff::diff_object_counts(&detections_before.value, &detections_after.value);

        Ok(report::assemble_report(ReportInputs {
            date_before: options.date_before.as_deref(),
            date_after: options.date_after.as_deref(),
            location: options.location.as_deref(),
            caption_before: &caption_before,
            caption_after: &caption_after,
            score: similarity.score,
            regions: &change_regions,
            object_changes: &object_changes,
            detections_degraded: detections_before.degraded || detections_after.degraded,
        }))
    }
}
