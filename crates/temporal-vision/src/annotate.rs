//! Semantic annotation boundary: captioning and object detection delegated
//! to an external capability.

use crate::cache::{AnnotationCache, CacheKey, CacheKind, CachedValue};
use crate::types::{ChangeResult, Detection, SceneImage};

/// External captioning/detection capability.
///
/// Implementations may wrap a local model, a remote service, or a test stub.
/// Calls are expected to enforce their own timeouts; a timeout surfaces as an
/// `Err` and degrades like any other failure.
pub trait SemanticAnnotator {
    /// Produce a short descriptive caption for one image.
    fn caption(&self, image: &SceneImage) -> ChangeResult<String>;

    /// Detect labeled objects in one image. Only detections with confidence
    /// at or above `confidence_threshold` may be returned; the boundary
    /// re-filters regardless.
    fn detect(
        &self,
        image: &SceneImage,
        confidence_threshold: f32,
    ) -> ChangeResult<Vec<Detection>>;
}

/// An annotation value plus whether it was degraded to an empty placeholder
/// after a capability failure.
#[derive(Debug, Clone)]
pub struct Annotated<T> {
    pub value: T,
    pub degraded: bool,
}

/// Routes annotator calls through the result cache and absorbs capability
/// failures: captioning failure yields an empty string, detection failure an
/// empty list, each with a logged warning. Neither is ever fatal.
pub struct CachedAnnotator<A: SemanticAnnotator> {
    inner: A,
    cache: AnnotationCache,
}

impl<A: SemanticAnnotator> CachedAnnotator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            cache: AnnotationCache::new(),
        }
    }

    pub fn cache(&self) -> &AnnotationCache {
        &self.cache
    }

    /// Caption one image, memoized by image identity.
    pub fn caption(&self, image: &SceneImage) -> Annotated<String> {
        let key = CacheKey {
            image: image.identity(),
            kind: CacheKind::Caption,
        };
        let value = self.cache.get_or_compute(key, || match self.inner.caption(image) {
            Ok(text) => CachedValue::Caption {
                text,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!("captioning unavailable, continuing without: {e}");
                CachedValue::Caption {
                    text: String::new(),
                    degraded: true,
                }
            }
        });

        match value {
            CachedValue::Caption { text, degraded } => Annotated {
                value: text,
                degraded,
            },
            CachedValue::Detections { .. } => {
                debug_assert!(false, "caption key resolved to a detection entry");
                Annotated {
                    value: String::new(),
                    degraded: true,
                }
            }
        }
    }

    /// Detect objects in one image, memoized by image identity and threshold.
    pub fn detect(&self, image: &SceneImage, confidence_threshold: f32) -> Annotated<Vec<Detection>> {
        let key = CacheKey {
            image: image.identity(),
            kind: CacheKind::detections(confidence_threshold),
        };
        let value = self
            .cache
            .get_or_compute(key, || match self.inner.detect(image, confidence_threshold) {
                Ok(items) => {
                    // Sub-threshold detections are never surfaced, whatever
                    // the capability returned.
                    let items: Vec<Detection> = items
                        .into_iter()
                        .filter(|d| d.confidence >= confidence_threshold)
                        .collect();
                    CachedValue::Detections {
                        items,
                        degraded: false,
                    }
                }
                Err(e) => {
                    tracing::warn!("object detection unavailable, continuing without: {e}");
                    CachedValue::Detections {
                        items: Vec::new(),
                        degraded: true,
                    }
                }
            });

        match value {
            CachedValue::Detections { items, degraded } => Annotated {
                value: items,
                degraded,
            },
            CachedValue::Caption { .. } => {
                debug_assert!(false, "detection key resolved to a caption entry");
                Annotated {
                    value: Vec::new(),
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, ChangeError};
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scene() -> SceneImage {
        SceneImage::new(DynamicImage::new_rgb8(8, 8))
    }

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bounds: BoundingBox {
                x_min: 0.0,
                y_min: 0.0,
                x_max: 4.0,
                y_max: 4.0,
            },
        }
    }

    struct CountingAnnotator {
        caption_calls: AtomicUsize,
        detect_calls: AtomicUsize,
    }

    impl CountingAnnotator {
        fn new() -> Self {
            Self {
                caption_calls: AtomicUsize::new(0),
                detect_calls: AtomicUsize::new(0),
            }
        }
    }

    impl SemanticAnnotator for CountingAnnotator {
        fn caption(&self, _image: &SceneImage) -> ChangeResult<String> {
            self.caption_calls.fetch_add(1, Ordering::SeqCst);
            Ok("a clearing".to_string())
        }

        fn detect(
            &self,
            _image: &SceneImage,
            _confidence_threshold: f32,
        ) -> ChangeResult<Vec<Detection>> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![detection("tree", 0.95), detection("car", 0.4)])
        }
    }

    struct FailingAnnotator {
        calls: AtomicUsize,
    }

    impl SemanticAnnotator for FailingAnnotator {
        fn caption(&self, _image: &SceneImage) -> ChangeResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChangeError::AnnotationUnavailable("model offline".to_string()))
        }

        fn detect(
            &self,
            _image: &SceneImage,
            _confidence_threshold: f32,
        ) -> ChangeResult<Vec<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChangeError::AnnotationUnavailable("model offline".to_string()))
        }
    }

    #[test]
    fn test_detect_invokes_capability_at_most_once_per_key() {
        let annotator = CachedAnnotator::new(CountingAnnotator::new());
        let image = scene();

        annotator.detect(&image, 0.7);
        annotator.detect(&image, 0.7);
        assert_eq!(annotator.inner.detect_calls.load(Ordering::SeqCst), 1);

        // A different threshold is a different key.
        annotator.detect(&image, 0.9);
        assert_eq!(annotator.inner.detect_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detect_refilters_below_threshold() {
        let annotator = CachedAnnotator::new(CountingAnnotator::new());
        let result = annotator.detect(&scene(), 0.7);
        assert!(!result.degraded);
        assert_eq!(result.value.len(), 1);
        assert_eq!(result.value[0].label, "tree");
    }

    #[test]
    fn test_caption_memoized_by_image_identity() {
        let annotator = CachedAnnotator::new(CountingAnnotator::new());
        let image = scene();

        let first = annotator.caption(&image);
        let second = annotator.caption(&image);
        assert_eq!(first.value, "a clearing");
        assert_eq!(second.value, "a clearing");
        assert_eq!(annotator.inner.caption_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_degrade_to_empty_and_stay_cached() {
        let annotator = CachedAnnotator::new(FailingAnnotator {
            calls: AtomicUsize::new(0),
        });
        let image = scene();

        let caption = annotator.caption(&image);
        assert!(caption.degraded);
        assert!(caption.value.is_empty());

        let detections = annotator.detect(&image, 0.7);
        assert!(detections.degraded);
        assert!(detections.value.is_empty());

        // Repeat calls hit the cached degraded values.
        annotator.caption(&image);
        annotator.detect(&image, 0.7);
        assert_eq!(annotator.inner.calls.load(Ordering::SeqCst), 2);

        // clear() is the recovery path.
        annotator.cache().clear();
        annotator.caption(&image);
        assert_eq!(annotator.inner.calls.load(Ordering::SeqCst), 3);
    }
}
