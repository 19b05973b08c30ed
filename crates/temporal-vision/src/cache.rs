//! Memoization of semantic annotation results.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::types::Detection;

/// What kind of annotation an entry holds, including the parameters that
/// shaped it. The detection threshold is part of the key (stored as raw bits
/// so the key stays `Eq + Hash`): a different threshold is a different result
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Caption,
    Detections { confidence_bits: u32 },
}

impl CacheKind {
    pub fn detections(confidence_threshold: f32) -> Self {
        Self::Detections {
            confidence_bits: confidence_threshold.to_bits(),
        }
    }
}

/// Cache key: image identity plus annotation kind and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub image: u64,
    pub kind: CacheKind,
}

/// A memoized annotation result. `degraded` marks values substituted after a
/// capability failure; they are cached like any other value, and `clear()` is
/// the recovery path after a transient outage.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Caption { text: String, degraded: bool },
    Detections { items: Vec<Detection>, degraded: bool },
}

/// In-process memo of caption/detection results.
///
/// Concurrent callers racing on one key share a single in-flight computation,
/// so the external capability runs at most once per `(image, parameters)`.
/// Entries live until [`AnnotationCache::clear`]; there is no automatic
/// expiry and nothing is persisted.
#[derive(Debug, Default)]
pub struct AnnotationCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceLock<CachedValue>>>>,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, computing and storing the value on a miss.
    ///
    /// At most one invocation of `compute` runs per key; racers block on the
    /// shared slot rather than duplicating the call.
    pub fn get_or_compute(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> CachedValue,
    ) -> CachedValue {
        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(entries.entry(key).or_default())
        };
        slot.get_or_init(compute).clone()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tracing::debug!("annotation cache cleared");
    }

    /// Number of populated or in-flight entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
