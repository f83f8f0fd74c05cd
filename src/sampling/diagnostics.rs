use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::features::timebase::TimebaseKind;

/// Default bound on retained hybrid-cache fallback records.
pub const DEFAULT_MAX_FALLBACK_RECORDS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Why a sample was degraded or missing.
pub enum FallbackReason {
    /// The tick lies outside the track's trimmed region.
    OutsideRegion,
    /// The frame position lies beyond the first/last frame; the edge frame was used.
    OutOfRange,
    /// Frames were located through the seconds hop instead of a tick hop.
    SecondsTimebase,
    /// The feature track has no usable hop.
    NoTimebase,
    /// The feature track has no frames.
    EmptyTrack,
    /// No feature cache exists for the source.
    CacheMissing,
    /// The source's cache has no matching feature track.
    FeatureTrackMissing,
    /// The view adapter failed.
    AdapterError,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Diagnostics produced by one tempo-aligned frame evaluation.
pub struct TempoAlignedDiagnostics {
    /// Audio source id.
    pub source_id: String,
    /// Timeline track id.
    pub track_id: String,
    /// Requested feature key.
    pub feature_key: String,
    /// Storage key of the feature track.
    pub track_key: String,
    /// Timebase used, when one was found.
    pub timebase: Option<TimebaseKind>,
    /// Degradation, if any.
    pub fallback_reason: Option<FallbackReason>,
    /// Unclamped fractional frame position.
    pub frame_index: Option<f64>,
    /// Requested timeline tick.
    pub tick: i64,
    /// Tempo map revision the evaluation used.
    pub tempo_revision: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// A request that could not be served from analysis data.
pub struct HybridCacheFallback {
    /// Timeline track id.
    pub track_id: String,
    /// Source id, when the track resolved that far.
    pub source_id: Option<String>,
    /// Requested feature key.
    pub feature_key: String,
    /// Why.
    pub reason: FallbackReason,
    /// Free-form detail (adapter error text).
    pub detail: Option<String>,
}

/// In-process record of sampling diagnostics.
///
/// Keeps the latest tempo-aligned diagnostics per source and a bounded queue of fallbacks.
/// Every record is also emitted as a `tracing` debug event.
#[derive(Debug)]
pub struct DiagnosticsLog {
    latest: HashMap<String, TempoAlignedDiagnostics>,
    fallbacks: VecDeque<HybridCacheFallback>,
    max_fallbacks: usize,
}

impl Default for DiagnosticsLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FALLBACK_RECORDS)
    }
}

impl DiagnosticsLog {
    /// Create a log retaining at most `max_fallbacks` fallback records.
    pub fn new(max_fallbacks: usize) -> Self {
        Self {
            latest: HashMap::new(),
            fallbacks: VecDeque::with_capacity(max_fallbacks.min(DEFAULT_MAX_FALLBACK_RECORDS)),
            max_fallbacks,
        }
    }

    /// Record the diagnostics of the latest evaluation for `source_id`.
    pub fn record_tempo_aligned_diagnostics(
        &mut self,
        source_id: &str,
        diagnostics: TempoAlignedDiagnostics,
    ) {
        tracing::debug!(
            source_id,
            track_id = %diagnostics.track_id,
            feature_key = %diagnostics.feature_key,
            tick = diagnostics.tick,
            timebase = ?diagnostics.timebase,
            fallback = ?diagnostics.fallback_reason,
            "tempo-aligned diagnostics"
        );
        self.latest.insert(source_id.to_owned(), diagnostics);
    }

    /// Record a fallback, dropping the oldest record when full.
    pub fn record_hybrid_cache_fallback(&mut self, fallback: HybridCacheFallback) {
        tracing::debug!(
            track_id = %fallback.track_id,
            source_id = ?fallback.source_id,
            feature_key = %fallback.feature_key,
            reason = ?fallback.reason,
            "hybrid cache fallback"
        );
        if self.max_fallbacks == 0 {
            return;
        }
        while self.fallbacks.len() >= self.max_fallbacks {
            self.fallbacks.pop_front();
        }
        self.fallbacks.push_back(fallback);
    }

    /// Latest diagnostics for `source_id`.
    pub fn latest(&self, source_id: &str) -> Option<&TempoAlignedDiagnostics> {
        self.latest.get(source_id)
    }

    /// Retained fallbacks, oldest first.
    pub fn fallbacks(&self) -> impl Iterator<Item = &HybridCacheFallback> {
        self.fallbacks.iter()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.latest.clear();
        self.fallbacks.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/diagnostics.rs"]
mod tests;
