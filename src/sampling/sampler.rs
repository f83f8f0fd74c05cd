use std::sync::Arc;

use serde::Serialize;

use crate::features::channel::resolve_descriptor_channel;
use crate::features::context::{ContextMiss, lookup_feature_context, resolve_feature_context_with};
use crate::features::descriptor::{AudioFeatureDescriptor, SamplingOptions};
use crate::features::timebase::FrameTimebase;
use crate::foundation::core::round_tick;
use crate::sampling::cache::{
    FeatureTrackId, MAX_FEATURE_CACHE_ENTRIES, PlacementKey, SampleCache, SampleCacheKey,
};
use crate::sampling::diagnostics::{
    DEFAULT_MAX_FALLBACK_RECORDS, DiagnosticsLog, FallbackReason, HybridCacheFallback,
};
use crate::sampling::range::{RangeOptions, sample_audio_feature_range};
use crate::sampling::view::{
    AudioFeatureFrameSample, InterpolatingView, InterpolationKernel, TempoAlignedRequest,
    TempoAlignedView,
};
use crate::timeline::model::TimelineState;

#[derive(Clone, Debug)]
/// Sampler configuration.
pub struct SamplerOpts {
    /// Cached samples per feature track before the slot is cleared.
    pub max_cache_entries: usize,
    /// Hybrid-cache fallback records retained by the diagnostics log.
    pub max_fallback_records: usize,
}

impl Default for SamplerOpts {
    fn default() -> Self {
        Self {
            max_cache_entries: MAX_FEATURE_CACHE_ENTRIES,
            max_fallback_records: DEFAULT_MAX_FALLBACK_RECORDS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
/// Sampler counters.
pub struct SamplerStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that reached the adapter.
    pub misses: u64,
    /// Slots cleared by the entry bound.
    pub evictions: u64,
    /// Adapter failures.
    pub adapter_errors: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// One frame of a history query.
pub struct FeatureHistoryFrame {
    /// Source frame index.
    pub frame_index: usize,
    /// Timeline tick of the frame.
    pub tick: f64,
    /// Playback time of the frame.
    pub time_seconds: f64,
    /// Sample at the frame's time.
    pub sample: Option<Arc<AudioFeatureFrameSample>>,
}

/// Caching front-end for tempo-aligned feature sampling.
///
/// Owns the per-track sample caches and the diagnostics log, so it is used through `&mut self`.
/// Renderers sharing state across threads keep one sampler per thread.
#[derive(Debug)]
pub struct FeatureSampler<V = InterpolatingView> {
    opts: SamplerOpts,
    view: V,
    cache: SampleCache,
    diagnostics: DiagnosticsLog,
    stats: SamplerStats,
}

impl Default for FeatureSampler {
    fn default() -> Self {
        Self::new(SamplerOpts::default())
    }
}

impl FeatureSampler {
    /// Sampler backed by [`InterpolatingView`].
    pub fn new(opts: SamplerOpts) -> Self {
        Self::with_view(opts, InterpolatingView)
    }
}

impl<V: TempoAlignedView> FeatureSampler<V> {
    /// Sampler backed by a custom adapter.
    pub fn with_view(opts: SamplerOpts, view: V) -> Self {
        Self {
            cache: SampleCache::new(opts.max_cache_entries),
            diagnostics: DiagnosticsLog::new(opts.max_fallback_records),
            opts,
            view,
            stats: SamplerStats::default(),
        }
    }

    /// Configuration.
    pub fn opts(&self) -> &SamplerOpts {
        &self.opts
    }

    /// The adapter.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Counters.
    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &DiagnosticsLog {
        &self.diagnostics
    }

    /// Sample cache.
    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    /// Drop cache slots for sources no longer present in `state`.
    pub fn prune(&mut self, state: &TimelineState) -> usize {
        self.cache.prune(state)
    }

    /// Sample `descriptor` on `track_id` at `time_seconds`.
    ///
    /// `None` when the track has no matching analysis, when the tick falls outside the track
    /// region, or when the adapter fails. Results (including `None` from the adapter) are cached
    /// per rounded tick, track placement and parameter set.
    #[tracing::instrument(
        level = "trace",
        skip(self, state, descriptor, options),
        fields(feature_key = %descriptor.feature_key)
    )]
    pub fn sample_feature_frame(
        &mut self,
        state: &TimelineState,
        track_id: &str,
        descriptor: &AudioFeatureDescriptor,
        time_seconds: f64,
        options: Option<&SamplingOptions>,
    ) -> Option<Arc<AudioFeatureFrameSample>> {
        let calculator_id = descriptor.calculator_id.as_deref();
        let ctx = match lookup_feature_context(
            state,
            track_id,
            &descriptor.feature_key,
            calculator_id,
        ) {
            Ok(ctx) => ctx,
            Err(miss) => {
                self.record_context_miss(track_id, &descriptor.feature_key, miss);
                return None;
            }
        };

        let tempo = state.tempo();
        let time = if time_seconds.is_finite() {
            time_seconds.max(0.0)
        } else {
            0.0
        };
        let tick = round_tick(tempo.seconds_to_ticks(time));
        let channel = resolve_descriptor_channel(descriptor, &ctx);
        let interpolation = InterpolationKernel::from(descriptor.effective_interpolation(options));
        let smoothing = descriptor.effective_smoothing(options);

        let key = SampleCacheKey {
            track_id: track_id.to_owned(),
            placement: PlacementKey::from(ctx.placement()),
            tick,
            feature_key: descriptor.feature_key.clone(),
            calculator_id: descriptor.calculator_id.clone(),
            band: descriptor.band,
            channel,
            smoothing,
            interpolation,
        };
        let id = FeatureTrackId {
            source_id: ctx.source_id.to_owned(),
            track_key: ctx.track_key.to_owned(),
        };
        let epoch = ctx.cache.epoch();
        let revision = tempo.revision();

        if let Some(cached) = self.cache.get(&id, epoch, revision, &key) {
            self.stats.hits += 1;
            return cached;
        }
        self.stats.misses += 1;

        let request = TempoAlignedRequest {
            track_id,
            feature_key: &descriptor.feature_key,
            calculator_id,
            tick,
            channel,
            band: descriptor.band,
            smoothing,
            interpolation,
        };
        let frame = match self.view.tempo_aligned_frame(state, &request) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(
                    track_id,
                    feature_key = %descriptor.feature_key,
                    tick,
                    error = %err,
                    "tempo-aligned view failed"
                );
                self.stats.adapter_errors += 1;
                self.diagnostics
                    .record_hybrid_cache_fallback(HybridCacheFallback {
                        track_id: track_id.to_owned(),
                        source_id: Some(ctx.source_id.to_owned()),
                        feature_key: descriptor.feature_key.clone(),
                        reason: FallbackReason::AdapterError,
                        detail: Some(err.to_string()),
                    });
                return None;
            }
        };

        if let Some(diagnostics) = frame.diagnostics {
            self.diagnostics
                .record_tempo_aligned_diagnostics(ctx.source_id, diagnostics);
        }
        let value = frame.sample.map(Arc::new);
        if self
            .cache
            .insert(id, epoch, revision, key, value.clone())
        {
            self.stats.evictions += 1;
            tracing::debug!(
                source_id = ctx.source_id,
                track_key = ctx.track_key,
                "sample cache full, cleared"
            );
        }
        value
    }

    /// Up to `frame_count` most recent frames strictly before `time_seconds`, oldest first.
    ///
    /// Each frame is sampled at its own time through [`Self::sample_feature_frame`], so channel,
    /// band, smoothing and caching behave as for single-frame queries.
    #[tracing::instrument(level = "trace", skip(self, state, descriptor))]
    pub fn sample_feature_history(
        &mut self,
        state: &TimelineState,
        track_id: &str,
        descriptor: &AudioFeatureDescriptor,
        time_seconds: f64,
        frame_count: usize,
    ) -> Vec<FeatureHistoryFrame> {
        if frame_count == 0 || !time_seconds.is_finite() {
            return Vec::new();
        }
        let calculator_id = descriptor.calculator_id.as_deref();
        let Some(ctx) =
            resolve_feature_context_with(state, track_id, &descriptor.feature_key, calculator_id)
        else {
            return Vec::new();
        };
        let tempo = state.tempo();
        let Some(timebase) = FrameTimebase::for_track(ctx.feature_track, tempo) else {
            return Vec::new();
        };

        let end_tick = tempo.seconds_to_ticks(time_seconds);
        let lookback = (frame_count + 1) as f64;
        let start_tick = match timebase {
            FrameTimebase::Ticks { hop_ticks, .. } => end_tick - hop_ticks * lookback,
            FrameTimebase::Seconds { hop_seconds, .. } => {
                tempo.seconds_to_ticks(time_seconds - hop_seconds * lookback)
            }
        };
        let options = RangeOptions {
            calculator_id: descriptor.calculator_id.clone(),
            ..RangeOptions::default()
        };
        let Some(range) = sample_audio_feature_range(
            state,
            track_id,
            &descriptor.feature_key,
            start_tick.floor(),
            end_tick,
            &options,
        ) else {
            return Vec::new();
        };

        let frames: Vec<usize> = (0..range.frame_count)
            .filter(|&i| range.frame_seconds[i] < time_seconds)
            .collect();
        let skip = frames.len().saturating_sub(frame_count);
        frames[skip..]
            .iter()
            .map(|&i| {
                let seconds = range.frame_seconds[i];
                FeatureHistoryFrame {
                    frame_index: range.frame_indices[i],
                    tick: range.frame_ticks[i],
                    time_seconds: seconds,
                    sample: self.sample_feature_frame(state, track_id, descriptor, seconds, None),
                }
            })
            .collect()
    }

    fn record_context_miss(&mut self, track_id: &str, feature_key: &str, miss: ContextMiss) {
        let (source_id, reason) = match miss {
            ContextMiss::CacheMissing { source_id } => (source_id, FallbackReason::CacheMissing),
            ContextMiss::FeatureTrackMissing { source_id } => {
                (source_id, FallbackReason::FeatureTrackMissing)
            }
            other => {
                tracing::debug!(track_id, feature_key, miss = ?other, "feature context unresolved");
                return;
            }
        };
        self.diagnostics
            .record_hybrid_cache_fallback(HybridCacheFallback {
                track_id: track_id.to_owned(),
                source_id: Some(source_id),
                feature_key: feature_key.to_owned(),
                reason,
                detail: None,
            });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/sampler.rs"]
mod tests;
