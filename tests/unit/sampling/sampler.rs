use std::cell::Cell;

use super::*;
use crate::features::descriptor::{ChannelSelector, SampleInterpolation};
use crate::features::model::AudioFeatureCache;
use crate::fixtures::{float_track, state_with, store_with};
use crate::foundation::error::{ScopeError, ScopeResult};
use crate::sampling::view::TempoAlignedFrame;
use crate::timeline::model::Track;

#[derive(Default)]
struct CountingView {
    calls: Cell<usize>,
}

impl TempoAlignedView for CountingView {
    fn tempo_aligned_frame(
        &self,
        state: &TimelineState,
        request: &TempoAlignedRequest<'_>,
    ) -> ScopeResult<TempoAlignedFrame> {
        self.calls.set(self.calls.get() + 1);
        InterpolatingView.tempo_aligned_frame(state, request)
    }
}

struct FailingView;

impl TempoAlignedView for FailingView {
    fn tempo_aligned_frame(
        &self,
        _state: &TimelineState,
        _request: &TempoAlignedRequest<'_>,
    ) -> ScopeResult<TempoAlignedFrame> {
        Err(ScopeError::evaluation("boom"))
    }
}

fn counting() -> FeatureSampler<CountingView> {
    FeatureSampler::with_view(SamplerOpts::default(), CountingView::default())
}

// 120 bpm at 960 ppq with a 60 tick hop: frame i sits at i / 32 seconds.
fn ramp_state() -> Arc<TimelineState> {
    state_with(
        Track::audio("a1"),
        vec![float_track("rms", 64, 1, 1, 60.0, |f, _, _| f as f32)],
    )
}

#[test]
fn repeated_queries_hit_the_cache() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = counting();

    let a = sampler
        .sample_feature_frame(&state, "a1", &d, 0.25, None)
        .unwrap();
    let b = sampler
        .sample_feature_frame(&state, "a1", &d, 0.25, None)
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.values, [8.0]);
    assert_eq!(sampler.view().calls.get(), 1);
    assert_eq!(sampler.stats().hits, 1);
    assert_eq!(sampler.stats().misses, 1);
}

#[test]
fn absence_is_cached_too() {
    let mut track = Track::audio("a1");
    track.offset_ticks = 1920.0;
    let state = state_with(
        track,
        vec![float_track("rms", 4, 1, 1, 60.0, |f, _, _| f as f32)],
    );
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = counting();
    assert!(sampler.sample_feature_frame(&state, "a1", &d, 0.1, None).is_none());
    assert!(sampler.sample_feature_frame(&state, "a1", &d, 0.1, None).is_none());
    assert_eq!(sampler.view().calls.get(), 1);
}

#[test]
fn negative_time_clamps_to_zero() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = counting();
    let s = sampler
        .sample_feature_frame(&state, "a1", &d, -3.0, None)
        .unwrap();
    assert_eq!(s.tick, 0);
    assert_eq!(s.values, [0.0]);
    sampler.sample_feature_frame(&state, "a1", &d, 0.0, None);
    assert_eq!(sampler.view().calls.get(), 1);
}

#[test]
fn calculator_id_keeps_samples_apart() {
    let a = float_track("rms", 4, 1, 1, 60.0, |_, _, _| 1.0);
    let mut b = float_track("rms", 4, 1, 1, 60.0, |_, _, _| 2.0);
    b.calculator_id = "alt.rms".to_owned();
    let mut cache = AudioFeatureCache::default();
    cache.feature_tracks.insert("rms".to_owned(), a);
    cache.feature_tracks.insert("rms@alt".to_owned(), b);
    let mut store = crate::TimelineStore::default();
    store.upsert_track(Track::audio("a1")).unwrap();
    store.ingest_feature_cache("a1", cache).unwrap();
    let state = store.snapshot();

    let mut sampler = FeatureSampler::default();
    let plain = AudioFeatureDescriptor::new("rms").with_calculator("test.rms");
    let alt = AudioFeatureDescriptor::new("rms").with_calculator("alt.rms");
    let x = sampler.sample_feature_frame(&state, "a1", &plain, 0.0, None).unwrap();
    let y = sampler.sample_feature_frame(&state, "a1", &alt, 0.0, None).unwrap();
    assert_eq!(x.values, [1.0]);
    assert_eq!(y.values, [2.0]);
}

#[test]
fn options_change_the_key() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms").with_interpolation(SampleInterpolation::Nearest);
    let mut sampler = counting();
    // Tick 90 is frame 1.5.
    let t = 90.0 / 1920.0;
    let held = sampler.sample_feature_frame(&state, "a1", &d, t, None).unwrap();
    let opts = SamplingOptions {
        interpolation: Some(SampleInterpolation::Linear),
        smoothing: None,
    };
    let lerped = sampler
        .sample_feature_frame(&state, "a1", &d, t, Some(&opts))
        .unwrap();
    assert_eq!(held.values, [2.0]);
    assert_eq!(lerped.values, [1.5]);
    assert_eq!(sampler.view().calls.get(), 2);
}

#[test]
fn cache_stays_bounded_and_keeps_the_triggering_entry() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = counting();
    let id = FeatureTrackId {
        source_id: "a1".to_owned(),
        track_key: "rms".to_owned(),
    };

    for i in 0..200 {
        let t = f64::from(i) / 1920.0;
        sampler.sample_feature_frame(&state, "a1", &d, t, None);
        assert!(sampler.cache().len_for(&id) <= MAX_FEATURE_CACHE_ENTRIES);
    }
    assert_eq!(sampler.stats().evictions, 1);

    let calls = sampler.view().calls.get();
    let last = 199.0 / 1920.0;
    sampler.sample_feature_frame(&state, "a1", &d, last, None);
    assert_eq!(sampler.view().calls.get(), calls);
}

#[test]
fn reingested_analysis_invalidates_cached_samples() {
    let mut store = store_with(
        Track::audio("a1"),
        vec![float_track("rms", 4, 1, 1, 60.0, |_, _, _| 1.0)],
    );
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = FeatureSampler::default();
    let before = sampler
        .sample_feature_frame(&store.snapshot(), "a1", &d, 0.0, None)
        .unwrap();
    assert_eq!(before.values, [1.0]);

    let mut cache = AudioFeatureCache::default();
    cache.feature_tracks.insert(
        "rms".to_owned(),
        float_track("rms", 4, 1, 1, 60.0, |_, _, _| 5.0),
    );
    store.ingest_feature_cache("a1", cache).unwrap();
    let after = sampler
        .sample_feature_frame(&store.snapshot(), "a1", &d, 0.0, None)
        .unwrap();
    assert_eq!(after.values, [5.0]);
}

#[test]
fn moving_or_trimming_a_track_resamples() {
    let mut store = store_with(
        Track::audio("a1"),
        vec![float_track("rms", 64, 1, 1, 60.0, |f, _, _| f as f32)],
    );
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = FeatureSampler::default();
    let before = sampler
        .sample_feature_frame(&store.snapshot(), "a1", &d, 0.5, None)
        .unwrap();
    assert_eq!(before.values, [16.0]);

    let mut moved = Track::audio("a1");
    moved.offset_ticks = 600.0;
    store.upsert_track(moved.clone()).unwrap();
    let after = sampler
        .sample_feature_frame(&store.snapshot(), "a1", &d, 0.5, None)
        .unwrap();
    assert_eq!(after.values, [6.0]);

    moved.region_end_tick = Some(300.0);
    store.upsert_track(moved).unwrap();
    assert!(
        sampler
            .sample_feature_frame(&store.snapshot(), "a1", &d, 0.5, None)
            .is_none()
    );
    assert_eq!(sampler.stats().hits, 0);
}

#[test]
fn adapter_errors_are_contained() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = FeatureSampler::with_view(SamplerOpts::default(), FailingView);
    assert!(sampler.sample_feature_frame(&state, "a1", &d, 0.0, None).is_none());
    assert!(sampler.sample_feature_frame(&state, "a1", &d, 0.0, None).is_none());
    assert_eq!(sampler.stats().adapter_errors, 2);
    assert_eq!(sampler.stats().hits, 0);
    let fallback = sampler.diagnostics().fallbacks().last().unwrap();
    assert_eq!(fallback.reason, FallbackReason::AdapterError);
    assert_eq!(fallback.detail.as_deref(), Some("evaluation error: boom"));
}

#[test]
fn missing_analysis_records_fallbacks() {
    let mut store = store_with(
        Track::audio("a1"),
        vec![float_track("rms", 4, 1, 1, 60.0, |_, _, _| 1.0)],
    );
    store.upsert_track(Track::audio("a2")).unwrap();
    let state = store.snapshot();
    let mut sampler = FeatureSampler::default();

    let d = AudioFeatureDescriptor::new("rms");
    assert!(sampler.sample_feature_frame(&state, "a2", &d, 0.0, None).is_none());
    let spectro = AudioFeatureDescriptor::new("spectrogram");
    assert!(sampler.sample_feature_frame(&state, "a1", &spectro, 0.0, None).is_none());
    assert!(sampler.sample_feature_frame(&state, "nope", &d, 0.0, None).is_none());

    let reasons: Vec<_> = sampler.diagnostics().fallbacks().map(|f| f.reason).collect();
    assert_eq!(
        reasons,
        [FallbackReason::CacheMissing, FallbackReason::FeatureTrackMissing]
    );
}

#[test]
fn diagnostics_are_recorded_per_source() {
    let state = ramp_state();
    let mut sampler = FeatureSampler::default();
    sampler.sample_feature_frame(&state, "a1", &AudioFeatureDescriptor::new("rms"), 10.0, None);
    let diag = sampler.diagnostics().latest("a1").unwrap();
    assert_eq!(diag.fallback_reason, Some(FallbackReason::OutOfRange));
    assert_eq!(diag.tick, 19200);
}

#[test]
fn descriptor_channels_resolve_through_aliases() {
    let mut feature = float_track("rms", 4, 2, 1, 60.0, |_, c, _| c as f32 + 1.0);
    feature.channel_aliases = Some(vec!["L".to_owned(), "R".to_owned()]);
    let state = state_with(Track::audio("a1"), vec![feature]);
    let mut sampler = FeatureSampler::default();

    let right = AudioFeatureDescriptor::new("rms").with_channel(ChannelSelector::alias("r"));
    let s = sampler.sample_feature_frame(&state, "a1", &right, 0.0, None).unwrap();
    assert_eq!(s.channel_index, Some(1));
    assert_eq!(s.values, [2.0]);

    let unknown = AudioFeatureDescriptor::new("rms").with_channel(ChannelSelector::alias("unknown"));
    let s = sampler.sample_feature_frame(&state, "a1", &unknown, 0.0, None).unwrap();
    assert_eq!(s.channel_index, Some(0));

    let all = sampler
        .sample_feature_frame(&state, "a1", &AudioFeatureDescriptor::new("rms"), 0.0, None)
        .unwrap();
    assert_eq!(all.values, [1.0, 2.0]);
    assert_eq!(all.channel_aliases.as_deref().map(<[String]>::len), Some(2));
}

#[test]
fn history_is_ordered_and_strictly_before_time() {
    let state = ramp_state();
    let d = AudioFeatureDescriptor::new("rms");
    let mut sampler = FeatureSampler::default();

    let history = sampler.sample_feature_history(&state, "a1", &d, 0.5, 4);
    let indices: Vec<_> = history.iter().map(|h| h.frame_index).collect();
    assert_eq!(indices, [12, 13, 14, 15]);
    assert!(history.windows(2).all(|w| w[0].tick < w[1].tick));
    assert!(history.iter().all(|h| h.time_seconds < 0.5));
    let values: Vec<f32> = history
        .iter()
        .map(|h| h.sample.as_ref().unwrap().values[0])
        .collect();
    assert_eq!(values, [12.0, 13.0, 14.0, 15.0]);

    let early = sampler.sample_feature_history(&state, "a1", &d, 2.0 / 32.0, 4);
    assert_eq!(early.len(), 2);
    assert!(sampler.sample_feature_history(&state, "a1", &d, 0.0, 4).is_empty());
    assert!(sampler.sample_feature_history(&state, "a1", &d, 0.5, 0).is_empty());
}
