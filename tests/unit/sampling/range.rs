use super::*;
use crate::fixtures::{float_track, minmax_track, state_with};
use crate::timeline::model::Track;

fn trimmed_track(region_end: Option<f64>) -> Track {
    let mut track = Track::audio("a1");
    track.offset_ticks = 1000.0;
    track.region_start_tick = Some(120.0);
    track.region_end_tick = region_end;
    track
}

#[test]
fn frames_before_region_start_are_excluded() {
    let state = state_with(
        trimmed_track(None),
        vec![float_track("rms", 8, 1, 1, 60.0, |f, _, _| f as f32)],
    );
    let range =
        sample_audio_feature_range(&state, "a1", "rms", 0.0, 5000.0, &RangeOptions::default())
            .unwrap();
    assert_eq!(range.frame_indices, [2, 3, 4, 5, 6, 7]);
    assert_eq!(range.frame_ticks[0], 1000.0);
    assert_eq!(range.frame_ticks[5], 1300.0);
    assert_eq!(range.data, [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(range.track_start_tick, 1000.0);
    assert_eq!(range.track_end_tick, None);
    assert_eq!(range.hop_ticks, 60.0);
}

#[test]
fn region_end_and_window_are_exclusive() {
    let state = state_with(
        trimmed_track(Some(300.0)),
        vec![float_track("rms", 8, 1, 1, 60.0, |f, _, _| f as f32)],
    );
    let all = sample_audio_feature_range(&state, "a1", "rms", 0.0, 5000.0, &RangeOptions::default())
        .unwrap();
    assert_eq!(all.frame_indices, [2, 3, 4]);

    let window =
        sample_audio_feature_range(&state, "a1", "rms", 1000.0, 1120.0, &RangeOptions::default())
            .unwrap();
    assert_eq!(window.frame_indices, [2, 3]);
    assert_eq!(window.frame_seconds.len(), 2);
}

#[test]
fn empty_and_unresolvable_windows() {
    let state = state_with(
        Track::audio("a1"),
        vec![float_track("rms", 4, 1, 1, 60.0, |f, _, _| f as f32)],
    );
    let opts = RangeOptions::default();
    assert!(sample_audio_feature_range(&state, "a1", "rms", 100.0, 100.0, &opts).is_none());
    assert!(sample_audio_feature_range(&state, "a1", "rms", 100.0, 50.0, &opts).is_none());
    assert!(sample_audio_feature_range(&state, "a1", "rms", f64::NAN, 50.0, &opts).is_none());
    assert!(sample_audio_feature_range(&state, "zz", "rms", 0.0, 50.0, &opts).is_none());

    let past = sample_audio_feature_range(&state, "a1", "rms", 10_000.0, 20_000.0, &opts).unwrap();
    assert_eq!(past.frame_count, 0);
    assert!(past.data.is_empty());
    assert!(past.frame_values(0).is_none());

    let empty = state_with(
        Track::audio("a1"),
        vec![float_track("rms", 0, 1, 1, 60.0, |_, _, _| 0.0)],
    );
    assert!(sample_audio_feature_range(&empty, "a1", "rms", 0.0, 50.0, &opts).is_none());
}

#[test]
fn channel_and_band_restriction() {
    let mut feature = float_track("spectrum", 3, 2, 4, 60.0, |f, c, b| {
        (f * 100 + c * 10 + b) as f32
    });
    feature.channel_aliases = Some(vec!["L".to_owned(), "R".to_owned()]);
    let state = state_with(Track::audio("a1"), vec![feature]);

    let opts = RangeOptions {
        channel: Some(ChannelSelector::alias("r")),
        band: Some(2),
        calculator_id: None,
    };
    let range = sample_audio_feature_range(&state, "a1", "spectrum", 0.0, 180.0, &opts).unwrap();
    assert_eq!(range.channels, 1);
    assert_eq!(range.channel_index, Some(1));
    assert_eq!(range.values_per_channel, 1);
    assert_eq!(range.data, [12.0, 112.0, 212.0]);

    let all = sample_audio_feature_range(&state, "a1", "spectrum", 0.0, 60.0, &RangeOptions::default())
        .unwrap();
    assert_eq!(all.frame_values(0).map(<[f32]>::len), Some(8));
}

#[test]
fn waveform_ramp_decodes_to_midpoints() {
    let ramp = |f: usize| -0.8 + 1.6 * f as f32 / 31.0;
    let state = state_with(
        Track::audio("a1"),
        vec![minmax_track("waveform", 32, 1, 60.0, |f, _| {
            (ramp(f) - 0.1, ramp(f) + 0.1)
        })],
    );
    let range = sample_audio_feature_range(
        &state,
        "a1",
        "waveform",
        0.0,
        32.0 * 60.0,
        &RangeOptions::default(),
    )
    .unwrap();
    assert_eq!(range.frame_count, 32);
    assert_eq!(range.values_per_channel, 2);

    let points = range.waveform_points(0);
    assert_eq!(points.len(), 32);
    for (i, p) in points.iter().enumerate() {
        assert!((p - ramp(i)).abs() < 0.05, "frame {i}: {p}");
    }
    assert!(points.windows(2).all(|w| w[0] < w[1]));
    assert!(range.waveform_points(1).is_empty());
}
