use serde::{Deserialize, Serialize};

use crate::features::channel::resolve_channel;
use crate::features::context::resolve_feature_context_with;
use crate::features::descriptor::ChannelSelector;
use crate::features::model::FeatureFormat;
use crate::features::timebase::FrameTimebase;
use crate::foundation::core::TickRange;
use crate::timeline::model::TimelineState;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// Restrictions applied to a range query.
pub struct RangeOptions {
    /// Keep only this channel.
    #[serde(default)]
    pub channel: Option<ChannelSelector>,
    /// Keep only this band (ignored for min/max tracks).
    #[serde(default)]
    pub band: Option<usize>,
    /// Restrict lookup to one calculator.
    #[serde(default)]
    pub calculator_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Every analysis frame of a track inside a timeline tick window.
pub struct FeatureRange {
    /// Audio source id.
    pub source_id: String,
    /// Timeline track id.
    pub track_id: String,
    /// Requested feature key.
    pub feature_key: String,
    /// Encoding of `data`.
    pub format: FeatureFormat,
    /// Channels per frame in `data`.
    pub channels: usize,
    /// Resolved channel when restricted to one.
    pub channel_index: Option<usize>,
    /// Values per channel per frame in `data`.
    pub values_per_channel: usize,
    /// Frame hop in ticks at the window start.
    pub hop_ticks: f64,
    /// Frames in the window.
    pub frame_count: usize,
    /// Flat values, frame-major then channel then component.
    pub data: Vec<f32>,
    /// Source frame index of each frame.
    pub frame_indices: Vec<usize>,
    /// Timeline tick of each frame.
    pub frame_ticks: Vec<f64>,
    /// Playback time of each frame.
    pub frame_seconds: Vec<f64>,
    /// Timeline tick where the track region starts.
    pub track_start_tick: f64,
    /// Timeline tick where the track region ends, if trimmed.
    pub track_end_tick: Option<f64>,
    /// Requested window start.
    pub window_start_tick: f64,
    /// Requested window end (exclusive).
    pub window_end_tick: f64,
}

impl FeatureRange {
    /// Values of frame `i` (all channels).
    pub fn frame_values(&self, i: usize) -> Option<&[f32]> {
        let stride = self.channels * self.values_per_channel;
        if i >= self.frame_count {
            return None;
        }
        self.data.get(i * stride..(i + 1) * stride)
    }

    /// One display value per frame for `channel` (an index into this range's channels): the
    /// midpoint of min/max pairs, or the first band of float tracks.
    pub fn waveform_points(&self, channel: usize) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        let vpc = self.values_per_channel;
        (0..self.frame_count)
            .filter_map(|i| self.frame_values(i))
            .map(|frame| {
                let v = &frame[channel * vpc..(channel + 1) * vpc];
                if self.format.is_minmax() && v.len() >= 2 {
                    (v[0] + v[1]) * 0.5
                } else {
                    v[0]
                }
            })
            .collect()
    }
}

/// Collect the frames of `track_id`'s `feature_key` whose timeline tick lies in
/// `[start_tick, end_tick)` and whose source tick lies inside the track region.
///
/// `None` when the window is empty, the context does not resolve, or the feature track has no
/// frames. A window that misses every frame yields a range with `frame_count == 0`.
#[tracing::instrument(level = "trace", skip(state, options))]
pub fn sample_audio_feature_range(
    state: &TimelineState,
    track_id: &str,
    feature_key: &str,
    start_tick: f64,
    end_tick: f64,
    options: &RangeOptions,
) -> Option<FeatureRange> {
    let window = TickRange::new(start_tick, end_tick).ok()?;
    if window.is_empty() {
        return None;
    }
    let ctx = resolve_feature_context_with(
        state,
        track_id,
        feature_key,
        options.calculator_id.as_deref(),
    )?;
    let track = ctx.feature_track;
    if track.frame_count == 0 || track.channels == 0 {
        return None;
    }
    let tempo = state.tempo();
    let timebase = FrameTimebase::for_track(track, tempo)?;
    let placement = ctx.placement();

    let channel_index = options.channel.as_ref().map(|selector| {
        resolve_channel(selector, &ctx.channel_context()).unwrap_or_else(|err| {
            tracing::warn!(
                track_id,
                feature_key,
                error = %err,
                "channel selector unresolved, using channel 0"
            );
            0
        })
    });
    let channels = match channel_index {
        Some(c) => c..c + 1,
        None => 0..track.channels,
    };
    let stored_vpc = track.values_per_channel();
    let components = match options.band {
        Some(b) if !track.format.is_minmax() => {
            let b = b.min(stored_vpc - 1);
            b..b + 1
        }
        _ => 0..stored_vpc,
    };

    let source_window = window.shift(placement.to_source_tick(0.0));
    let (src_start, src_end) = (source_window.start, source_window.end);
    let last = track.frame_count as i64 - 1;
    let first_candidate = (timebase.frame_position(src_start, tempo).floor() as i64 - 1).max(0);
    let last_candidate = (timebase.frame_position(src_end, tempo).ceil() as i64 + 1).min(last);

    let mut range = FeatureRange {
        source_id: ctx.source_id.to_owned(),
        track_id: track_id.to_owned(),
        feature_key: feature_key.to_owned(),
        format: track.format.clone(),
        channels: channels.len(),
        channel_index,
        values_per_channel: components.len(),
        hop_ticks: timebase.hop_ticks_at(src_start, tempo),
        frame_count: 0,
        data: Vec::new(),
        frame_indices: Vec::new(),
        frame_ticks: Vec::new(),
        frame_seconds: Vec::new(),
        track_start_tick: placement.timeline_start_tick(),
        track_end_tick: placement.timeline_end_tick(),
        window_start_tick: start_tick,
        window_end_tick: end_tick,
    };

    for i in first_candidate..=last_candidate {
        let frame = i as usize;
        let source_tick = timebase.frame_source_tick(frame as f64, tempo);
        if !placement.contains_source_tick(source_tick) {
            continue;
        }
        let tick = placement.to_timeline_tick(source_tick);
        if !window.contains(tick) {
            continue;
        }
        for c in channels.clone() {
            let Some(values) = track.channel_values(frame, c) else {
                continue;
            };
            range.data.extend_from_slice(&values[components.clone()]);
        }
        range.frame_indices.push(frame);
        range.frame_ticks.push(tick);
        range.frame_seconds.push(tempo.ticks_to_seconds(tick));
    }
    range.frame_count = range.frame_indices.len();
    Some(range)
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/range.rs"]
mod tests;
