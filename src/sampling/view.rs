//! Tempo-aligned view adapter.
//!
//! The sampler never reads feature buffers itself: it hands a rounded timeline tick and resolved
//! parameters to a [`TempoAlignedView`] and caches what comes back. [`InterpolatingView`] is the
//! default implementation.

use serde::Serialize;

use crate::features::context::{FeatureContext, resolve_feature_context_with};
use crate::features::descriptor::SampleInterpolation;
use crate::features::model::{AudioFeatureTrack, ChannelLayout, FeatureFormat};
use crate::features::timebase::{FrameTimebase, TimebaseKind};
use crate::foundation::error::ScopeResult;
use crate::foundation::math::{catmull_rom, clamp_index, lerp_f32};
use crate::sampling::diagnostics::{FallbackReason, TempoAlignedDiagnostics};
use crate::timeline::model::TimelineState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Interpolation kernel understood by view adapters.
pub enum InterpolationKernel {
    /// Nearest frame.
    Hold,
    /// Linear blend.
    Linear,
    /// Catmull-Rom spline.
    Spline,
}

impl From<SampleInterpolation> for InterpolationKernel {
    fn from(value: SampleInterpolation) -> Self {
        match value {
            SampleInterpolation::Nearest => Self::Hold,
            SampleInterpolation::Linear => Self::Linear,
            SampleInterpolation::Cubic => Self::Spline,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Feature values of one track at one tick.
pub struct AudioFeatureFrameSample {
    /// Values for the selected channel(s) and band(s), channel-major. Min/max tracks yield
    /// `[min, max]` per channel.
    pub values: Vec<f32>,
    /// Channels in the feature track.
    pub channel_count: usize,
    /// Resolved channel, or `None` when all channels are returned.
    pub channel_index: Option<usize>,
    /// Effective channel aliases.
    pub channel_aliases: Option<Vec<String>>,
    /// Effective channel layout.
    pub channel_layout: ChannelLayout,
    /// Encoding of the source track.
    pub format: FeatureFormat,
    /// Frames in the feature track.
    pub frame_count: usize,
    /// Unclamped fractional frame position.
    pub frame_index: f64,
    /// Timeline tick sampled.
    pub tick: i64,
    /// Playback time of `tick`.
    pub time_seconds: f64,
}

impl AudioFeatureFrameSample {
    /// Return `true` when `frame_index` lies within the analyzed frames.
    pub fn is_in_range(&self) -> bool {
        self.frame_count > 0
            && self.frame_index >= 0.0
            && self.frame_index <= (self.frame_count - 1) as f64
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Parameters of one adapter call.
pub struct TempoAlignedRequest<'a> {
    /// Timeline track id.
    pub track_id: &'a str,
    /// Feature key.
    pub feature_key: &'a str,
    /// Calculator restriction.
    pub calculator_id: Option<&'a str>,
    /// Rounded timeline tick.
    pub tick: i64,
    /// Resolved channel, or `None` for all channels.
    pub channel: Option<usize>,
    /// Band, or `None` for all bands.
    pub band: Option<usize>,
    /// Box smoothing radius in frames.
    pub smoothing: u32,
    /// Kernel.
    pub interpolation: InterpolationKernel,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Adapter result.
pub struct TempoAlignedFrame {
    /// The sample, or `None` when nothing can be sampled at the tick.
    pub sample: Option<AudioFeatureFrameSample>,
    /// Diagnostics of the evaluation.
    pub diagnostics: Option<TempoAlignedDiagnostics>,
}

/// Evaluates feature frames at timeline ticks.
pub trait TempoAlignedView {
    /// Evaluate `request` against `state`.
    fn tempo_aligned_frame(
        &self,
        state: &TimelineState,
        request: &TempoAlignedRequest<'_>,
    ) -> ScopeResult<TempoAlignedFrame>;
}

/// Default adapter: locates the frame through the track's timebase and interpolates.
#[derive(Clone, Copy, Debug, Default)]
pub struct InterpolatingView;

impl TempoAlignedView for InterpolatingView {
    fn tempo_aligned_frame(
        &self,
        state: &TimelineState,
        request: &TempoAlignedRequest<'_>,
    ) -> ScopeResult<TempoAlignedFrame> {
        let Some(ctx) = resolve_feature_context_with(
            state,
            request.track_id,
            request.feature_key,
            request.calculator_id,
        ) else {
            return Ok(TempoAlignedFrame::default());
        };

        let tempo = state.tempo();
        let track = ctx.feature_track;
        let placement = ctx.placement();
        let source_tick = placement.to_source_tick(request.tick as f64);
        let mut diagnostics = TempoAlignedDiagnostics {
            source_id: ctx.source_id.to_owned(),
            track_id: ctx.track.id.clone(),
            feature_key: request.feature_key.to_owned(),
            track_key: ctx.track_key.to_owned(),
            timebase: None,
            fallback_reason: None,
            frame_index: None,
            tick: request.tick,
            tempo_revision: tempo.revision(),
        };

        if !placement.contains_source_tick(source_tick) {
            return Ok(degraded(diagnostics, FallbackReason::OutsideRegion));
        }
        if track.frame_count == 0 || track.channels == 0 {
            return Ok(degraded(diagnostics, FallbackReason::EmptyTrack));
        }
        let Some(timebase) = FrameTimebase::for_track(track, tempo) else {
            return Ok(degraded(diagnostics, FallbackReason::NoTimebase));
        };

        let position = timebase.frame_position(source_tick, tempo);
        diagnostics.timebase = Some(timebase.kind());
        diagnostics.frame_index = Some(position);
        if timebase.kind() == TimebaseKind::Seconds {
            diagnostics.fallback_reason = Some(FallbackReason::SecondsTimebase);
        }
        let last = (track.frame_count - 1) as f64;
        if !(0.0..=last).contains(&position) {
            diagnostics.fallback_reason = Some(FallbackReason::OutOfRange);
        }

        let channel = request.channel.map(|c| c.min(track.channels - 1));
        let values = sample_values(track, channel, request, position);
        let time_seconds = tempo.ticks_to_seconds(request.tick as f64);
        let sample = build_sample(&ctx, channel, values, position, request.tick, time_seconds);

        Ok(TempoAlignedFrame {
            sample: Some(sample),
            diagnostics: Some(diagnostics),
        })
    }
}

fn degraded(mut diagnostics: TempoAlignedDiagnostics, reason: FallbackReason) -> TempoAlignedFrame {
    diagnostics.fallback_reason = Some(reason);
    TempoAlignedFrame {
        sample: None,
        diagnostics: Some(diagnostics),
    }
}

fn build_sample(
    ctx: &FeatureContext<'_>,
    channel: Option<usize>,
    values: Vec<f32>,
    position: f64,
    tick: i64,
    time_seconds: f64,
) -> AudioFeatureFrameSample {
    let track = ctx.feature_track;
    AudioFeatureFrameSample {
        values,
        channel_count: track.channels,
        channel_index: channel,
        channel_aliases: ctx.channel_aliases().map(<[String]>::to_vec),
        channel_layout: track.layout(),
        format: track.format.clone(),
        frame_count: track.frame_count,
        frame_index: position,
        tick,
        time_seconds,
    }
}

fn sample_values(
    track: &AudioFeatureTrack,
    channel: Option<usize>,
    request: &TempoAlignedRequest<'_>,
    position: f64,
) -> Vec<f32> {
    let channels = match channel {
        Some(c) => c..c + 1,
        None => 0..track.channels,
    };
    let components = match request.band {
        _ if track.format.is_minmax() => 0..2,
        Some(b) => {
            let b = b.min(track.band_count - 1);
            b..b + 1
        }
        None => 0..track.band_count,
    };

    let mut out = Vec::with_capacity(channels.len() * components.len());
    for c in channels {
        for k in components.clone() {
            out.push(smoothed(
                track,
                c,
                k,
                position,
                request.interpolation,
                request.smoothing,
            ));
        }
    }
    out
}

fn smoothed(
    track: &AudioFeatureTrack,
    channel: usize,
    component: usize,
    position: f64,
    kernel: InterpolationKernel,
    radius: u32,
) -> f32 {
    let at = |p: f64| f64::from(interpolate(track, channel, component, p, kernel));
    if radius == 0 {
        return at(position) as f32;
    }
    let r = i64::from(radius);
    let last_frame = (track.frame_count - 1) as f64;
    // Offsets in [first, last] stay inside the track; the rest clamp to an edge frame and are
    // counted instead of evaluated.
    let first = ((-position).ceil() as i64).clamp(-r, r + 1);
    let last = ((last_frame - position).floor() as i64).clamp(first - 1, r);
    let below = (first + r) as f64;
    let above = (r - last) as f64;
    let inner: f64 = (first..=last).map(|k| at(position + k as f64)).sum();
    let sum = below * at(0.0) + above * at(last_frame) + inner;
    (sum / (2 * r + 1) as f64) as f32
}

fn interpolate(
    track: &AudioFeatureTrack,
    channel: usize,
    component: usize,
    position: f64,
    kernel: InterpolationKernel,
) -> f32 {
    let n = track.frame_count;
    let value_at = |i: i64| {
        track
            .channel_values(clamp_index(i, n), channel)
            .and_then(|v| v.get(component))
            .copied()
            .unwrap_or(0.0)
    };
    let p = position.clamp(0.0, (n - 1) as f64);
    let i0 = p.floor();
    let t = p - i0;
    let i0 = i0 as i64;
    match kernel {
        InterpolationKernel::Hold => value_at(p.round() as i64),
        InterpolationKernel::Linear => lerp_f32(value_at(i0), value_at(i0 + 1), t),
        InterpolationKernel::Spline => catmull_rom(
            value_at(i0 - 1),
            value_at(i0),
            value_at(i0 + 1),
            value_at(i0 + 2),
            t,
        ),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/view.rs"]
mod tests;
