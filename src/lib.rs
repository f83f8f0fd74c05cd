//! audioscope samples pre-computed audio analysis (waveform min/max, spectrogram bins, RMS) at
//! playback times for timeline-driven visualizers.
//!
//! Times are mapped through a tempo-aware tick domain onto each track's analysis frames:
//!
//! - Hold timeline state in a [`TimelineStore`] and take immutable snapshots
//! - Describe what to sample with an [`AudioFeatureDescriptor`]
//! - Query single frames and history windows through a caching [`FeatureSampler`], or whole tick
//!   windows with [`sample_audio_feature_range`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Feature analysis model, descriptors and lookups.
pub mod features;
/// Frame, history and range sampling.
pub mod sampling;
/// Timeline tracks and state ownership.
pub mod timeline;
/// Tempo map and time conversion.
pub mod timing;

pub use crate::foundation::core::TickRange;
pub use crate::foundation::error::{ScopeError, ScopeResult};

pub use crate::features::channel::{
    ChannelContext, ChannelResolutionError, resolve_channel, resolve_descriptor_channel,
    resolve_descriptor_channel_index,
};
pub use crate::features::context::{
    FeatureContext, resolve_feature_context, resolve_feature_context_with,
};
pub use crate::features::descriptor::{
    AudioFeatureDescriptor, ChannelSelector, SampleInterpolation, SamplingOptions,
    SemanticChannel,
};
pub use crate::features::model::{
    AudioFeatureCache, AudioFeatureTrack, ChannelLayout, FeatureFormat, TempoProjection,
};
pub use crate::sampling::diagnostics::{
    DiagnosticsLog, FallbackReason, HybridCacheFallback, TempoAlignedDiagnostics,
};
pub use crate::sampling::range::{FeatureRange, RangeOptions, sample_audio_feature_range};
pub use crate::sampling::sampler::{
    FeatureHistoryFrame, FeatureSampler, SamplerOpts, SamplerStats,
};
pub use crate::sampling::view::{
    AudioFeatureFrameSample, InterpolatingView, InterpolationKernel, TempoAlignedFrame,
    TempoAlignedRequest, TempoAlignedView,
};
pub use crate::timeline::model::{TimelineSnapshotDef, TimelineState, Track, TrackKind};
pub use crate::timeline::store::TimelineStore;
pub use crate::timing::tempo::{TempoChange, TempoMap};

#[cfg(test)]
#[path = "../tests/unit/fixtures.rs"]
mod fixtures;
