use std::sync::Arc;

use crate::features::channel::ChannelContext;
use crate::features::model::{AudioFeatureCache, AudioFeatureTrack};
use crate::timeline::model::{Placement, TimelineState, Track, TrackKind};

/// Everything needed to sample one feature of one track.
///
/// Only built when every lookup step succeeds; there is no partial context.
#[derive(Clone, Copy, Debug)]
pub struct FeatureContext<'a> {
    /// The timeline track.
    pub track: &'a Track,
    /// Audio source whose analysis is used.
    pub source_id: &'a str,
    /// The source's feature cache.
    pub cache: &'a Arc<AudioFeatureCache>,
    /// Storage key of the feature track within the cache.
    pub track_key: &'a str,
    /// The feature track.
    pub feature_track: &'a AudioFeatureTrack,
}

impl<'a> FeatureContext<'a> {
    /// Channel resolution facts for this feature track.
    pub fn channel_context(&self) -> ChannelContext<'a> {
        ChannelContext::new(self.feature_track, Some(self.cache.as_ref()))
    }

    /// Placement of the track region on the timeline.
    pub fn placement(&self) -> Placement {
        self.track.placement()
    }

    /// Effective channel aliases (track first, then cache).
    pub fn channel_aliases(&self) -> Option<&'a [String]> {
        self.channel_context().aliases()
    }
}

/// Why a context lookup failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ContextMiss {
    TrackMissing,
    NotAudio,
    CacheMissing { source_id: String },
    FeatureTrackMissing { source_id: String },
}

/// Resolve track → source → feature cache → feature track.
pub fn resolve_feature_context<'a>(
    state: &'a TimelineState,
    track_id: &str,
    feature_key: &str,
) -> Option<FeatureContext<'a>> {
    resolve_feature_context_with(state, track_id, feature_key, None)
}

/// Like [`resolve_feature_context`], restricted to a calculator when `calculator_id` is set.
pub fn resolve_feature_context_with<'a>(
    state: &'a TimelineState,
    track_id: &str,
    feature_key: &str,
    calculator_id: Option<&str>,
) -> Option<FeatureContext<'a>> {
    lookup_feature_context(state, track_id, feature_key, calculator_id).ok()
}

pub(crate) fn lookup_feature_context<'a>(
    state: &'a TimelineState,
    track_id: &str,
    feature_key: &str,
    calculator_id: Option<&str>,
) -> Result<FeatureContext<'a>, ContextMiss> {
    let track = state.track(track_id).ok_or(ContextMiss::TrackMissing)?;
    if track.kind != TrackKind::Audio {
        return Err(ContextMiss::NotAudio);
    }
    let source_id = track.source_id();
    let cache = state
        .feature_cache(source_id)
        .ok_or_else(|| ContextMiss::CacheMissing {
            source_id: source_id.to_owned(),
        })?;
    let (track_key, feature_track) = cache
        .find_track(feature_key, calculator_id)
        .ok_or_else(|| ContextMiss::FeatureTrackMissing {
            source_id: source_id.to_owned(),
        })?;

    Ok(FeatureContext {
        track,
        source_id,
        cache,
        track_key,
        feature_track,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/features/context.rs"]
mod tests;
