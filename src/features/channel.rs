//! Channel selector resolution.
//!
//! Precedence: numeric index, integer string, track alias, cache alias, then semantic token
//! against the track's layout. Anything else is a [`ChannelResolutionError`]; the descriptor
//! wrappers log it and fall back to channel 0.

use crate::features::context::FeatureContext;
use crate::features::descriptor::{AudioFeatureDescriptor, ChannelSelector, SemanticChannel};
use crate::features::model::{AudioFeatureCache, AudioFeatureTrack, ChannelLayout};

/// A selector that matched no channel of the track.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChannelResolutionError {
    /// Not an index, alias or semantic token of the track.
    #[error("selector '{selector}' does not match any of {channel_count} channels")]
    Unmatched {
        /// Selector as written.
        selector: String,
        /// Channels in the track.
        channel_count: usize,
    },

    /// A semantic token that has no meaning for the track's layout.
    #[error("semantic channel '{token}' is not defined for a {layout:?} layout")]
    LayoutMismatch {
        /// Requested semantic channel.
        token: SemanticChannel,
        /// Track layout.
        layout: ChannelLayout,
    },
}

/// Channel facts of one feature track needed to resolve a selector.
#[derive(Clone, Copy, Debug)]
pub struct ChannelContext<'a> {
    /// Channels per frame.
    pub channel_count: usize,
    /// Effective layout.
    pub layout: ChannelLayout,
    /// Aliases declared by the feature track.
    pub track_aliases: Option<&'a [String]>,
    /// Aliases declared by the owning cache.
    pub cache_aliases: Option<&'a [String]>,
}

impl<'a> ChannelContext<'a> {
    /// Context for `track`, with optional cache-level alias fallback.
    pub fn new(track: &'a AudioFeatureTrack, cache: Option<&'a AudioFeatureCache>) -> Self {
        Self {
            channel_count: track.channels,
            layout: track.layout(),
            track_aliases: track.channel_aliases.as_deref(),
            cache_aliases: cache.and_then(|c| c.channel_aliases.as_deref()),
        }
    }

    /// Aliases in effect: the track's own, else the cache's.
    pub fn aliases(&self) -> Option<&'a [String]> {
        self.track_aliases.or(self.cache_aliases)
    }
}

/// Resolve `selector` to a channel index in `[0, channel_count)`.
pub fn resolve_channel(
    selector: &ChannelSelector,
    ctx: &ChannelContext<'_>,
) -> Result<usize, ChannelResolutionError> {
    if ctx.channel_count == 0 {
        return Ok(0);
    }
    match selector {
        ChannelSelector::Index(i) if i.is_finite() => Ok(clamp_channel(*i, ctx.channel_count)),
        ChannelSelector::Index(_) => Err(unmatched(selector, ctx)),
        ChannelSelector::Semantic(token) => resolve_semantic(*token, ctx),
        ChannelSelector::Alias(alias) => resolve_alias(alias, ctx)
            .map(Ok)
            .unwrap_or_else(|| match SemanticChannel::parse(alias) {
                Some(token) => resolve_semantic(token, ctx),
                None => Err(unmatched(selector, ctx)),
            }),
    }
}

fn resolve_alias(alias: &str, ctx: &ChannelContext<'_>) -> Option<usize> {
    let trimmed = alias.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(clamp_channel(i as f64, ctx.channel_count));
    }
    let position = |aliases: &[String]| {
        aliases
            .iter()
            .position(|a| a.trim().eq_ignore_ascii_case(trimmed))
    };
    ctx.track_aliases
        .and_then(position)
        .or_else(|| ctx.cache_aliases.and_then(position))
        .map(|i| i.min(ctx.channel_count - 1))
}

fn resolve_semantic(
    token: SemanticChannel,
    ctx: &ChannelContext<'_>,
) -> Result<usize, ChannelResolutionError> {
    let index = match (ctx.layout, token) {
        (ChannelLayout::Mono, _) => Some(0),
        (ChannelLayout::Stereo, SemanticChannel::Left) => Some(0),
        (ChannelLayout::Stereo, SemanticChannel::Right) => Some(1),
        (ChannelLayout::MidSide, SemanticChannel::Mid) => Some(0),
        (ChannelLayout::MidSide, SemanticChannel::Side) => Some(1),
        _ => None,
    };
    index
        .map(|i| i.min(ctx.channel_count - 1))
        .ok_or(ChannelResolutionError::LayoutMismatch {
            token,
            layout: ctx.layout,
        })
}

fn clamp_channel(value: f64, channel_count: usize) -> usize {
    if value <= 0.0 {
        return 0;
    }
    (value.floor() as usize).min(channel_count - 1)
}

fn unmatched(selector: &ChannelSelector, ctx: &ChannelContext<'_>) -> ChannelResolutionError {
    ChannelResolutionError::Unmatched {
        selector: selector.to_string(),
        channel_count: ctx.channel_count,
    }
}

/// Resolve the descriptor's channel against a feature context.
///
/// `None` when the descriptor selects no channel. Resolution failures are logged and fall back to
/// channel 0.
pub fn resolve_descriptor_channel(
    descriptor: &AudioFeatureDescriptor,
    ctx: &FeatureContext<'_>,
) -> Option<usize> {
    let selector = descriptor.channel.as_ref()?;
    match resolve_channel(selector, &ctx.channel_context()) {
        Ok(index) => Some(index),
        Err(err) => {
            tracing::warn!(
                track_id = %ctx.track.id,
                feature_key = %descriptor.feature_key,
                error = %err,
                "channel selector unresolved, using channel 0"
            );
            Some(0)
        }
    }
}

/// Like [`resolve_descriptor_channel`], with 0 when no channel is selected.
pub fn resolve_descriptor_channel_index(
    descriptor: &AudioFeatureDescriptor,
    ctx: &FeatureContext<'_>,
) -> usize {
    resolve_descriptor_channel(descriptor, ctx).unwrap_or(0)
}

#[cfg(test)]
#[path = "../../tests/unit/features/channel.rs"]
mod tests;
