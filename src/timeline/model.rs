use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::features::model::AudioFeatureCache;
use crate::foundation::error::{ScopeError, ScopeResult};
use crate::timing::tempo::TempoMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Timeline track type.
pub enum TrackKind {
    /// Audio clip track; the only kind with feature data.
    #[default]
    Audio,
    /// MIDI track.
    Midi,
    /// Any other track type.
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// A track placed on the timeline.
pub struct Track {
    /// Unique track id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Track type.
    #[serde(default)]
    pub kind: TrackKind,
    /// Physical audio source. Tracks sharing a source share one analysis cache.
    #[serde(default)]
    pub audio_source_id: Option<String>,
    /// Timeline tick where the (trimmed) region starts playing.
    #[serde(default)]
    pub offset_ticks: f64,
    /// Source-relative tick where the trimmed region starts.
    #[serde(default)]
    pub region_start_tick: Option<f64>,
    /// Source-relative tick where the trimmed region ends (exclusive).
    #[serde(default)]
    pub region_end_tick: Option<f64>,
}

impl Track {
    /// Build an untrimmed audio track at timeline tick 0.
    pub fn audio(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: TrackKind::Audio,
            audio_source_id: None,
            offset_ticks: 0.0,
            region_start_tick: None,
            region_end_tick: None,
        }
    }

    /// Source id used to look up analysis: `audio_source_id`, falling back to the track id.
    pub fn source_id(&self) -> &str {
        self.audio_source_id.as_deref().unwrap_or(&self.id)
    }

    /// Placement of the track region on the timeline.
    pub fn placement(&self) -> Placement {
        Placement {
            offset_ticks: self.offset_ticks,
            region_start_tick: self.region_start_tick.unwrap_or(0.0),
            region_end_tick: self.region_end_tick,
        }
    }

    /// Validate ids and placement.
    pub fn validate(&self) -> ScopeResult<()> {
        if self.id.is_empty() {
            return Err(ScopeError::validation("track id must be non-empty"));
        }
        if !self.offset_ticks.is_finite() {
            return Err(ScopeError::validation(format!(
                "track '{}' offset must be finite",
                self.id
            )));
        }
        let start = self.region_start_tick.unwrap_or(0.0);
        if !start.is_finite() || start < 0.0 {
            return Err(ScopeError::validation(format!(
                "track '{}' region start must be finite and >= 0",
                self.id
            )));
        }
        if let Some(end) = self.region_end_tick
            && (!end.is_finite() || end < start)
        {
            return Err(ScopeError::validation(format!(
                "track '{}' region end must be finite and >= region start",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Mapping between source-relative ticks and timeline ticks for one track.
pub struct Placement {
    /// Timeline tick of the region start.
    pub offset_ticks: f64,
    /// Source-relative region start.
    pub region_start_tick: f64,
    /// Source-relative region end (exclusive), if trimmed.
    pub region_end_tick: Option<f64>,
}

impl Placement {
    /// Timeline tick → source-relative tick.
    pub fn to_source_tick(self, timeline_tick: f64) -> f64 {
        timeline_tick - self.offset_ticks + self.region_start_tick
    }

    /// Source-relative tick → timeline tick.
    pub fn to_timeline_tick(self, source_tick: f64) -> f64 {
        source_tick - self.region_start_tick + self.offset_ticks
    }

    /// Return `true` when `source_tick` lies in `[region_start, region_end)`.
    pub fn contains_source_tick(self, source_tick: f64) -> bool {
        source_tick >= self.region_start_tick
            && self.region_end_tick.is_none_or(|end| source_tick < end)
    }

    /// Timeline tick where the region starts.
    pub fn timeline_start_tick(self) -> f64 {
        self.offset_ticks
    }

    /// Timeline tick where the region ends, if trimmed.
    pub fn timeline_end_tick(self) -> Option<f64> {
        self.region_end_tick.map(|end| self.to_timeline_tick(end))
    }
}

/// Immutable snapshot of timeline state read by the sampling functions.
///
/// Produced by [`crate::TimelineStore::snapshot`]; cloning is cheap for feature data, which is
/// shared behind `Arc`.
#[derive(Clone, Debug, Default)]
pub struct TimelineState {
    pub(crate) tracks: HashMap<String, Track>,
    pub(crate) feature_caches: HashMap<String, Arc<AudioFeatureCache>>,
    pub(crate) tempo: TempoMap,
}

impl TimelineState {
    /// Look up a track by id.
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// Iterate all tracks (unordered).
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Look up the feature cache for a source id.
    pub fn feature_cache(&self, source_id: &str) -> Option<&Arc<AudioFeatureCache>> {
        self.feature_caches.get(source_id)
    }

    /// Shared tempo map.
    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// Serde boundary for a whole timeline snapshot (fixtures, CLI input).
pub struct TimelineSnapshotDef {
    /// Tempo map.
    #[serde(default)]
    pub tempo: TempoMap,
    /// Timeline tracks.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Feature caches keyed by source id.
    #[serde(default)]
    pub feature_caches: BTreeMap<String, AudioFeatureCache>,
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
