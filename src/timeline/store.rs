use std::sync::Arc;

use crate::features::model::AudioFeatureCache;
use crate::foundation::error::{ScopeError, ScopeResult};
use crate::timeline::model::{TimelineSnapshotDef, TimelineState, Track};
use crate::timing::tempo::TempoMap;

/// Owner of the timeline state.
///
/// Mutations are copy-on-write: snapshots handed out by [`TimelineStore::snapshot`] never change,
/// and feature caches are replaced whole, never edited in place. Every ingested cache receives a
/// fresh epoch so sample caches built against an older analysis are dropped on next access.
#[derive(Debug)]
pub struct TimelineStore {
    state: Arc<TimelineState>,
    next_epoch: u64,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(TempoMap::default())
    }
}

impl TimelineStore {
    /// Create an empty store with the given tempo map.
    pub fn new(tempo: TempoMap) -> Self {
        Self {
            state: Arc::new(TimelineState {
                tempo,
                ..TimelineState::default()
            }),
            next_epoch: 1,
        }
    }

    /// Build a store from a deserialized snapshot, validating every track and cache.
    pub fn from_snapshot(def: TimelineSnapshotDef) -> ScopeResult<Self> {
        let mut store = Self::new(def.tempo);
        for track in def.tracks {
            store.upsert_track(track)?;
        }
        for (source_id, cache) in def.feature_caches {
            store.ingest_feature_cache(source_id, cache)?;
        }
        Ok(store)
    }

    /// Parse and load a JSON snapshot.
    pub fn from_snapshot_json(json: &str) -> ScopeResult<Self> {
        let def: TimelineSnapshotDef = serde_json::from_str(json)?;
        Self::from_snapshot(def)
    }

    /// Current immutable state snapshot.
    pub fn snapshot(&self) -> Arc<TimelineState> {
        Arc::clone(&self.state)
    }

    /// Insert or replace a track.
    pub fn upsert_track(&mut self, track: Track) -> ScopeResult<()> {
        track.validate()?;
        Arc::make_mut(&mut self.state)
            .tracks
            .insert(track.id.clone(), track);
        Ok(())
    }

    /// Remove a track by id.
    pub fn remove_track(&mut self, id: &str) -> Option<Track> {
        if !self.state.tracks.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.state).tracks.remove(id)
    }

    /// Atomically install (or replace) the analysis result for `source_id`.
    ///
    /// Returns the epoch assigned to the cache.
    pub fn ingest_feature_cache(
        &mut self,
        source_id: impl Into<String>,
        mut cache: AudioFeatureCache,
    ) -> ScopeResult<u64> {
        let source_id = source_id.into();
        if source_id.is_empty() {
            return Err(ScopeError::validation("feature cache source id must be non-empty"));
        }
        cache.apply_defaults();
        cache.validate()?;

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        cache.epoch = epoch;

        tracing::debug!(
            source_id = %source_id,
            epoch,
            tracks = cache.feature_tracks.len(),
            "ingested feature cache"
        );
        Arc::make_mut(&mut self.state)
            .feature_caches
            .insert(source_id, Arc::new(cache));
        Ok(epoch)
    }

    /// Drop the analysis result for `source_id`.
    pub fn remove_feature_cache(&mut self, source_id: &str) -> bool {
        if !self.state.feature_caches.contains_key(source_id) {
            return false;
        }
        Arc::make_mut(&mut self.state)
            .feature_caches
            .remove(source_id)
            .is_some()
    }

    /// Insert or replace a tempo change.
    pub fn set_tempo(&mut self, tick: f64, bpm: f64) -> ScopeResult<()> {
        Arc::make_mut(&mut self.state).tempo.set_tempo(tick, bpm)
    }

    /// Replace the whole tempo map. The revision keeps increasing across replacements.
    pub fn replace_tempo_map(&mut self, mut tempo: TempoMap) {
        let state = Arc::make_mut(&mut self.state);
        tempo.set_revision(state.tempo.revision() + 1);
        state.tempo = tempo;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/store.rs"]
mod tests;
