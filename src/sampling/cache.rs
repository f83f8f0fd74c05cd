use std::collections::HashMap;
use std::sync::Arc;

use crate::sampling::view::{AudioFeatureFrameSample, InterpolationKernel};
use crate::timeline::model::{Placement, TimelineState};

/// Default per-feature-track bound on cached samples.
pub const MAX_FEATURE_CACHE_ENTRIES: usize = 128;

/// A cached lookup: `None` records that nothing could be sampled.
pub type CachedSample = Option<Arc<AudioFeatureFrameSample>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identity of one feature track: source id plus storage key.
pub struct FeatureTrackId {
    /// Audio source id.
    pub source_id: String,
    /// Storage key within the source's cache.
    pub track_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Track placement as float bit patterns, so moving or trimming a track changes the key.
pub struct PlacementKey {
    offset_ticks: u64,
    region_start_tick: u64,
    region_end_tick: Option<u64>,
}

impl From<Placement> for PlacementKey {
    fn from(p: Placement) -> Self {
        Self {
            offset_ticks: p.offset_ticks.to_bits(),
            region_start_tick: p.region_start_tick.to_bits(),
            region_end_tick: p.region_end_tick.map(f64::to_bits),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Every parameter that affects a sampled value.
pub struct SampleCacheKey {
    /// Timeline track id; tracks sharing a source differ in placement.
    pub track_id: String,
    /// Placement of the track when the sample was taken.
    pub placement: PlacementKey,
    /// Rounded timeline tick.
    pub tick: i64,
    /// Requested feature key.
    pub feature_key: String,
    /// Calculator restriction.
    pub calculator_id: Option<String>,
    /// Band.
    pub band: Option<usize>,
    /// Resolved channel.
    pub channel: Option<usize>,
    /// Smoothing radius.
    pub smoothing: u32,
    /// Kernel.
    pub interpolation: InterpolationKernel,
}

#[derive(Debug, Default)]
struct TrackSamples {
    epoch: u64,
    tempo_revision: u64,
    entries: HashMap<SampleCacheKey, CachedSample>,
}

impl TrackSamples {
    fn restamp(&mut self, epoch: u64, tempo_revision: u64) {
        if self.epoch != epoch || self.tempo_revision != tempo_revision {
            self.entries.clear();
            self.epoch = epoch;
            self.tempo_revision = tempo_revision;
        }
    }
}

/// Per-feature-track sample memo.
///
/// Each slot is stamped with the feature cache epoch and tempo revision it was filled under; a
/// lookup with a different stamp empties the slot first. When a slot is full, inserting a new key
/// clears it and keeps only that key.
#[derive(Debug)]
pub struct SampleCache {
    slots: HashMap<FeatureTrackId, TrackSamples>,
    max_entries: usize,
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new(MAX_FEATURE_CACHE_ENTRIES)
    }
}

impl SampleCache {
    /// Create a cache holding at most `max_entries` samples per feature track (at least 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up `key`. The outer `None` means "not cached".
    pub fn get(
        &mut self,
        id: &FeatureTrackId,
        epoch: u64,
        tempo_revision: u64,
        key: &SampleCacheKey,
    ) -> Option<CachedSample> {
        let slot = self.slots.get_mut(id)?;
        slot.restamp(epoch, tempo_revision);
        slot.entries.get(key).cloned()
    }

    /// Store `value` under `key`. Returns `true` when the slot was cleared to make room.
    pub fn insert(
        &mut self,
        id: FeatureTrackId,
        epoch: u64,
        tempo_revision: u64,
        key: SampleCacheKey,
        value: CachedSample,
    ) -> bool {
        let slot = self.slots.entry(id).or_insert_with(|| TrackSamples {
            epoch,
            tempo_revision,
            entries: HashMap::new(),
        });
        slot.restamp(epoch, tempo_revision);

        let evicted =
            !slot.entries.contains_key(&key) && slot.entries.len() >= self.max_entries;
        if evicted {
            slot.entries.clear();
        }
        slot.entries.insert(key, value);
        evicted
    }

    /// Entries currently held for `id`.
    pub fn len_for(&self, id: &FeatureTrackId) -> usize {
        self.slots.get(id).map_or(0, |s| s.entries.len())
    }

    /// Number of feature track slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Drop slots whose source cache or feature track is gone from `state`.
    pub fn prune(&mut self, state: &TimelineState) -> usize {
        let before = self.slots.len();
        self.slots.retain(|id, _| {
            state
                .feature_cache(&id.source_id)
                .is_some_and(|c| c.feature_tracks.contains_key(&id.track_key))
        });
        before - self.slots.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/cache.rs"]
mod tests;
