//! Tempo map and seconds ↔ ticks conversion.
//!
//! Ticks are PPQ based musical time (960 ticks per quarter note by default). The map is
//! piecewise-constant: each [`TempoChange`] holds until the next one. Every mutation bumps
//! [`TempoMap::revision`] so tick-keyed caches built against an older map can be discarded.

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ScopeError, ScopeResult};

/// Pulses per quarter note used when a map does not specify one.
pub const DEFAULT_TICKS_PER_QUARTER: u32 = 960;

/// Tempo used by [`TempoMap::default`].
pub const DEFAULT_BPM: f64 = 120.0;

/// Tempo change event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Position in ticks.
    pub tick: f64,
    /// Tempo in beats (quarter notes) per minute from `tick` on.
    pub bpm: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TempoMapDef {
    #[serde(default = "default_ticks_per_quarter")]
    ticks_per_quarter: u32,
    #[serde(default)]
    changes: Vec<TempoChange>,
}

fn default_ticks_per_quarter() -> u32 {
    DEFAULT_TICKS_PER_QUARTER
}

/// Piecewise-constant tempo map shared by the whole timeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "TempoMapDef", into = "TempoMapDef")]
pub struct TempoMap {
    ticks_per_quarter: u32,
    /// Sorted by tick, first entry always at tick 0.
    changes: Vec<TempoChange>,
    /// Absolute seconds at which each change starts.
    segment_start_secs: Vec<f64>,
    revision: u64,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            changes: vec![TempoChange {
                tick: 0.0,
                bpm: DEFAULT_BPM,
            }],
            segment_start_secs: vec![0.0],
            revision: 0,
        }
    }
}

impl TryFrom<TempoMapDef> for TempoMap {
    type Error = ScopeError;

    fn try_from(def: TempoMapDef) -> ScopeResult<Self> {
        Self::new(def.ticks_per_quarter, def.changes)
    }
}

impl From<TempoMap> for TempoMapDef {
    fn from(map: TempoMap) -> Self {
        Self {
            ticks_per_quarter: map.ticks_per_quarter,
            changes: map.changes,
        }
    }
}

impl TempoMap {
    /// Build a validated map from unordered tempo changes.
    ///
    /// An empty change list yields [`DEFAULT_BPM`]. When no change sits at tick 0, the earliest
    /// tempo is extended back to tick 0. Duplicate ticks keep the last entry.
    pub fn new(ticks_per_quarter: u32, changes: Vec<TempoChange>) -> ScopeResult<Self> {
        if ticks_per_quarter == 0 {
            return Err(ScopeError::validation("ticks_per_quarter must be > 0"));
        }
        for c in &changes {
            validate_change(*c)?;
        }

        let mut sorted = changes;
        sorted.sort_by(|a, b| a.tick.total_cmp(&b.tick));
        let mut deduped: Vec<TempoChange> = Vec::with_capacity(sorted.len());
        for c in sorted {
            match deduped.last_mut() {
                Some(last) if last.tick == c.tick => *last = c,
                _ => deduped.push(c),
            }
        }

        let mut map = Self {
            ticks_per_quarter,
            changes: deduped,
            segment_start_secs: Vec::new(),
            revision: 0,
        };
        map.anchor_at_zero();
        map.rebuild();
        Ok(map)
    }

    /// Build a single-tempo map.
    pub fn constant(bpm: f64) -> ScopeResult<Self> {
        Self::new(
            DEFAULT_TICKS_PER_QUARTER,
            vec![TempoChange { tick: 0.0, bpm }],
        )
    }

    /// Ticks per quarter note.
    pub fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    /// Tempo changes sorted by tick.
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Monotonic mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Tempo in BPM in effect at `tick`.
    pub fn tempo_at_tick(&self, tick: f64) -> f64 {
        self.changes[self.change_index_for_tick(tick)].bpm
    }

    /// Insert or replace the tempo change at `tick`.
    pub fn set_tempo(&mut self, tick: f64, bpm: f64) -> ScopeResult<()> {
        let change = TempoChange { tick, bpm };
        validate_change(change)?;

        match self
            .changes
            .binary_search_by(|c| c.tick.total_cmp(&tick))
        {
            Ok(i) => self.changes[i] = change,
            Err(i) => self.changes.insert(i, change),
        }
        self.rebuild();
        self.revision += 1;
        Ok(())
    }

    /// Remove the tempo change at exactly `tick`.
    ///
    /// The anchor change at tick 0 cannot be removed; returns `false` when nothing was removed.
    pub fn remove_tempo(&mut self, tick: f64) -> bool {
        if tick == 0.0 {
            return false;
        }
        let Some(i) = self.changes.iter().position(|c| c.tick == tick) else {
            return false;
        };
        self.changes.remove(i);
        self.rebuild();
        self.revision += 1;
        true
    }

    /// Convert playback seconds to (fractional) ticks.
    ///
    /// Negative times extrapolate with the first tempo. Non-finite input maps to tick 0.
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        let i = self
            .segment_start_secs
            .partition_point(|&s| s <= seconds)
            .saturating_sub(1);
        let change = self.changes[i];
        change.tick + (seconds - self.segment_start_secs[i]) * self.ticks_per_second(change.bpm)
    }

    /// Convert (fractional) ticks to playback seconds.
    ///
    /// Negative ticks extrapolate with the first tempo. Non-finite input maps to 0 seconds.
    pub fn ticks_to_seconds(&self, tick: f64) -> f64 {
        if !tick.is_finite() {
            return 0.0;
        }
        let i = self.change_index_for_tick(tick);
        let change = self.changes[i];
        self.segment_start_secs[i] + (tick - change.tick) / self.ticks_per_second(change.bpm)
    }

    /// Duration of `seconds` expressed in ticks, measured from `at_seconds`.
    pub fn seconds_span_to_ticks(&self, at_seconds: f64, seconds: f64) -> f64 {
        self.seconds_to_ticks(at_seconds + seconds) - self.seconds_to_ticks(at_seconds)
    }

    fn ticks_per_second(&self, bpm: f64) -> f64 {
        bpm / 60.0 * f64::from(self.ticks_per_quarter)
    }

    fn change_index_for_tick(&self, tick: f64) -> usize {
        self.changes
            .partition_point(|c| c.tick <= tick)
            .saturating_sub(1)
    }

    fn anchor_at_zero(&mut self) {
        match self.changes.first().copied() {
            None => self.changes.push(TempoChange {
                tick: 0.0,
                bpm: DEFAULT_BPM,
            }),
            Some(first) if first.tick > 0.0 => self.changes.insert(
                0,
                TempoChange {
                    tick: 0.0,
                    bpm: first.bpm,
                },
            ),
            Some(_) => {}
        }
    }

    fn rebuild(&mut self) {
        self.anchor_at_zero();
        let mut starts = Vec::with_capacity(self.changes.len());
        let mut secs = 0.0;
        for (i, c) in self.changes.iter().enumerate() {
            if i > 0 {
                let prev = self.changes[i - 1];
                secs += (c.tick - prev.tick) / self.ticks_per_second(prev.bpm);
            }
            starts.push(secs);
        }
        self.segment_start_secs = starts;
    }
}

fn validate_change(c: TempoChange) -> ScopeResult<()> {
    if !c.tick.is_finite() || c.tick < 0.0 {
        return Err(ScopeError::validation(
            "tempo change tick must be finite and >= 0",
        ));
    }
    if !c.bpm.is_finite() || c.bpm <= 0.0 {
        return Err(ScopeError::validation("tempo bpm must be finite and > 0"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/timing/tempo.rs"]
mod tests;
