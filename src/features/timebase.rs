use serde::Serialize;

use crate::features::model::AudioFeatureTrack;
use crate::timing::tempo::TempoMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Axis a feature track's frames are laid out on.
pub enum TimebaseKind {
    /// Fixed hop in ticks.
    Ticks,
    /// Fixed hop in seconds, mapped through the tempo map.
    Seconds,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Mapping between source-relative ticks and fractional frame positions.
pub enum FrameTimebase {
    /// Frame `i` sits at source tick `start_tick + i * hop_ticks`.
    Ticks {
        /// Source tick of frame 0.
        start_tick: f64,
        /// Ticks per frame.
        hop_ticks: f64,
    },
    /// Frame `i` sits at source second `start_seconds + i * hop_seconds`.
    Seconds {
        /// Source time of frame 0.
        start_seconds: f64,
        /// Seconds per frame.
        hop_seconds: f64,
    },
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl FrameTimebase {
    /// Pick the timebase for `track`: tempo projection, then `hop_ticks`, then `hop_seconds`.
    pub fn for_track(track: &AudioFeatureTrack, tempo: &TempoMap) -> Option<Self> {
        if let Some(p) = track.tempo_projection
            && positive(p.hop_ticks)
            && p.start_tick.is_finite()
        {
            return Some(Self::Ticks {
                start_tick: p.start_tick,
                hop_ticks: p.hop_ticks,
            });
        }
        if let Some(hop_ticks) = track.hop_ticks
            && positive(hop_ticks)
        {
            return Some(Self::Ticks {
                start_tick: tempo.seconds_to_ticks(track.start_seconds()),
                hop_ticks,
            });
        }
        if positive(track.hop_seconds) {
            return Some(Self::Seconds {
                start_seconds: track.start_seconds(),
                hop_seconds: track.hop_seconds,
            });
        }
        None
    }

    /// Axis kind.
    pub fn kind(&self) -> TimebaseKind {
        match self {
            Self::Ticks { .. } => TimebaseKind::Ticks,
            Self::Seconds { .. } => TimebaseKind::Seconds,
        }
    }

    /// Fractional frame position of `source_tick`.
    pub fn frame_position(&self, source_tick: f64, tempo: &TempoMap) -> f64 {
        match *self {
            Self::Ticks {
                start_tick,
                hop_ticks,
            } => (source_tick - start_tick) / hop_ticks,
            Self::Seconds {
                start_seconds,
                hop_seconds,
            } => (tempo.ticks_to_seconds(source_tick) - start_seconds) / hop_seconds,
        }
    }

    /// Source tick of (fractional) frame `frame`.
    pub fn frame_source_tick(&self, frame: f64, tempo: &TempoMap) -> f64 {
        match *self {
            Self::Ticks {
                start_tick,
                hop_ticks,
            } => start_tick + frame * hop_ticks,
            Self::Seconds {
                start_seconds,
                hop_seconds,
            } => tempo.seconds_to_ticks(start_seconds + frame * hop_seconds),
        }
    }

    /// Length of one hop in ticks starting at `source_tick`.
    pub fn hop_ticks_at(&self, source_tick: f64, tempo: &TempoMap) -> f64 {
        match *self {
            Self::Ticks { hop_ticks, .. } => hop_ticks,
            Self::Seconds { hop_seconds, .. } => {
                tempo.seconds_span_to_ticks(tempo.ticks_to_seconds(source_tick), hop_seconds)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/features/timebase.rs"]
mod tests;
