use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ScopeError, ScopeResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Sample encoding of a feature track's data buffer.
pub enum FeatureFormat {
    /// Two values (min, max) per channel per frame.
    #[serde(rename = "waveform-minmax")]
    WaveformMinMax,
    /// `band_count` plain values per channel per frame.
    #[serde(rename = "float32")]
    Float32,
    /// Any other calculator-specific tag, laid out like [`FeatureFormat::Float32`].
    #[serde(untagged)]
    Other(String),
}

impl FeatureFormat {
    /// Return `true` for min/max pair encoding.
    pub fn is_minmax(&self) -> bool {
        matches!(self, Self::WaveformMinMax)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Semantic arrangement of a track's channels.
pub enum ChannelLayout {
    /// Single channel.
    Mono,
    /// Left/right pair.
    Stereo,
    /// Mid/side pair.
    MidSide,
    /// Arbitrary channel set without semantic names.
    #[default]
    Multi,
}

impl ChannelLayout {
    /// Layout implied by a bare channel count.
    pub fn infer(channels: usize) -> Self {
        match channels {
            0 | 1 => Self::Mono,
            2 => Self::Stereo,
            _ => Self::Multi,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// Projection of analysis frames onto the tick grid.
pub struct TempoProjection {
    /// Ticks between consecutive frames.
    pub hop_ticks: f64,
    /// Source-relative tick of frame 0.
    #[serde(default)]
    pub start_tick: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// Optional analysis metadata carried by a feature track.
pub struct FeatureMetadata {
    /// Analysis sample rate in Hz.
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// FFT size used for spectral features.
    #[serde(default)]
    pub fft_size: Option<u32>,
    /// Decibel floor/ceiling used to normalize spectral values.
    #[serde(default)]
    pub decibel_range: Option<[f32; 2]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// One analyzed feature stream (waveform, spectrogram, RMS, ...) for one audio source.
///
/// Immutable once stored: re-analysis replaces the whole owning [`AudioFeatureCache`].
pub struct AudioFeatureTrack {
    /// Feature key, e.g. `"rms"` or `"spectrogram"`.
    pub key: String,
    /// Identifier of the calculator that produced the data.
    #[serde(default)]
    pub calculator_id: String,
    /// Calculator version.
    #[serde(default)]
    pub version: u32,
    /// Number of analysis frames.
    pub frame_count: usize,
    /// Number of channels per frame.
    pub channels: usize,
    /// Values per channel per frame for multi-band float features.
    #[serde(default = "default_band_count")]
    pub band_count: usize,
    /// Hop in ticks, when the calculator projected its hop onto the tick grid.
    #[serde(default)]
    pub hop_ticks: Option<f64>,
    /// Hop in seconds.
    #[serde(default)]
    pub hop_seconds: f64,
    /// Source time of frame 0 in seconds. Inherited from the cache when absent.
    #[serde(default)]
    pub start_time_seconds: Option<f64>,
    /// Tempo projection (hop ticks + reference tick).
    #[serde(default)]
    pub tempo_projection: Option<TempoProjection>,
    /// Encoding of `data`.
    pub format: FeatureFormat,
    /// Flat sample buffer, frame-major then channel then band.
    pub data: Vec<f32>,
    /// Per-channel aliases, indexed by channel.
    #[serde(default)]
    pub channel_aliases: Option<Vec<String>>,
    /// Semantic channel layout. Inferred from `channels` when absent.
    #[serde(default)]
    pub channel_layout: Option<ChannelLayout>,
    /// Analysis metadata.
    #[serde(default)]
    pub metadata: Option<FeatureMetadata>,
}

fn default_band_count() -> usize {
    1
}

impl AudioFeatureTrack {
    /// Source time of frame 0, 0 when unset.
    pub fn start_seconds(&self) -> f64 {
        self.start_time_seconds.unwrap_or(0.0)
    }

    /// Values stored per channel per frame: 2 for min/max pairs, `band_count` otherwise.
    pub fn values_per_channel(&self) -> usize {
        if self.format.is_minmax() {
            2
        } else {
            self.band_count
        }
    }

    /// Values stored per frame across all channels.
    pub fn frame_stride(&self) -> usize {
        self.channels * self.values_per_channel()
    }

    /// Effective channel layout.
    pub fn layout(&self) -> ChannelLayout {
        self.channel_layout
            .unwrap_or_else(|| ChannelLayout::infer(self.channels))
    }

    /// All values of one frame, or `None` when `frame` is out of bounds.
    pub fn frame_values(&self, frame: usize) -> Option<&[f32]> {
        if frame >= self.frame_count {
            return None;
        }
        let stride = self.frame_stride();
        self.data.get(frame * stride..(frame + 1) * stride)
    }

    /// Values of one channel within one frame.
    pub fn channel_values(&self, frame: usize, channel: usize) -> Option<&[f32]> {
        if channel >= self.channels {
            return None;
        }
        let vpc = self.values_per_channel();
        self.frame_values(frame)
            .and_then(|f| f.get(channel * vpc..(channel + 1) * vpc))
    }

    /// Validate buffer and timing invariants.
    pub fn validate(&self) -> ScopeResult<()> {
        if self.key.is_empty() {
            return Err(ScopeError::validation("feature track key must be non-empty"));
        }
        if self.channels == 0 && self.frame_count > 0 {
            return Err(ScopeError::validation(format!(
                "feature track '{}' has frames but no channels",
                self.key
            )));
        }
        if self.band_count == 0 {
            return Err(ScopeError::validation(format!(
                "feature track '{}' band_count must be > 0",
                self.key
            )));
        }
        if self.format.is_minmax() && self.band_count != 1 {
            return Err(ScopeError::validation(format!(
                "waveform-minmax track '{}' must have band_count 1",
                self.key
            )));
        }

        let expected = self.frame_count * self.frame_stride();
        if self.data.len() != expected {
            return Err(ScopeError::validation(format!(
                "feature track '{}' holds {} values, expected {} ({} frames x {} channels x {})",
                self.key,
                self.data.len(),
                expected,
                self.frame_count,
                self.channels,
                self.values_per_channel()
            )));
        }

        let projected = self
            .tempo_projection
            .is_some_and(|p| p.hop_ticks.is_finite() && p.hop_ticks > 0.0);
        let hop_ticks = self.hop_ticks.is_some_and(|h| h.is_finite() && h > 0.0);
        let hop_seconds = self.hop_seconds.is_finite() && self.hop_seconds > 0.0;
        if self.frame_count > 0 && !(projected || hop_ticks || hop_seconds) {
            return Err(ScopeError::validation(format!(
                "feature track '{}' needs a positive hop in ticks or seconds",
                self.key
            )));
        }
        if self.start_time_seconds.is_some_and(|s| !s.is_finite()) {
            return Err(ScopeError::validation(format!(
                "feature track '{}' start time must be finite",
                self.key
            )));
        }

        if let Some(aliases) = &self.channel_aliases
            && aliases.len() > self.channels
        {
            return Err(ScopeError::validation(format!(
                "feature track '{}' has {} aliases for {} channels",
                self.key,
                aliases.len(),
                self.channels
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// Analysis parameters shared by every track of a cache.
pub struct AnalysisParams {
    /// Analysis window size in samples.
    #[serde(default)]
    pub window_size: Option<u32>,
    /// Analysis hop size in samples.
    #[serde(default)]
    pub hop_size: Option<u32>,
    /// Source sample rate in Hz.
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Version per calculator id.
    #[serde(default)]
    pub calculator_versions: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// One audio source's complete feature set.
///
/// Created or replaced atomically per source when analysis completes. The `epoch` is assigned by
/// [`crate::TimelineStore`] on ingest and identifies this particular analysis result.
pub struct AudioFeatureCache {
    /// Feature tracks keyed by storage key.
    #[serde(default)]
    pub feature_tracks: BTreeMap<String, AudioFeatureTrack>,
    /// Source-level default hop in ticks.
    #[serde(default)]
    pub hop_ticks: Option<f64>,
    /// Source-level default hop in seconds.
    #[serde(default)]
    pub hop_seconds: Option<f64>,
    /// Source-level start time in seconds.
    #[serde(default)]
    pub start_time_seconds: Option<f64>,
    /// Analysis parameters.
    #[serde(default)]
    pub analysis: AnalysisParams,
    /// Fallback channel aliases for tracks without their own.
    #[serde(default)]
    pub channel_aliases: Option<Vec<String>>,
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl AudioFeatureCache {
    /// Ingest epoch assigned by the store (0 until ingested).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Find a feature track by feature key and optional calculator id.
    ///
    /// Returns the storage key alongside the track. The storage key equal to `feature_key` is tried
    /// first; otherwise any track whose `key` matches (and whose calculator matches, if requested)
    /// is used.
    pub fn find_track(
        &self,
        feature_key: &str,
        calculator_id: Option<&str>,
    ) -> Option<(&str, &AudioFeatureTrack)> {
        let calc_ok = |t: &AudioFeatureTrack| calculator_id.is_none_or(|c| t.calculator_id == c);

        if let Some((k, t)) = self.feature_tracks.get_key_value(feature_key)
            && calc_ok(t)
        {
            return Some((k.as_str(), t));
        }
        self.feature_tracks
            .iter()
            .find(|(_, t)| t.key == feature_key && calc_ok(t))
            .map(|(k, t)| (k.as_str(), t))
    }

    /// Fill track-level timing gaps from source-level defaults.
    pub(crate) fn apply_defaults(&mut self) {
        for track in self.feature_tracks.values_mut() {
            if track.hop_ticks.is_none() {
                track.hop_ticks = self.hop_ticks;
            }
            if track.hop_seconds <= 0.0
                && let Some(h) = self.hop_seconds
            {
                track.hop_seconds = h;
            }
            if track.start_time_seconds.is_none() {
                track.start_time_seconds = self.start_time_seconds;
            }
        }
    }

    /// Validate every track.
    pub fn validate(&self) -> ScopeResult<()> {
        for (storage_key, track) in &self.feature_tracks {
            track.validate().map_err(|e| {
                ScopeError::validation(format!("feature cache entry '{storage_key}': {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/features/model.rs"]
mod tests;
