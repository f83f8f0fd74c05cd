use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Layout-relative channel name.
pub enum SemanticChannel {
    /// Left channel of a stereo pair.
    Left,
    /// Right channel of a stereo pair.
    Right,
    /// Mid channel of a mid/side pair.
    Mid,
    /// Side channel of a mid/side pair.
    Side,
    /// The only channel of a mono track.
    Mono,
}

impl SemanticChannel {
    /// Parse a semantic token (`left`/`l`, `right`/`r`, `mid`, `side`, `mono`), ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            "mid" => Some(Self::Mid),
            "side" => Some(Self::Side),
            "mono" => Some(Self::Mono),
            _ => None,
        }
    }

    /// Canonical token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Mid => "mid",
            Self::Side => "side",
            Self::Mono => "mono",
        }
    }
}

impl fmt::Display for SemanticChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
/// Channel selection carried by a descriptor.
///
/// Deserializes from the tagged form (`{"kind": "alias", "value": "L"}`) as well as the loose
/// shapes property bindings produce: a bare number, a bare string, or `{index, alias}`.
pub enum ChannelSelector {
    /// Channel index; fractional values are floored and clamped on resolution.
    Index(f64),
    /// Alias, integer string or semantic token, resolved against the track.
    Alias(String),
    /// Explicit semantic channel.
    Semantic(SemanticChannel),
}

impl ChannelSelector {
    /// Index selector.
    pub fn index(index: usize) -> Self {
        Self::Index(index as f64)
    }

    /// Alias selector.
    pub fn alias(alias: impl Into<String>) -> Self {
        Self::Alias(alias.into())
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Alias(a) => write!(f, "{a}"),
            Self::Semantic(s) => f.write_str(s.as_str()),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum TaggedRepr {
    Index(f64),
    Alias(String),
    Semantic(SemanticChannel),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Tagged(TaggedRepr),
    Number(f64),
    Text(String),
    Fields {
        #[serde(default)]
        index: Option<f64>,
        #[serde(default)]
        alias: Option<String>,
    },
}

impl<'de> Deserialize<'de> for ChannelSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = Repr::deserialize(deserializer)?;
        match repr {
            Repr::Tagged(TaggedRepr::Index(i)) | Repr::Number(i) => Ok(Self::Index(i)),
            Repr::Tagged(TaggedRepr::Alias(a)) | Repr::Text(a) => Ok(Self::Alias(a)),
            Repr::Tagged(TaggedRepr::Semantic(s)) => Ok(Self::Semantic(s)),
            Repr::Fields {
                index: Some(i), ..
            } => Ok(Self::Index(i)),
            Repr::Fields {
                index: None,
                alias: Some(a),
            } => Ok(Self::Alias(a)),
            Repr::Fields {
                index: None,
                alias: None,
            } => Err(serde::de::Error::custom(
                "channel selector needs an index or an alias",
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Interpolation requested by a consumer.
pub enum SampleInterpolation {
    /// Nearest frame.
    Nearest,
    /// Linear blend of the two neighboring frames.
    #[default]
    Linear,
    /// Cubic spline through four neighboring frames.
    Cubic,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// Per-call overrides for descriptor sampling parameters.
pub struct SamplingOptions {
    /// Overrides [`AudioFeatureDescriptor::interpolation`].
    #[serde(default)]
    pub interpolation: Option<SampleInterpolation>,
    /// Overrides [`AudioFeatureDescriptor::smoothing`].
    #[serde(default)]
    pub smoothing: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// What a consumer wants sampled from a track's analysis.
pub struct AudioFeatureDescriptor {
    /// Feature key, e.g. `"waveform"` or `"spectrogram"`.
    pub feature_key: String,
    /// Restrict lookup to one calculator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator_id: Option<String>,
    /// Band index for multi-band features. All bands when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<usize>,
    /// Channel selection. All channels when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelSelector>,
    /// Box smoothing radius in frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<u32>,
    /// Interpolation between frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<SampleInterpolation>,
}

impl AudioFeatureDescriptor {
    /// Descriptor for `feature_key` with every optional field unset.
    pub fn new(feature_key: impl Into<String>) -> Self {
        Self {
            feature_key: feature_key.into(),
            calculator_id: None,
            band: None,
            channel: None,
            smoothing: None,
            interpolation: None,
        }
    }

    /// Set the calculator id.
    pub fn with_calculator(mut self, calculator_id: impl Into<String>) -> Self {
        self.calculator_id = Some(calculator_id.into());
        self
    }

    /// Set the band.
    pub fn with_band(mut self, band: usize) -> Self {
        self.band = Some(band);
        self
    }

    /// Set the channel selector.
    pub fn with_channel(mut self, channel: ChannelSelector) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the smoothing radius.
    pub fn with_smoothing(mut self, radius: u32) -> Self {
        self.smoothing = Some(radius);
        self
    }

    /// Set the interpolation.
    pub fn with_interpolation(mut self, interpolation: SampleInterpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    /// Interpolation after applying `options`.
    pub fn effective_interpolation(&self, options: Option<&SamplingOptions>) -> SampleInterpolation {
        options
            .and_then(|o| o.interpolation)
            .or(self.interpolation)
            .unwrap_or_default()
    }

    /// Smoothing radius after applying `options`.
    pub fn effective_smoothing(&self, options: Option<&SamplingOptions>) -> u32 {
        options
            .and_then(|o| o.smoothing)
            .or(self.smoothing)
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/features/descriptor.rs"]
mod tests;
