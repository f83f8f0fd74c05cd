use crate::features::channel::ChannelResolutionError;

/// Convenience result type used across audioscope.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Top-level error taxonomy used by sampling APIs.
///
/// Absence (unknown track, missing analysis, empty window) is never an error: it is reported as
/// `None` by the sampling functions. Errors are reserved for malformed input.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// Invalid user-provided timeline, tempo or feature data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A channel selector did not match any index, alias or semantic token.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelResolutionError),

    /// Errors while evaluating a feature frame for a tick.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScopeError {
    /// Build a [`ScopeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ScopeError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`ScopeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
