use crate::foundation::error::{ScopeError, ScopeResult};

/// Half-open tick range `[start, end)` in timeline space.
///
/// Ticks are tempo-relative musical time. Fractional ticks are legal intermediate values.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickRange {
    /// Inclusive range start.
    pub start: f64,
    /// Exclusive range end.
    pub end: f64,
}

impl TickRange {
    /// Create a validated range with finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> ScopeResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ScopeError::validation("TickRange bounds must be finite"));
        }
        if start > end {
            return Err(ScopeError::validation("TickRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Return `true` when the range covers no ticks.
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Return `true` when `tick` is inside `[start, end)`.
    pub fn contains(self, tick: f64) -> bool {
        self.start <= tick && tick < self.end
    }

    /// Shift both bounds by `delta` ticks.
    pub fn shift(self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

/// Round a fractional tick to the integer tick used for cache keys.
pub(crate) fn round_tick(tick: f64) -> i64 {
    if !tick.is_finite() {
        return 0;
    }
    tick.round() as i64
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
