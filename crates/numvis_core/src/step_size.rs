use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A step size inside `[MIN, MAX]` lying on the `INCREMENT` grid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct StepSize(f64);

impl StepSize {
    pub const MIN: f64 = 0.05;
    pub const MAX: f64 = 0.5;
    pub const INCREMENT: f64 = 0.05;

    // Slack, in grid ticks, when testing range and grid membership.
    const GRID_TOLERANCE: f64 = 1e-9;

    pub fn new(value: f64) -> Result<Self, EngineError> {
        let slack = Self::GRID_TOLERANCE * Self::INCREMENT;
        if !value.is_finite() || value < Self::MIN - slack || value > Self::MAX + slack {
            return Err(EngineError::StepSizeOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }

        let ticks = value / Self::INCREMENT;
        if (ticks - ticks.round()).abs() > Self::GRID_TOLERANCE {
            return Err(EngineError::StepSizeOffGrid {
                value,
                increment: Self::INCREMENT,
            });
        }

        Ok(Self::from_ticks(ticks.round()))
    }

    // `ticks / 20` rather than `ticks * 0.05`, so 0.15 and 0.35 keep their literal values.
    fn from_ticks(ticks: f64) -> Self {
        Self(ticks / (1.0 / Self::INCREMENT).round())
    }

    /// Rounds `value` to the nearest grid point and clamps it into range.
    /// Non-finite input maps to the minimum.
    pub fn snapped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(Self::MIN);
        }
        let min_ticks = (Self::MIN / Self::INCREMENT).round();
        let max_ticks = (Self::MAX / Self::INCREMENT).round();
        let ticks = (value / Self::INCREMENT).round().clamp(min_ticks, max_ticks);
        Self::from_ticks(ticks)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for StepSize {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<f64> for StepSize {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepSize> for f64 {
    fn from(step: StepSize) -> f64 {
        step.0
    }
}
