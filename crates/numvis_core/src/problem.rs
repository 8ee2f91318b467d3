//! Concrete initial-value problems.

use crate::traits::InitialValueProblem;
use serde::{Deserialize, Serialize};

/// `y' = -2y + cos(4x)`: a decaying solution driven by a periodic forcing term.
///
/// The general solution is `y = 0.1 cos(4x) + 0.2 sin(4x) + C e^{-2x}`, with
/// `C` fixed by the initial condition. For the default `y(0) = 3`, `C = 2.9`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForcedDecay {
    pub x0: f64,
    pub y0: f64,
}

impl ForcedDecay {
    pub fn new(x0: f64, y0: f64) -> Self {
        Self { x0, y0 }
    }

    fn particular(x: f64) -> f64 {
        0.1 * (4.0 * x).cos() + 0.2 * (4.0 * x).sin()
    }

    /// Coefficient of the homogeneous term `e^{-2x}` for the initial value `y0`.
    pub fn decay_coefficient(&self, y0: f64) -> f64 {
        (y0 - Self::particular(self.x0)) * (2.0 * self.x0).exp()
    }
}

impl Default for ForcedDecay {
    fn default() -> Self {
        Self { x0: 0.0, y0: 3.0 }
    }
}

impl InitialValueProblem<f64> for ForcedDecay {
    fn rhs(&self, x: f64, y: f64) -> f64 {
        -2.0 * y + (4.0 * x).cos()
    }

    fn exact_solution(&self, x: f64, y0: f64) -> f64 {
        Self::particular(x) + self.decay_coefficient(y0) * (-2.0 * x).exp()
    }

    fn initial_point(&self) -> (f64, f64) {
        (self.x0, self.y0)
    }
}

/// A problem assembled from two closures and an initial point.
pub struct FnProblem<R, E> {
    rhs: R,
    exact: E,
    x0: f64,
    y0: f64,
}

impl<R, E> FnProblem<R, E>
where
    R: Fn(f64, f64) -> f64,
    E: Fn(f64, f64) -> f64,
{
    /// `rhs(x, y)` is the slope; `exact(x, y0)` the closed-form solution.
    pub fn new(rhs: R, exact: E, x0: f64, y0: f64) -> Self {
        Self { rhs, exact, x0, y0 }
    }
}

impl<R, E> InitialValueProblem<f64> for FnProblem<R, E>
where
    R: Fn(f64, f64) -> f64,
    E: Fn(f64, f64) -> f64,
{
    fn rhs(&self, x: f64, y: f64) -> f64 {
        (self.rhs)(x, y)
    }

    fn exact_solution(&self, x: f64, y0: f64) -> f64 {
        (self.exact)(x, y0)
    }

    fn initial_point(&self) -> (f64, f64) {
        (self.x0, self.y0)
    }
}
