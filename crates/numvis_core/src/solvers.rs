//! Single-step discretization schemes.
//!
//! Every function here is pure: the next point depends only on the explicit
//! arguments, so the same inputs always produce bit-identical outputs.

use crate::traits::{InitialValueProblem, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step used by the closed-form reference curve, independent of the
/// configured step size of the numerical curves.
pub const EXACT_STEP: f64 = 0.05;

/// Which `x` the fourth RK4 slope is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rk4Variant {
    /// `k4 = f(x + h, y + h*k3)`.
    #[default]
    Classical,
    /// `k4 = f(x, y + h*k3)`, reproducing historical output bit for bit.
    Legacy,
}

/// The curves the engine traces side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Euler,
    Rk2,
    Rk4,
    Exact,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Euler, Method::Rk2, Method::Rk4, Method::Exact];

    /// Looks a method up by its lowercase name (`"euler"`, `"rk2"`, `"rk4"`, `"exact"`).
    pub fn from_name(name: &str) -> Option<Method> {
        match name.trim().to_ascii_lowercase().as_str() {
            "euler" => Some(Method::Euler),
            "rk2" => Some(Method::Rk2),
            "rk4" => Some(Method::Rk4),
            "exact" => Some(Method::Exact),
            _ => None,
        }
    }

    /// Step actually taken by this method when the engine is configured with `configured`.
    pub fn effective_step(self, configured: f64) -> f64 {
        match self {
            Method::Exact => EXACT_STEP,
            _ => configured,
        }
    }

    /// Advances `(x, y)` by one step of size `h`.
    ///
    /// The exact method ignores `y` and samples the closed-form solution at `x + h`.
    pub fn step<T: Scalar>(
        self,
        problem: &impl InitialValueProblem<T>,
        variant: Rk4Variant,
        x: T,
        y: T,
        h: T,
    ) -> (T, T) {
        let rhs = |x: T, y: T| problem.rhs(x, y);
        match self {
            Method::Euler => euler_step(x, y, h, rhs),
            Method::Rk2 => rk2_step(x, y, h, rhs),
            Method::Rk4 => match variant {
                Rk4Variant::Classical => rk4_step(x, y, h, rhs),
                Rk4Variant::Legacy => rk4_legacy_step(x, y, h, rhs),
            },
            Method::Exact => {
                let (_, y0) = problem.initial_point();
                exact_step(x, h, |x| problem.exact_solution(x, y0))
            }
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Euler => "Euler",
            Method::Rk2 => "RK2",
            Method::Rk4 => "RK4",
            Method::Exact => "Exact",
        };
        f.write_str(name)
    }
}

fn two<T: Scalar>() -> T {
    T::one() + T::one()
}

/// Forward Euler: `y + h*f(x, y)`.
pub fn euler_step<T: Scalar>(x: T, y: T, h: T, rhs: impl Fn(T, T) -> T) -> (T, T) {
    (x + h, y + h * rhs(x, y))
}

/// Explicit midpoint rule.
pub fn rk2_step<T: Scalar>(x: T, y: T, h: T, rhs: impl Fn(T, T) -> T) -> (T, T) {
    let half = two::<T>().recip();

    // k1 = f(x, y)
    let k1 = rhs(x, y);
    // k2 = f(x + h/2, y + h*k1/2)
    let k2 = rhs(x + h * half, y + h * k1 * half);

    (x + h, y + h * k2)
}

/// Classical fourth-order Runge-Kutta.
pub fn rk4_step<T: Scalar>(x: T, y: T, h: T, rhs: impl Fn(T, T) -> T) -> (T, T) {
    let two = two::<T>();
    let half = two.recip();
    let sixth = (two + two + two).recip();

    // k1 = f(x, y)
    let k1 = rhs(x, y);
    // k2 = f(x + h/2, y + h*k1/2)
    let k2 = rhs(x + h * half, y + h * k1 * half);
    // k3 = f(x + h/2, y + h*k2/2)
    let k3 = rhs(x + h * half, y + h * k2 * half);
    // k4 = f(x + h, y + h*k3)
    let k4 = rhs(x + h, y + h * k3);

    // y_next = y + h/6 * (k1 + 2k2 + 2k3 + k4)
    (x + h, y + h * sixth * (k1 + two * k2 + two * k3 + k4))
}

/// RK4 with the fourth slope taken at the step's starting `x`.
pub fn rk4_legacy_step<T: Scalar>(x: T, y: T, h: T, rhs: impl Fn(T, T) -> T) -> (T, T) {
    let two = two::<T>();
    let half = two.recip();
    let sixth = (two + two + two).recip();

    let k1 = rhs(x, y);
    let k2 = rhs(x + h * half, y + h * k1 * half);
    let k3 = rhs(x + h * half, y + h * k2 * half);
    let k4 = rhs(x, y + h * k3);

    (x + h, y + h * sixth * (k1 + two * k2 + two * k3 + k4))
}

/// Samples the closed-form solution one step ahead.
pub fn exact_step<T: Scalar>(x: T, h: T, exact: impl Fn(T) -> T) -> (T, T) {
    let x_next = x + h;
    (x_next, exact(x_next))
}
