//! The `numvis_core` crate traces a first-order initial-value problem with
//! several fixed-step schemes so the results can be drawn side by side
//! against the closed-form solution.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `InitialValueProblem` (slope + exact solution).
//! - **Solvers**: Pure single-step functions (Euler, RK2 midpoint, RK4) and the `Method` dispatcher.
//! - **Generator**: `CurveGenerator`, which owns the step size and publishes complete `CurveSet` snapshots.
//! - **Viewport**: `ViewportBound` predicates deciding where tracing stops.
//! - **Expression**: A small bytecode VM for problems typed in as text.
//! - **Analysis**: Error norms against the exact solution and convergence studies.

pub mod analysis;
pub mod curve;
pub mod error;
pub mod expression;
pub mod generator;
pub mod problem;
pub mod solvers;
pub mod step_size;
pub mod traits;
pub mod viewport;

pub use curve::{Curve, CurveSet, Point, Segment};
pub use error::EngineError;
pub use generator::{CurveGenerator, GeneratorSettings};
pub use solvers::{Method, Rk4Variant, EXACT_STEP};
pub use step_size::StepSize;
pub use viewport::{Viewport, ViewportBound};
