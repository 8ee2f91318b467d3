use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the steppers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A first-order initial-value problem `y' = f(x, y)`, `y(x0) = y0`,
/// together with its closed-form solution.
pub trait InitialValueProblem<T: Scalar> {
    /// Evaluates the right-hand side `f(x, y)`.
    fn rhs(&self, x: T, y: T) -> T;

    /// Evaluates the closed-form solution at `x` for the initial value `y0`.
    fn exact_solution(&self, x: T, y0: T) -> T;

    /// Returns the initial condition `(x0, y0)`.
    fn initial_point(&self) -> (T, T);
}

impl<T: Scalar, P: InitialValueProblem<T> + ?Sized> InitialValueProblem<T> for &P {
    fn rhs(&self, x: T, y: T) -> T {
        (**self).rhs(x, y)
    }

    fn exact_solution(&self, x: T, y0: T) -> T {
        (**self).exact_solution(x, y0)
    }

    fn initial_point(&self) -> (T, T) {
        (**self).initial_point()
    }
}

impl<T: Scalar, P: InitialValueProblem<T> + ?Sized> InitialValueProblem<T> for Box<P> {
    fn rhs(&self, x: T, y: T) -> T {
        (**self).rhs(x, y)
    }

    fn exact_solution(&self, x: T, y0: T) -> T {
        (**self).exact_solution(x, y0)
    }

    fn initial_point(&self) -> (T, T) {
        (**self).initial_point()
    }
}
