use crate::{
    curve::Curve,
    generator::GeneratorSettings,
    solvers::{Method, Rk4Variant},
    traits::InitialValueProblem,
};
use anyhow::{bail, Result};
use serde::Serialize;

/// Deviation of a traced curve from the closed-form solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorSummary {
    /// Largest `|y - y_exact(x)|` over all vertices.
    pub max_abs: f64,
    /// Error at the last vertex.
    pub final_abs: f64,
    pub final_x: f64,
}

/// Compares every vertex of `curve` with the exact solution at the same `x`.
pub fn curve_error<P>(problem: &P, curve: &Curve) -> Result<ErrorSummary>
where
    P: InitialValueProblem<f64>,
{
    if curve.is_empty() {
        bail!("Cannot measure the error of an empty {} curve.", curve.method);
    }

    let (_, y0) = problem.initial_point();
    let mut summary = ErrorSummary {
        max_abs: 0.0,
        final_abs: 0.0,
        final_x: 0.0,
    };
    for point in curve.points() {
        let err = (point.y - problem.exact_solution(point.x, y0)).abs();
        summary.max_abs = summary.max_abs.max(err);
        summary.final_abs = err;
        summary.final_x = point.x;
    }
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergenceSample {
    pub step_size: f64,
    pub steps: usize,
    /// `|y_n - y_exact(x_end)|`.
    pub error: f64,
    /// `log2` of the error ratio to the previous sample, scaled by the step ratio.
    pub observed_order: Option<f64>,
}

/// Integrates from the initial point to `x_end` with each step size and
/// reports the global error there.
///
/// Each step size must divide `x_end - x0` into a whole number of steps
/// (within `1e-9`). No viewport or step-size grid applies here.
pub fn convergence_study<P>(
    problem: &P,
    method: Method,
    variant: Rk4Variant,
    x_end: f64,
    step_sizes: &[f64],
) -> Result<Vec<ConvergenceSample>>
where
    P: InitialValueProblem<f64>,
{
    if method == Method::Exact {
        bail!("The exact solution has no discretization error to study.");
    }
    if step_sizes.is_empty() {
        bail!("Convergence study requires at least one step size.");
    }
    let (x0, y0) = problem.initial_point();
    if !x_end.is_finite() || x_end <= x0 {
        bail!("x_end must be finite and greater than x0 = {}.", x0);
    }

    let span = x_end - x0;
    let mut samples: Vec<ConvergenceSample> = Vec::with_capacity(step_sizes.len());
    for &h in step_sizes {
        if !h.is_finite() || h <= 0.0 {
            bail!("Step size {} must be finite and positive.", h);
        }
        let ratio = span / h;
        let steps = ratio.round();
        if steps < 1.0 || (ratio - steps).abs() > 1e-9 * ratio.max(1.0) {
            bail!("Step size {} does not divide the interval [{}, {}].", h, x0, x_end);
        }
        let max_steps = GeneratorSettings::default().max_steps;
        if steps > max_steps as f64 {
            bail!("Step size {} needs more than {} steps.", h, max_steps);
        }
        let steps = steps as usize;

        let (mut x, mut y) = (x0, y0);
        for n in 1..=steps {
            let (_, y_next) = method.step(problem, variant, x, y, h);
            // Index-based abscissae avoid drift from repeated addition.
            x = x0 + n as f64 * h;
            y = y_next;
        }
        let error = (y - problem.exact_solution(x_end, y0)).abs();

        let observed_order = samples.last().and_then(|prev| {
            let step_ratio = (prev.step_size / h).log2();
            if error > 0.0 && prev.error > 0.0 && step_ratio.abs() > f64::EPSILON {
                Some((prev.error / error).log2() / step_ratio)
            } else {
                None
            }
        });

        samples.push(ConvergenceSample {
            step_size: h,
            steps,
            error,
            observed_order,
        });
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CurveGenerator;
    use crate::problem::ForcedDecay;
    use crate::viewport::Viewport;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn observed_orders_match_method_orders() {
        let problem = ForcedDecay::default();
        let steps = [0.1, 0.05, 0.025, 0.0125];
        let expected = [(Method::Euler, 1.0), (Method::Rk2, 2.0), (Method::Rk4, 4.0)];

        for (method, order) in expected {
            let samples =
                convergence_study(&problem, method, Rk4Variant::Classical, 1.0, &steps)
                    .expect("study should run");
            assert_eq!(samples.len(), steps.len());
            assert!(samples[0].observed_order.is_none());
            for pair in samples.windows(2) {
                assert!(pair[1].error < pair[0].error, "{method}: error must shrink");
            }
            let last = samples.last().and_then(|s| s.observed_order).expect("order");
            assert!((last - order).abs() < 0.25, "{method}: observed order {last}");
        }
    }

    #[test]
    fn rk4_error_shrinks_fastest() {
        let problem = ForcedDecay::default();
        let steps = [0.1, 0.05];
        let final_error = |method| {
            convergence_study(&problem, method, Rk4Variant::Classical, 1.0, &steps)
                .expect("study should run")[1]
                .error
        };
        let euler = final_error(Method::Euler);
        let rk2 = final_error(Method::Rk2);
        let rk4 = final_error(Method::Rk4);
        assert!(rk4 < rk2 && rk2 < euler);
    }

    #[test]
    fn convergence_study_rejects_invalid_inputs() {
        let problem = ForcedDecay::default();
        let classical = Rk4Variant::Classical;
        assert_err_contains(
            convergence_study(&problem, Method::Exact, classical, 1.0, &[0.1]),
            "exact solution",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 1.0, &[]),
            "at least one step size",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 0.0, &[0.1]),
            "x_end",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 1.0, &[-0.1]),
            "finite and positive",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 1.0, &[0.3]),
            "does not divide",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 1.0, &[1e-300]),
            "needs more than",
        );
        assert_err_contains(
            convergence_study(&problem, Method::Euler, classical, 1.0, &[1e-6]),
            "needs more than",
        );
    }

    #[test]
    fn curve_error_measures_generated_curves() {
        let problem = ForcedDecay::default();
        let mut generator = CurveGenerator::configure(problem, Viewport::default());
        let curves = generator.regenerate();

        let exact = curve_error(&problem, &curves.exact).expect("exact error");
        assert!(exact.max_abs < 1e-12);

        let euler = curve_error(&problem, &curves.euler).expect("euler error");
        let rk4 = curve_error(&problem, &curves.rk4).expect("rk4 error");
        assert!(rk4.max_abs < euler.max_abs);
        assert!(rk4.max_abs < 1e-5);
        assert!(euler.final_x >= 5.0);
        assert!(euler.final_abs <= euler.max_abs);
    }
}
