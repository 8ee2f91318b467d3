//! Drives the steppers across the viewport and publishes curve snapshots.

use crate::curve::{Curve, CurveSet, Point, Segment};
use crate::error::EngineError;
use crate::solvers::{Method, Rk4Variant};
use crate::step_size::StepSize;
use crate::traits::InitialValueProblem;
use crate::viewport::ViewportBound;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Upper bound on segments per curve.
    pub max_steps: usize,
    /// Any `|y|` above this counts as divergence.
    pub divergence_limit: f64,
    pub rk4_variant: Rk4Variant,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            divergence_limit: 1e6,
            rk4_variant: Rk4Variant::Classical,
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_steps == 0 {
            return Err(EngineError::InvalidSettings {
                message: "max_steps must be greater than zero.".to_string(),
            });
        }
        if !self.divergence_limit.is_finite() || self.divergence_limit <= 0.0 {
            return Err(EngineError::InvalidSettings {
                message: "divergence_limit must be finite and positive.".to_string(),
            });
        }
        Ok(())
    }
}

/// Walks one method forward from the initial point, yielding a segment per step.
///
/// Iteration ends once the current point leaves the bound. A divergent step or
/// an exhausted step budget yields a single `Err` and then ends the iteration.
pub struct Tracer<'a, P, B> {
    problem: &'a P,
    bound: &'a B,
    method: Method,
    variant: Rk4Variant,
    step: f64,
    max_steps: usize,
    divergence_limit: f64,
    x: f64,
    y: f64,
    steps: usize,
    finished: bool,
}

impl<'a, P, B> Tracer<'a, P, B>
where
    P: InitialValueProblem<f64>,
    B: ViewportBound,
{
    pub fn new(
        problem: &'a P,
        bound: &'a B,
        method: Method,
        step_size: StepSize,
        settings: &GeneratorSettings,
    ) -> Self {
        let (x, y) = problem.initial_point();
        Self {
            problem,
            bound,
            method,
            variant: settings.rk4_variant,
            step: method.effective_step(step_size.value()),
            max_steps: settings.max_steps,
            divergence_limit: settings.divergence_limit,
            x,
            y,
            steps: 0,
            finished: false,
        }
    }

    /// The point the next step would start from.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn finish(&mut self, err: EngineError) -> Option<Result<Segment, EngineError>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<'a, P, B> Iterator for Tracer<'a, P, B>
where
    P: InitialValueProblem<f64>,
    B: ViewportBound,
{
    type Item = Result<Segment, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || !self.bound.contains(self.x, self.y) {
            self.finished = true;
            return None;
        }

        if self.steps >= self.max_steps {
            let err = EngineError::IterationLimit {
                method: self.method,
                steps: self.steps,
            };
            return self.finish(err);
        }

        let (x_next, y_next) = self
            .method
            .step(self.problem, self.variant, self.x, self.y, self.step);

        if !y_next.is_finite() || y_next.abs() > self.divergence_limit {
            let err = EngineError::NumericalDivergence {
                method: self.method,
                x: self.x,
                y: self.y,
                next_y: y_next,
            };
            return self.finish(err);
        }

        let segment = Segment {
            start: Point::new(self.x, self.y),
            end: Point::new(x_next, y_next),
        };
        self.x = x_next;
        self.y = y_next;
        self.steps += 1;
        Some(Ok(segment))
    }
}

/// Traces a single method to completion.
pub fn trace_curve<P, B>(
    problem: &P,
    bound: &B,
    method: Method,
    step_size: StepSize,
    settings: &GeneratorSettings,
) -> Curve
where
    P: InitialValueProblem<f64>,
    B: ViewportBound,
{
    let mut segments = Vec::new();
    let mut truncation = None;

    for item in Tracer::new(problem, bound, method, step_size, settings) {
        match item {
            Ok(segment) => segments.push(segment),
            Err(err) => truncation = Some(err),
        }
    }

    Curve::new(
        method,
        method.effective_step(step_size.value()),
        segments,
        truncation,
    )
}

fn build_curve_set<P, B>(
    problem: &P,
    bound: &B,
    step_size: StepSize,
    settings: &GeneratorSettings,
) -> CurveSet
where
    P: InitialValueProblem<f64>,
    B: ViewportBound,
{
    let trace = |method| trace_curve(problem, bound, method, step_size, settings);
    CurveSet {
        step_size: step_size.value(),
        euler: trace(Method::Euler),
        rk2: trace(Method::Rk2),
        rk4: trace(Method::Rk4),
        exact: trace(Method::Exact),
    }
}

/// Owns the problem, bound and step size, and caches the last complete
/// [`CurveSet`] until a parameter changes.
pub struct CurveGenerator<P, B> {
    problem: P,
    bound: B,
    step_size: StepSize,
    settings: GeneratorSettings,
    snapshot: Option<CurveSet>,
}

impl<P, B> CurveGenerator<P, B>
where
    P: InitialValueProblem<f64>,
    B: ViewportBound,
{
    /// Creates a generator at the default step size. Nothing is traced until
    /// the first [`regenerate`](Self::regenerate).
    pub fn configure(problem: P, bound: B) -> Self {
        Self {
            problem,
            bound,
            step_size: StepSize::default(),
            settings: GeneratorSettings::default(),
            snapshot: None,
        }
    }

    pub fn with_settings(mut self, settings: GeneratorSettings) -> Result<Self, EngineError> {
        self.set_settings(settings)?;
        Ok(self)
    }

    pub fn set_settings(&mut self, settings: GeneratorSettings) -> Result<(), EngineError> {
        settings.validate()?;
        if settings != self.settings {
            self.settings = settings;
            self.snapshot = None;
        }
        Ok(())
    }

    /// Validates and stores a new step size. The cached curves are dropped
    /// unless the value is unchanged.
    pub fn set_step_size(&mut self, h: f64) -> Result<(), EngineError> {
        let step_size = StepSize::new(h)?;
        if step_size != self.step_size {
            self.step_size = step_size;
            self.snapshot = None;
        }
        Ok(())
    }

    /// Returns the curves for the current parameters, tracing them first if
    /// the cache was invalidated. The set is complete before it is stored.
    pub fn regenerate(&mut self) -> &CurveSet {
        let Self {
            problem,
            bound,
            step_size,
            settings,
            snapshot,
        } = self;
        snapshot.get_or_insert_with(|| build_curve_set(problem, bound, *step_size, settings))
    }

    /// The last complete set, if it is still valid.
    pub fn snapshot(&self) -> Option<&CurveSet> {
        self.snapshot.as_ref()
    }

    pub fn step_size(&self) -> StepSize {
        self.step_size
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn bound(&self) -> &B {
        &self.bound
    }
}
