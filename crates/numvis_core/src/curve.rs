//! Piecewise-linear curves handed to the renderer.

use crate::error::EngineError;
use crate::solvers::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// One method's trace, in order of increasing `x`.
///
/// A curve cut short by a numerical problem carries the report in
/// `truncation`; its segments still end at the last finite point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub method: Method,
    pub step_size: f64,
    segments: Vec<Segment>,
    truncation: Option<EngineError>,
}

impl Curve {
    pub(crate) fn new(
        method: Method,
        step_size: f64,
        segments: Vec<Segment>,
        truncation: Option<EngineError>,
    ) -> Self {
        Self {
            method,
            step_size,
            segments,
            truncation,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The traced vertices: the first segment's start, then every segment end.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments
            .first()
            .map(|segment| segment.start)
            .into_iter()
            .chain(self.segments.iter().map(|segment| segment.end))
    }

    pub fn last_point(&self) -> Option<Point> {
        self.segments.last().map(|segment| segment.end)
    }

    /// Vertices as `[x0, y0, x1, y1, ...]`.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(2 * (self.segments.len() + 1));
        for point in self.points() {
            flat.push(point.x);
            flat.push(point.y);
        }
        flat
    }

    /// Why the curve stopped before leaving the viewport, if it did.
    pub fn truncation(&self) -> Option<&EngineError> {
        self.truncation.as_ref()
    }
}

/// The four curves from a single regeneration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSet {
    pub step_size: f64,
    pub euler: Curve,
    pub rk2: Curve,
    pub rk4: Curve,
    pub exact: Curve,
}

impl CurveSet {
    pub fn get(&self, method: Method) -> &Curve {
        match method {
            Method::Euler => &self.euler,
            Method::Rk2 => &self.rk2,
            Method::Rk4 => &self.rk4,
            Method::Exact => &self.exact,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Curve> {
        Method::ALL.into_iter().map(move |method| self.get(method))
    }

    /// Every truncation report, in `Method::ALL` order.
    pub fn errors(&self) -> Vec<&EngineError> {
        self.iter().filter_map(Curve::truncation).collect()
    }

    /// `Err` with the first truncation report if any curve was cut short.
    pub fn check(&self) -> Result<(), EngineError> {
        match self.iter().find_map(Curve::truncation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
