use crate::curve::{Point, Segment};
use serde::{Deserialize, Serialize};

/// Decides whether a freshly computed point is still drawable.
pub trait ViewportBound {
    fn contains(&self, x: f64, y: f64) -> bool;
}

impl<F: Fn(f64, f64) -> bool> ViewportBound for F {
    fn contains(&self, x: f64, y: f64) -> bool {
        self(x, y)
    }
}

/// A pixel canvas with the origin in its lower-left corner.
///
/// A point is inside while `x * pixels_per_unit < width_px` and
/// `height_px - y * pixels_per_unit > 0`. Drawing uses `baseline_px` as the
/// screen row of `y = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
    pub pixels_per_unit: f64,
    pub baseline_px: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64, pixels_per_unit: f64) -> Self {
        Self {
            width_px,
            height_px,
            pixels_per_unit,
            baseline_px: height_px * 3.0 / 5.0,
        }
    }

    pub fn with_baseline(mut self, baseline_px: f64) -> Self {
        self.baseline_px = baseline_px;
        self
    }

    /// Width of the domain in problem units.
    pub fn horizontal_extent(&self) -> f64 {
        self.width_px / self.pixels_per_unit
    }

    /// Maps a point to screen coordinates (row grows downward).
    pub fn project(&self, point: Point) -> Point {
        Point {
            x: point.x * self.pixels_per_unit,
            y: self.baseline_px - point.y * self.pixels_per_unit,
        }
    }

    pub fn project_segment(&self, segment: &Segment) -> Segment {
        Segment {
            start: self.project(segment.start),
            end: self.project(segment.end),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(600.0, 600.0, 120.0)
    }
}

impl ViewportBound for Viewport {
    fn contains(&self, x: f64, y: f64) -> bool {
        x * self.pixels_per_unit < self.width_px && self.height_px - y * self.pixels_per_unit > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_viewport_covers_five_units() {
        let viewport = Viewport::default();
        assert_eq!(viewport.horizontal_extent(), 5.0);
        assert_eq!(viewport.baseline_px, 360.0);

        assert!(viewport.contains(0.0, 3.0));
        assert!(viewport.contains(4.99, -10.0));
        assert!(!viewport.contains(5.0, 0.0));
        assert!(!viewport.contains(1.0, 5.0));
    }

    #[test]
    fn project_flips_the_vertical_axis() {
        let viewport = Viewport::default();
        assert_eq!(viewport.project(Point::new(0.0, 3.0)), Point::new(0.0, 0.0));
        assert_eq!(viewport.project(Point::new(1.0, 0.0)), Point::new(120.0, 360.0));

        let segment = Segment {
            start: Point::new(0.5, 1.0),
            end: Point::new(1.0, -1.0),
        };
        let projected = viewport.project_segment(&segment);
        assert_eq!(projected.start, Point::new(60.0, 240.0));
        assert_eq!(projected.end, Point::new(120.0, 480.0));
    }

    #[test]
    fn closures_act_as_bounds() {
        let bound = |x: f64, _y: f64| x < 1.0;
        assert!(bound.contains(0.5, 100.0));
        assert!(!bound.contains(1.0, 0.0));
    }
}
