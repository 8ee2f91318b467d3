//! WASM handle around the curve generator.

use anyhow::{anyhow, Context};
use js_sys::Float64Array;
use numvis_core::expression::ExpressionProblem;
use numvis_core::problem::ForcedDecay;
use numvis_core::traits::InitialValueProblem;
use numvis_core::{CurveGenerator, GeneratorSettings, Method, StepSize, Viewport};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) type DynProblem = Box<dyn InitialValueProblem<f64>>;

#[wasm_bindgen]
pub struct WasmEngine {
    pub(crate) generator: CurveGenerator<DynProblem, Viewport>,
}

/// Slider configuration for the presentation layer.
#[derive(Debug, Clone, Serialize)]
struct StepSizeRange {
    min: f64,
    max: f64,
    increment: f64,
    value: f64,
}

pub(crate) fn build_generator(
    rhs: &str,
    exact: &str,
    x0: f64,
    y0: f64,
    viewport: Viewport,
) -> anyhow::Result<CurveGenerator<DynProblem, Viewport>> {
    if !x0.is_finite() || !y0.is_finite() {
        anyhow::bail!("Initial point must be finite.");
    }
    if !(viewport.width_px > 0.0 && viewport.height_px > 0.0 && viewport.pixels_per_unit > 0.0) {
        anyhow::bail!("Viewport dimensions and scale must be positive.");
    }

    let problem = ExpressionProblem::new(rhs, exact, x0, y0)
        .context("Failed to compile problem expressions")?;
    let problem: DynProblem = Box::new(problem);
    Ok(CurveGenerator::configure(problem, viewport))
}

pub(crate) fn parse_method(name: &str) -> anyhow::Result<Method> {
    Method::from_name(name).ok_or_else(|| anyhow!("Unknown method: {}", name))
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

impl WasmEngine {
    pub(crate) fn flat_curve(
        &mut self,
        method: &str,
        projected: bool,
    ) -> anyhow::Result<Vec<f64>> {
        let method = parse_method(method)?;
        let viewport = *self.generator.bound();
        let curve = self.generator.regenerate().get(method);
        if !projected {
            return Ok(curve.flatten());
        }

        let mut flat = Vec::with_capacity(2 * (curve.len() + 1));
        for point in curve.points() {
            let pixel = viewport.project(point);
            flat.push(pixel.x);
            flat.push(pixel.y);
        }
        Ok(flat)
    }
}

#[wasm_bindgen]
impl WasmEngine {
    /// Builds an engine for `y' = rhs(x, y)` with closed form `exact(x, y0, x0)`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        rhs: &str,
        exact: &str,
        x0: f64,
        y0: f64,
        width_px: f64,
        height_px: f64,
        pixels_per_unit: f64,
    ) -> Result<WasmEngine, JsValue> {
        console_error_panic_hook::set_once();

        let viewport = Viewport::new(width_px, height_px, pixels_per_unit);
        let generator = build_generator(rhs, exact, x0, y0, viewport).map_err(to_js_error)?;
        Ok(WasmEngine { generator })
    }

    /// `y' = -2y + cos(4x)`, `y(0) = 3` on the default 600px canvas.
    pub fn demo() -> WasmEngine {
        console_error_panic_hook::set_once();

        let problem: DynProblem = Box::new(ForcedDecay::default());
        WasmEngine {
            generator: CurveGenerator::configure(problem, Viewport::default()),
        }
    }

    pub fn set_step_size(&mut self, h: f64) -> Result<(), JsValue> {
        self.generator
            .set_step_size(h)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Snaps `h` to the slider grid, applies it and returns the value used.
    pub fn snap_step_size(&mut self, h: f64) -> Result<f64, JsValue> {
        let snapped = StepSize::snapped(h).value();
        self.set_step_size(snapped)?;
        Ok(snapped)
    }

    pub fn step_size(&self) -> f64 {
        self.generator.step_size().value()
    }

    pub fn step_size_range(&self) -> Result<JsValue, JsValue> {
        let range = StepSizeRange {
            min: StepSize::MIN,
            max: StepSize::MAX,
            increment: StepSize::INCREMENT,
            value: self.step_size(),
        };
        to_value(&range).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn set_settings(&mut self, settings_val: JsValue) -> Result<(), JsValue> {
        let settings: GeneratorSettings = from_value(settings_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid generator settings: {}", e)))?;
        self.generator
            .set_settings(settings)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Returns the four curves of the current step size as one object.
    pub fn regenerate(&mut self) -> Result<JsValue, JsValue> {
        let curves = self.generator.regenerate();
        to_value(curves).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Curve vertices as `[x0, y0, x1, y1, ...]` in problem units.
    pub fn curve_coordinates(&mut self, method: &str) -> Result<Float64Array, JsValue> {
        let flat = self.flat_curve(method, false).map_err(to_js_error)?;
        Ok(Float64Array::from(flat.as_slice()))
    }

    /// Curve vertices projected into canvas pixels.
    pub fn curve_pixels(&mut self, method: &str) -> Result<Float64Array, JsValue> {
        let flat = self.flat_curve(method, true).map_err(to_js_error)?;
        Ok(Float64Array::from(flat.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RHS: &str = "-2*y + cos(4*x)";
    const EXACT: &str = "0.1*cos(4*x) + 0.2*sin(4*x) + 2.9*exp(-2*x)";

    #[test]
    fn build_generator_rejects_invalid_equation() {
        let result = build_generator("1 +", EXACT, 0.0, 3.0, Viewport::default());
        let message = format!("{:#}", result.err().expect("expected parse error"));
        assert!(message.contains("Failed to compile problem expressions"));
        assert!(message.contains("Unexpected end"));
    }

    #[test]
    fn build_generator_rejects_deeply_nested_equation() {
        let nested = format!("{}x{}", "(".repeat(200_000), ")".repeat(200_000));
        let result = build_generator(&nested, EXACT, 0.0, 3.0, Viewport::default());
        let message = format!("{:#}", result.err().expect("expected length error"));
        assert!(message.contains("more than"), "{message}");

        let nested = format!("{}x{}", "(".repeat(1_000), ")".repeat(1_000));
        let result = build_generator(&nested, EXACT, 0.0, 3.0, Viewport::default());
        let message = format!("{:#}", result.err().expect("expected depth error"));
        assert!(message.contains("nests deeper"), "{message}");
    }

    #[test]
    fn build_generator_rejects_degenerate_viewport() {
        let viewport = Viewport::new(600.0, 600.0, 0.0);
        let result = build_generator(RHS, EXACT, 0.0, 3.0, viewport);
        assert!(result.is_err(), "expected viewport error");

        let result = build_generator(RHS, EXACT, f64::NAN, 3.0, Viewport::default());
        assert!(result.is_err(), "expected initial point error");
    }

    #[test]
    fn expression_engine_matches_demo_engine() {
        let generator = build_generator(RHS, EXACT, 0.0, 3.0, Viewport::default())
            .expect("generator should build");
        let mut typed = WasmEngine { generator };
        let mut demo = WasmEngine::demo();

        for method in ["euler", "rk2", "rk4", "exact"] {
            let a = typed.flat_curve(method, false).expect("typed curve");
            let b = demo.flat_curve(method, false).expect("demo curve");
            assert_eq!(a.len(), b.len(), "{method}");
            for (u, v) in a.iter().zip(&b) {
                assert!((u - v).abs() < 1e-12, "{method}");
            }
        }
    }

    #[test]
    fn step_size_updates_and_snaps() {
        let mut engine = WasmEngine::demo();
        assert_eq!(engine.step_size(), 0.05);

        engine.set_step_size(0.25).expect("valid step");
        assert_eq!(engine.step_size(), 0.25);

        let snapped = engine.snap_step_size(0.33).expect("snapped step");
        assert!((snapped - 0.35).abs() < 1e-12);
        assert_eq!(engine.step_size(), snapped);
    }

    #[test]
    fn flat_curve_starts_at_initial_point() {
        let mut engine = WasmEngine::demo();
        engine.set_step_size(0.5).expect("valid step");

        let flat = engine.flat_curve("euler", false).expect("curve");
        assert_eq!(&flat[..2], &[0.0, 3.0]);
        assert_eq!(flat.len(), 2 * 11);

        let pixels = engine.flat_curve("euler", true).expect("pixels");
        assert_eq!(&pixels[..2], &[0.0, 0.0]);
        assert_eq!(pixels[2], 60.0);
    }

    #[test]
    fn flat_curve_rejects_unknown_method() {
        let mut engine = WasmEngine::demo();
        let err = engine.flat_curve("heun", false).expect_err("unknown method");
        assert!(err.to_string().contains("Unknown method: heun"));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use numvis_core::Rk4Variant;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn set_step_size_rejects_out_of_range() {
        let mut engine = WasmEngine::demo();
        let err = engine.set_step_size(0.6).expect_err("out of range");
        let message = err.as_string().unwrap_or_default();
        assert!(message.contains("outside"));
        assert_eq!(engine.step_size(), 0.05);
    }

    #[wasm_bindgen_test]
    fn constructor_rejects_invalid_equation() {
        let result = WasmEngine::new("1 +", "x", 0.0, 1.0, 600.0, 600.0, 120.0);
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Failed to compile problem expressions"));
    }

    #[wasm_bindgen_test]
    fn set_settings_rejects_invalid_values() {
        let mut engine = WasmEngine::demo();
        let err = engine
            .set_settings(JsValue::from_str("nope"))
            .expect_err("invalid settings");
        assert!(err
            .as_string()
            .unwrap_or_default()
            .contains("Invalid generator settings"));

        let zero_steps = GeneratorSettings {
            max_steps: 0,
            ..GeneratorSettings::default()
        };
        let err = engine
            .set_settings(to_value(&zero_steps).expect("settings"))
            .expect_err("zero max_steps");
        assert!(err.as_string().unwrap_or_default().contains("max_steps"));
    }

    #[wasm_bindgen_test]
    fn set_settings_switches_rk4_variant() {
        let mut engine = WasmEngine::demo();
        let legacy = GeneratorSettings {
            rk4_variant: Rk4Variant::Legacy,
            ..GeneratorSettings::default()
        };
        engine
            .set_settings(to_value(&legacy).expect("settings"))
            .expect("valid settings");
        let coords = engine.curve_coordinates("rk4").expect("coordinates").to_vec();
        assert!((coords[3] - 2.761935340407357).abs() < 1e-12);
    }

    #[wasm_bindgen_test]
    fn regenerate_and_range_serialize() {
        let mut engine = WasmEngine::demo();
        assert!(engine.regenerate().expect("curves").is_object());
        assert!(engine.step_size_range().expect("range").is_object());
        let pixels = engine.curve_pixels("exact").expect("pixels");
        assert!(pixels.length() > 0);
        assert!(engine.curve_pixels("nope").is_err());
    }
}
