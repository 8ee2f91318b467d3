//! WASM bindings for the numvis curve engine.
//!
//! The presentation layer owns drawing and widgets; it configures a
//! `WasmEngine`, forwards slider changes to `set_step_size`, and redraws from
//! `regenerate` or the flattened per-method arrays.

mod engine;

pub use engine::WasmEngine;

#[cfg(test)]
mod tests {
    use super::WasmEngine;

    #[test]
    fn engine_reexport_is_wired() {
        assert!(std::any::type_name::<WasmEngine>().ends_with("WasmEngine"));
    }
}
