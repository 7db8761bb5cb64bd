//! Browser-side checks for the JS bindings.

#![cfg(target_arch = "wasm32")]

use ibp_wasm::WasmSession;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::wasm_bindgen_test;

const SAMPLE: &str = "let x = 5;\nif (x > 0) {\n    let y = 1;\n}\n";

#[wasm_bindgen_test]
fn compile_and_step_round_trip_through_js_values() {
    let mut session = WasmSession::new();
    session.compile(SAMPLE).expect("compiles");

    let first = session.step().expect("steps");
    assert!(first.is_object());

    let ticket = session.begin_auto_run(2).expect("compiled");
    assert!(session.auto_step(ticket).expect("steps").is_object());
    session.edit();
    assert_eq!(session.auto_step(ticket).expect("stale"), JsValue::NULL);
}

#[wasm_bindgen_test]
fn configure_errors_become_js_strings() {
    let mut session = WasmSession::new();
    let error = session.configure(-2, "2", 2).expect_err("negative size");
    assert!(error
        .as_string()
        .is_some_and(|message| message.contains("invalid predictor configuration")));
}
