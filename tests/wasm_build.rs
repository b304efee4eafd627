//! WASM build test
//!
//! Exercises the exported JS surface under wasm-bindgen-test.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use notation_capture::api::{default_config, parse_pitch_js, ConfigManagerHandle, KeyboardCaptureHandle};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn get(target: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(target, &JsValue::from_str(name)).unwrap()
}

fn key_event(key: &str) -> JsValue {
    let event = js_sys::Object::new();
    js_sys::Reflect::set(&event, &JsValue::from_str("key"), &JsValue::from_str(key)).unwrap();
    event.into()
}

#[wasm_bindgen_test]
fn test_parse_pitch() {
    let info = parse_pitch_js("F#5").unwrap();
    assert_eq!(get(&info, "canonical").as_string().as_deref(), Some("F#5"));
    assert_eq!(get(&info, "midiNumber").as_f64(), Some(78.0));

    assert!(parse_pitch_js("H2").unwrap().is_null());
}

#[wasm_bindgen_test]
fn test_default_config_shape() {
    let config = default_config().unwrap();
    assert_eq!(get(&config, "keyMappings").as_string().as_deref(), Some("default"));
    let behavior = get(&config, "behavior");
    assert_eq!(get(&behavior, "chordModeTimeoutMs").as_f64(), Some(1000.0));
}

#[wasm_bindgen_test]
fn test_handle_capture_flow() {
    let mut handle =
        KeyboardCaptureHandle::new(JsValue::UNDEFINED, JsValue::UNDEFINED, None, JsValue::UNDEFINED).unwrap();
    assert_eq!(handle.mode(), "STOPPED");
    assert!(handle.handle_key(key_event("c")).unwrap().is_null());

    assert!(handle.start());
    let instruction = handle.handle_key(key_event("c")).unwrap();
    assert_eq!(get(&instruction, "type").as_string().as_deref(), Some("note"));

    assert!(handle.commit());
    assert!(!handle.can_undo());
    let committed = js_sys::Array::from(&handle.get_committed_fragments().unwrap());
    assert_eq!(committed.length(), 1);

    handle.destroy();
    assert_eq!(handle.mode(), "STOPPED");
}

/// Let queued promise callbacks and spawned tasks run
async fn settle() {
    for _ in 0..10 {
        JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL)).await.unwrap();
    }
}

/// Listener that records the `code` of every error event
fn error_codes() -> (Closure<dyn FnMut(JsValue)>, Rc<RefCell<Vec<String>>>) {
    let codes = Rc::new(RefCell::new(Vec::new()));
    let seen = codes.clone();
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
        if let Some(code) = get(&event, "code").as_string() {
            seen.borrow_mut().push(code);
        }
    });
    (listener, codes)
}

#[wasm_bindgen_test]
async fn test_rejected_commit_promise_raises_error() {
    let on_commit = js_sys::Function::new_with_args("fragment", "return Promise.reject(new Error('offline'))");
    let mut handle =
        KeyboardCaptureHandle::new(JsValue::UNDEFINED, JsValue::UNDEFINED, Some(on_commit), JsValue::UNDEFINED)
            .unwrap();
    let (listener, codes) = error_codes();
    handle.on("error", listener.as_ref().unchecked_ref::<js_sys::Function>().clone()).unwrap();

    handle.start();
    handle.handle_key(key_event("c")).unwrap();
    assert!(handle.commit());
    assert_eq!(handle.capture().pending_deliveries(), 0);

    settle().await;
    assert_eq!(*codes.borrow(), vec!["COMMIT_HANDLER_ERROR".to_string()]);
}

#[wasm_bindgen_test]
async fn test_destroy_silences_pending_commit_promise() {
    let on_commit = js_sys::Function::new_with_args("fragment", "return Promise.reject(new Error('offline'))");
    let mut handle =
        KeyboardCaptureHandle::new(JsValue::UNDEFINED, JsValue::UNDEFINED, Some(on_commit), JsValue::UNDEFINED)
            .unwrap();
    let (listener, codes) = error_codes();
    handle.on_any(listener.as_ref().unchecked_ref::<js_sys::Function>().clone());

    handle.start();
    handle.handle_key(key_event("c")).unwrap();
    handle.commit();
    handle.destroy();

    settle().await;
    assert!(codes.borrow().is_empty());
}

#[wasm_bindgen_test]
fn test_rejected_apply_config_raises_error() {
    let mut handle =
        KeyboardCaptureHandle::new(JsValue::UNDEFINED, JsValue::UNDEFINED, None, JsValue::UNDEFINED).unwrap();
    let (listener, codes) = error_codes();
    handle.on("error", listener.as_ref().unchecked_ref::<js_sys::Function>().clone()).unwrap();

    let config = js_sys::JSON::parse(r#"{ "behavior": { "undoHistorySize": 0 } }"#).unwrap();
    assert!(handle.apply_config(config).is_err());
    assert_eq!(*codes.borrow(), vec!["INVALID_CONFIG".to_string()]);
}

#[wasm_bindgen_test]
fn test_config_manager_handle() {
    let overrides = js_sys::JSON::parse(r#"{ "rendering": { "theme": "dark" } }"#).unwrap();
    let mut manager = ConfigManagerHandle::new(overrides).unwrap();
    let rendering = get(&manager.get_config().unwrap(), "rendering");
    assert_eq!(get(&rendering, "theme").as_string().as_deref(), Some("dark"));

    let exported = manager.export_config().unwrap();
    assert!(manager.import_config("{ \"behavior\": { \"defaultOctave\": 12 } }").is_err());
    manager.reset();
    manager.import_config(&exported).unwrap();
    let rendering = get(&manager.get_config().unwrap(), "rendering");
    assert_eq!(get(&rendering, "theme").as_string().as_deref(), Some("dark"));

    let yaml = manager.export_yaml().unwrap();
    manager.import_yaml(&yaml).unwrap();

    let mappings = manager.get_key_mappings().unwrap();
    manager.save_preset("stock", mappings).unwrap();
    assert_eq!(manager.preset_names(), vec!["stock".to_string()]);
    manager.load_preset("stock").unwrap();
    assert!(manager.load_preset("missing").is_err());
    assert!(manager.delete_preset("stock"));
    assert!(manager.preset_names().is_empty());
}
