//! Adapters from JS objects to the capture collaborator traits

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use super::helpers::{describe_js_error, is_absent, serialize};
use crate::capture::{CommitSink, Delivery, KeySource, SinkError};
use crate::config::RenderingOptions;
use crate::models::{Fragment, MusicalElement};
use crate::renderers::{RenderError, RenderSurface, Renderer};
use crate::shortcuts::KeyInput;
use crate::wasm_warn;

/// Call `target[method](...args)`
fn call_method(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: js_sys::Function = js_sys::Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let args: js_sys::Array = args.iter().collect();
    function.apply(target, &args)
}

fn has_method(target: &JsValue, method: &str) -> bool {
    js_sys::Reflect::get(target, &JsValue::from_str(method))
        .map(|value| value.is_function())
        .unwrap_or(false)
}

/// A JS object implementing the renderer methods in camelCase
pub struct JsRenderer {
    target: JsValue,
}

impl JsRenderer {
    pub fn new(target: JsValue) -> Self {
        Self { target }
    }

    fn call_quietly(&self, method: &str, args: &[JsValue]) {
        if let Err(e) = call_method(&self.target, method, args) {
            wasm_warn!("renderer.{} failed: {}", method, describe_js_error(&e));
        }
    }
}

impl Renderer for JsRenderer {
    fn initialize(&mut self, surface: &RenderSurface, options: &RenderingOptions) -> Result<(), RenderError> {
        let surface = serialize(surface, "surface").map_err(|e| RenderError::InitFailed(describe_js_error(&e)))?;
        let options = serialize(options, "rendering options").map_err(|e| RenderError::InitFailed(describe_js_error(&e)))?;
        call_method(&self.target, "initialize", &[surface, options])
            .map(|_| ())
            .map_err(|e| RenderError::InitFailed(describe_js_error(&e)))
    }

    fn render(&mut self, fragment: &Fragment) -> Result<(), RenderError> {
        let fragment = serialize(fragment, "fragment").map_err(|e| RenderError::RenderFailed(describe_js_error(&e)))?;
        call_method(&self.target, "render", &[fragment])
            .map(|_| ())
            .map_err(|e| RenderError::RenderFailed(describe_js_error(&e)))
    }

    fn update(&mut self, elements: &[MusicalElement]) -> Result<(), RenderError> {
        let elements = serialize(&elements, "elements").map_err(|e| RenderError::RenderFailed(describe_js_error(&e)))?;
        call_method(&self.target, "update", &[elements])
            .map(|_| ())
            .map_err(|e| RenderError::RenderFailed(describe_js_error(&e)))
    }

    fn highlight(&mut self, index: usize) {
        self.call_quietly("highlight", &[JsValue::from_f64(index as f64)]);
    }

    fn clear_highlight(&mut self) {
        self.call_quietly("clearHighlight", &[]);
    }

    fn clear(&mut self) {
        self.call_quietly("clear", &[]);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.call_quietly("resize", &[JsValue::from(width), JsValue::from(height)]);
    }

    fn destroy(&mut self) {
        self.call_quietly("destroy", &[]);
    }

    /// Objects without `isAvailable` are assumed ready
    fn is_available(&self) -> bool {
        if !has_method(&self.target, "isAvailable") {
            return !is_absent(&self.target);
        }
        call_method(&self.target, "isAvailable", &[])
            .map(|value| value.as_bool().unwrap_or(false))
            .unwrap_or(false)
    }
}

/// A JS commit handler: `(fragment) => void | Promise`
///
/// A synchronous throw fails the delivery right away. A returned promise
/// becomes a pending delivery that settles with it.
pub struct JsCommitSink {
    handler: js_sys::Function,
}

impl JsCommitSink {
    pub fn new(handler: js_sys::Function) -> Self {
        Self { handler }
    }
}

impl CommitSink for JsCommitSink {
    fn deliver(&mut self, fragment: Fragment) -> Delivery {
        let fragment_js = match serialize(&fragment, "committed fragment") {
            Ok(value) => value,
            Err(e) => return Delivery::failed(describe_js_error(&e)),
        };

        let returned = match self.handler.call1(&JsValue::NULL, &fragment_js) {
            Ok(value) => value,
            Err(e) => return Delivery::failed(describe_js_error(&e)),
        };

        match returned.dyn_into::<js_sys::Promise>() {
            Ok(promise) => Delivery::pending(async move {
                JsFuture::from(promise)
                    .await
                    .map(|_| ())
                    .map_err(|reason| SinkError::new(describe_js_error(&reason)))
            }),
            Err(_) => Delivery::ok(),
        }
    }
}

/// Optional host hooks called when capture attaches or detaches its
/// keyboard listener
pub struct JsKeySource {
    target: JsValue,
}

impl JsKeySource {
    pub fn new(target: JsValue) -> Self {
        Self { target }
    }
}

impl KeySource for JsKeySource {
    fn attach(&mut self) {
        if has_method(&self.target, "attach") {
            if let Err(e) = call_method(&self.target, "attach", &[]) {
                wasm_warn!("keySource.attach failed: {}", describe_js_error(&e));
            }
        }
    }

    fn detach(&mut self) {
        if has_method(&self.target, "detach") {
            if let Err(e) = call_method(&self.target, "detach", &[]) {
                wasm_warn!("keySource.detach failed: {}", describe_js_error(&e));
            }
        }
    }
}

fn get_bool(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

/// Read a DOM `KeyboardEvent` (or a plain object of the same shape)
///
/// Events whose target is an `<input>`, `<textarea>`, `<select>` or a
/// content-editable element are flagged as text input.
pub fn key_input_from_js(event: &JsValue) -> Result<KeyInput, JsValue> {
    let key = js_sys::Reflect::get(event, &JsValue::from_str("key"))?
        .as_string()
        .ok_or_else(|| JsValue::from_str("Key event has no `key` string"))?;

    let mut input = KeyInput::new(key);
    input.shift_key = get_bool(event, "shiftKey");
    input.alt_key = get_bool(event, "altKey");
    input.ctrl_key = get_bool(event, "ctrlKey");
    input.meta_key = get_bool(event, "metaKey");
    input.target_is_text_input = get_bool(event, "targetIsTextInput");

    if let Ok(target) = js_sys::Reflect::get(event, &JsValue::from_str("target")) {
        if !is_absent(&target) {
            let tag = js_sys::Reflect::get(&target, &JsValue::from_str("tagName"))
                .ok()
                .and_then(|value| value.as_string())
                .unwrap_or_default()
                .to_uppercase();
            if matches!(tag.as_str(), "INPUT" | "TEXTAREA" | "SELECT") || get_bool(&target, "isContentEditable") {
                input.target_is_text_input = true;
            }
        }
    }
    Ok(input)
}
