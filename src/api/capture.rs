//! `KeyboardCapture` exported to JavaScript

use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

use super::adapters::{key_input_from_js, JsCommitSink, JsKeySource, JsRenderer};
use super::helpers::{deserialize, describe_js_error, is_absent, serialize, validation_error};
use crate::capture::{CaptureEvent, EventKind, KeyboardCapture, SubscriptionId};
use crate::config::CaptureConfig;
use crate::models::{KeySignature, TimeSignature};
use crate::renderers::RenderSurface;
use crate::shortcuts::{KeyMappings, MappingCategory};
use crate::{wasm_info, wasm_warn};

fn config_from_js(config: JsValue) -> Result<CaptureConfig, JsValue> {
    if is_absent(&config) {
        return Ok(CaptureConfig::default());
    }
    let value: serde_json::Value = deserialize(config, "Invalid capture config")?;
    CaptureConfig::from_value(value).map_err(|e| validation_error(e.to_string()))
}

/// Forward a capture event to a JS callback as a plain object
fn js_listener(callback: js_sys::Function) -> impl FnMut(&CaptureEvent) + 'static {
    move |event: &CaptureEvent| {
        let payload = match serialize(event, "event") {
            Ok(payload) => payload,
            Err(_) => return,
        };
        if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
            wasm_warn!("{} listener threw: {}", event.kind().name(), describe_js_error(&e));
        }
    }
}

#[wasm_bindgen]
pub struct KeyboardCaptureHandle {
    inner: KeyboardCapture,
    subscriptions: BTreeMap<u32, SubscriptionId>,
    next_token: u32,
}

#[wasm_bindgen]
impl KeyboardCaptureHandle {
    /// `new KeyboardCaptureHandle(config?, renderer?, onCommit?, keySource?)`
    ///
    /// `renderer` is an object with the renderer methods; its surface is
    /// read from `renderer.surface` when present.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        renderer: JsValue,
        on_commit: Option<js_sys::Function>,
        key_source: JsValue,
    ) -> Result<KeyboardCaptureHandle, JsValue> {
        let config = config_from_js(config)?;
        let mut capture = KeyboardCapture::new(config);

        if !is_absent(&renderer) {
            let surface_js = js_sys::Reflect::get(&renderer, &JsValue::from_str("surface"))?;
            let surface = if is_absent(&surface_js) {
                RenderSurface::default()
            } else {
                deserialize(surface_js, "Invalid render surface")?
            };
            capture = capture.with_renderer(Box::new(JsRenderer::new(renderer)), surface);
        }
        if let Some(handler) = on_commit {
            capture = capture.with_commit_sink(Box::new(JsCommitSink::new(handler)));
        }
        if !is_absent(&key_source) {
            capture = capture.with_key_source(Box::new(JsKeySource::new(key_source)));
        }

        wasm_info!("KeyboardCaptureHandle created");
        Ok(KeyboardCaptureHandle {
            inner: capture,
            subscriptions: BTreeMap::new(),
            next_token: 0,
        })
    }

    pub fn start(&mut self) -> bool {
        self.inner.start()
    }

    pub fn pause(&mut self) -> bool {
        self.inner.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.inner.resume()
    }

    pub fn stop(&mut self) -> bool {
        self.inner.stop()
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
        let bus = self.inner.notifier();
        for (_, id) in std::mem::take(&mut self.subscriptions) {
            bus.unsubscribe(id);
        }
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.inner.mode().as_str().to_string()
    }

    /// Feed a keyboard event; returns the instruction or `null` when ignored
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&mut self, event: JsValue) -> Result<JsValue, JsValue> {
        let input = key_input_from_js(&event)?;
        let instruction = self.inner.handle_key(&input);
        self.spawn_deliveries();
        match instruction {
            Some(instruction) => serialize(&instruction, "instruction"),
            None => Ok(JsValue::NULL),
        }
    }

    /// Fire due timers; call again at `nextDeadline()`
    pub fn tick(&mut self) -> u32 {
        let fired = self.inner.tick() as u32;
        self.spawn_deliveries();
        fired
    }

    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.inner.next_deadline().map(|deadline| deadline as f64)
    }

    /// Commit the working fragment; a promise returned by `onCommit` is
    /// awaited in the background and a rejection arrives as an `error` event
    pub fn commit(&mut self) -> bool {
        let committed = self.inner.commit();
        self.spawn_deliveries();
        committed
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }

    pub fn clear(&mut self) -> bool {
        self.inner.clear()
    }

    #[wasm_bindgen(js_name = deleteLastElement)]
    pub fn delete_last_element(&mut self) -> Result<JsValue, JsValue> {
        match self.inner.delete_last_element() {
            Some(element) => serialize(&element, "element"),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = setTimeSignature)]
    pub fn set_time_signature(&mut self, numerator: u8, denominator: u8) -> Result<(), JsValue> {
        self.inner
            .set_time_signature(TimeSignature::new(numerator, denominator))
            .map_err(|e| validation_error(e.to_string()))
    }

    /// `{ letter: "G", accidental?: "sharp", mode?: "minor" }`
    #[wasm_bindgen(js_name = setKeySignature)]
    pub fn set_key_signature(&mut self, key_signature: JsValue) -> Result<(), JsValue> {
        let key_signature: KeySignature = deserialize(key_signature, "Invalid key signature")?;
        self.inner.set_key_signature(key_signature);
        Ok(())
    }

    #[wasm_bindgen(js_name = setTempo)]
    pub fn set_tempo(&mut self, bpm: u16) -> Result<(), JsValue> {
        self.inner.set_tempo(bpm).map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = getFragment)]
    pub fn get_fragment(&self) -> Result<JsValue, JsValue> {
        serialize(self.inner.fragment(), "fragment")
    }

    #[wasm_bindgen(js_name = getCommittedFragments)]
    pub fn get_committed_fragments(&self) -> Result<JsValue, JsValue> {
        serialize(&self.inner.committed(), "committed fragments")
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        serialize(&self.inner.engine_state(), "engine state")
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    #[wasm_bindgen(js_name = getKeyMappings)]
    pub fn get_key_mappings(&self) -> Result<JsValue, JsValue> {
        serialize(self.inner.key_mappings(), "key mappings")
    }

    #[wasm_bindgen(js_name = setKeyMappings)]
    pub fn set_key_mappings(&mut self, mappings: JsValue) -> Result<(), JsValue> {
        let mappings: KeyMappings = deserialize(mappings, "Invalid key mappings")?;
        self.inner.set_key_mappings(mappings);
        Ok(())
    }

    #[wasm_bindgen(js_name = updateKeyMapping)]
    pub fn update_key_mapping(&mut self, category: &str, key: &str, value: &str) -> Result<(), JsValue> {
        let category = MappingCategory::from_name(category)
            .ok_or_else(|| validation_error(format!("Unknown mapping category: {}", category)))?;
        self.inner.update_key_mapping(category, key, value);
        Ok(())
    }

    /// Rejected documents also raise an `INVALID_CONFIG` error event
    #[wasm_bindgen(js_name = applyConfig)]
    pub fn apply_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        if is_absent(&config) {
            self.inner.apply_config(CaptureConfig::default());
            return Ok(());
        }
        let value: serde_json::Value = deserialize(config, "Invalid capture config")?;
        self.inner
            .apply_config_value(value)
            .map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> Result<JsValue, JsValue> {
        serialize(self.inner.config(), "config")
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height);
    }

    /// Subscribe to one event by name; returns a token for `off`
    pub fn on(&mut self, event: &str, callback: js_sys::Function) -> Result<u32, JsValue> {
        let kind = EventKind::from_name(event).ok_or_else(|| validation_error(format!("Unknown event: {}", event)))?;
        let id = self.inner.notifier().subscribe(kind, js_listener(callback));
        Ok(self.remember(id))
    }

    /// Subscribe to every event
    #[wasm_bindgen(js_name = onAny)]
    pub fn on_any(&mut self, callback: js_sys::Function) -> u32 {
        let id = self.inner.notifier().subscribe_all(js_listener(callback));
        self.remember(id)
    }

    pub fn off(&mut self, token: u32) -> bool {
        match self.subscriptions.remove(&token) {
            Some(id) => {
                self.inner.notifier().unsubscribe(id);
                true
            }
            None => false,
        }
    }
}

impl KeyboardCaptureHandle {
    fn remember(&mut self, id: SubscriptionId) -> u32 {
        self.next_token += 1;
        self.subscriptions.insert(self.next_token, id);
        self.next_token
    }

    fn spawn_deliveries(&mut self) {
        for delivery in self.inner.detach_deliveries() {
            wasm_bindgen_futures::spawn_local(delivery);
        }
    }

    /// The wrapped orchestrator
    pub fn capture(&self) -> &KeyboardCapture {
        &self.inner
    }
}
