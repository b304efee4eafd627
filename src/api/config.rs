//! `ConfigManager` exported to JavaScript
//!
//! Hosts keep one of these alongside a `KeyboardCaptureHandle` and pass
//! `getConfig()` to `applyConfig` when the active configuration changes.

use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, is_absent, serialize, validation_error};
use crate::config::ConfigManager;
use crate::shortcuts::KeyMappings;
use crate::wasm_info;

#[wasm_bindgen]
pub struct ConfigManagerHandle {
    inner: ConfigManager,
}

#[wasm_bindgen]
impl ConfigManagerHandle {
    /// `new ConfigManagerHandle(overrides?)`
    #[wasm_bindgen(constructor)]
    pub fn new(overrides: JsValue) -> Result<ConfigManagerHandle, JsValue> {
        let inner = if is_absent(&overrides) {
            ConfigManager::new()
        } else {
            let overrides: serde_json::Value = deserialize(overrides, "Invalid config overrides")?;
            ConfigManager::with_overrides(overrides).map_err(|e| validation_error(e.to_string()))?
        };
        Ok(ConfigManagerHandle { inner })
    }

    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> Result<JsValue, JsValue> {
        serialize(self.inner.config(), "config")
    }

    /// Deep-merge a partial document into the active configuration
    pub fn update(&mut self, overrides: JsValue) -> Result<(), JsValue> {
        let overrides: serde_json::Value = deserialize(overrides, "Invalid config overrides")?;
        self.inner.update(overrides).map_err(|e| validation_error(e.to_string()))
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    #[wasm_bindgen(js_name = exportConfig)]
    pub fn export_config(&self) -> Result<String, JsValue> {
        self.inner.export_config().map_err(|e| validation_error(e.to_string()))
    }

    /// Replace the configuration with a JSON document; a rejected document
    /// leaves the previous one active
    #[wasm_bindgen(js_name = importConfig)]
    pub fn import_config(&mut self, text: &str) -> Result<(), JsValue> {
        self.inner.import_config(text).map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = exportYaml)]
    pub fn export_yaml(&self) -> Result<String, JsValue> {
        self.inner.export_yaml().map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = importYaml)]
    pub fn import_yaml(&mut self, text: &str) -> Result<(), JsValue> {
        self.inner.import_yaml(text).map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = getKeyMappings)]
    pub fn get_key_mappings(&self) -> Result<JsValue, JsValue> {
        serialize(&self.inner.key_mappings(), "key mappings")
    }

    #[wasm_bindgen(js_name = savePreset)]
    pub fn save_preset(&mut self, name: &str, mappings: JsValue) -> Result<(), JsValue> {
        let mappings: KeyMappings = deserialize(mappings, "Invalid key mappings")?;
        self.inner.save_preset(name, mappings);
        wasm_info!("saved key mapping preset {:?}", name);
        Ok(())
    }

    /// Make a saved preset the active key mappings
    #[wasm_bindgen(js_name = loadPreset)]
    pub fn load_preset(&mut self, name: &str) -> Result<(), JsValue> {
        self.inner.load_preset(name).map_err(|e| validation_error(e.to_string()))
    }

    #[wasm_bindgen(js_name = deletePreset)]
    pub fn delete_preset(&mut self, name: &str) -> bool {
        self.inner.delete_preset(name)
    }

    #[wasm_bindgen(js_name = presetNames)]
    pub fn preset_names(&self) -> Vec<String> {
        self.inner.preset_names()
    }
}

impl ConfigManagerHandle {
    /// The wrapped manager
    pub fn manager(&self) -> &ConfigManager {
        &self.inner
    }
}
