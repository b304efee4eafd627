//! Capture configuration
//!
//! A configuration document has three sections: key mappings (the literal
//! `"default"` or six custom dictionaries), rendering options and behavior
//! options. [`ConfigManager`] validates every change as a whole; a rejected
//! change leaves the previous configuration in place.

pub mod validation;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::fragments::DEFAULT_HISTORY_SIZE;
use crate::models::DurationValue;
use crate::shortcuts::{KeyMappings, DEFAULT_DURATION, DEFAULT_OCTAVE};
use validation::{merge_values, validate_config};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// The `"default"` token
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DefaultToken {
    #[default]
    #[serde(rename = "default")]
    Default,
}

/// Key mappings: the built-in set or a custom one
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum KeyMappingSetting {
    Default(DefaultToken),
    Custom(KeyMappings),
}

impl Default for KeyMappingSetting {
    fn default() -> Self {
        KeyMappingSetting::Default(DefaultToken::Default)
    }
}

impl KeyMappingSetting {
    pub fn resolve(&self) -> KeyMappings {
        match self {
            KeyMappingSetting::Default(_) => KeyMappings::default(),
            KeyMappingSetting::Custom(mappings) => mappings.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// How rejected input and renderer failures are surfaced
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorRecoveryMode {
    /// Report rejections as errors; a renderer init failure stops capture
    Strict,
    /// Log and keep capturing
    #[default]
    Lenient,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderingOptions {
    pub preview_size: PreviewSize,
    pub show_key_signature: bool,
    pub show_time_signature: bool,
    pub auto_scroll: bool,
    pub highlight_current: bool,
    pub theme: Theme,
}

impl Default for RenderingOptions {
    fn default() -> Self {
        Self {
            preview_size: PreviewSize::Medium,
            show_key_signature: true,
            show_time_signature: true,
            auto_scroll: true,
            highlight_current: true,
            theme: Theme::Light,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorOptions {
    /// Commit automatically after this much inactivity
    pub auto_commit_delay_ms: Option<u64>,
    pub undo_history_size: usize,
    pub default_duration: DurationValue,
    pub default_octave: u8,
    pub chord_mode_timeout_ms: u64,
    pub error_recovery_mode: ErrorRecoveryMode,
    pub debounce_delay_ms: u64,
}

impl Default for BehaviorOptions {
    fn default() -> Self {
        Self {
            auto_commit_delay_ms: None,
            undo_history_size: DEFAULT_HISTORY_SIZE,
            default_duration: DEFAULT_DURATION,
            default_octave: DEFAULT_OCTAVE,
            chord_mode_timeout_ms: 1000,
            error_recovery_mode: ErrorRecoveryMode::Lenient,
            debounce_delay_ms: 100,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    pub key_mappings: KeyMappingSetting,
    pub rendering: RenderingOptions,
    pub behavior: BehaviorOptions,
}

impl CaptureConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        validate_config(&value)?;
        let merged = merge_values(Self::default().to_value()?, value);
        validate_config(&merged)?;
        serde_json::from_value(merged).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Owner of the active configuration and named mapping presets
#[derive(Clone, Debug, Default)]
pub struct ConfigManager {
    config: CaptureConfig,
    presets: BTreeMap<String, KeyMappings>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from defaults with `overrides` merged in
    pub fn with_overrides(overrides: Value) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.update(overrides)?;
        Ok(manager)
    }

    /// Deep-merge `overrides` into the active configuration
    pub fn update(&mut self, overrides: Value) -> Result<(), ConfigError> {
        let merged = merge_values(self.config.to_value()?, overrides);
        validate_config(&merged)?;
        self.config = serde_json::from_value(merged).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        log::debug!("configuration updated");
        Ok(())
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Active key mappings with `"default"` resolved
    pub fn key_mappings(&self) -> KeyMappings {
        self.config.key_mappings.resolve()
    }

    pub fn set_key_mappings(&mut self, mappings: KeyMappings) {
        self.config.key_mappings = KeyMappingSetting::Custom(mappings);
    }

    pub fn export_config(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Replace the configuration with an imported JSON document
    pub fn import_config(&mut self, text: &str) -> Result<(), ConfigError> {
        self.config = CaptureConfig::from_json(text).inspect_err(|e| log::warn!("config import rejected: {}", e))?;
        log::info!("configuration imported");
        Ok(())
    }

    pub fn export_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.config).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn import_yaml(&mut self, text: &str) -> Result<(), ConfigError> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        self.config = CaptureConfig::from_value(value).inspect_err(|e| log::warn!("config import rejected: {}", e))?;
        log::info!("configuration imported from yaml");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.config = CaptureConfig::default();
    }

    pub fn save_preset(&mut self, name: impl Into<String>, mappings: KeyMappings) {
        self.presets.insert(name.into(), mappings);
    }

    /// Make a saved preset the active key mappings
    pub fn load_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        let mappings = self
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
        self.set_key_mappings(mappings);
        Ok(())
    }

    pub fn delete_preset(&mut self, name: &str) -> bool {
        self.presets.remove(name).is_some()
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }
}
