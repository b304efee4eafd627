//! Notation capture WASM API
//!
//! The JavaScript-facing surface of the crate.
//!
//! # Module Structure
//!
//! - `helpers`: console logging macros and serialization across the boundary
//! - `adapters`: JS objects wrapped as renderer, commit sink and key source
//! - `capture`: the `KeyboardCaptureHandle` class
//! - `config`: the `ConfigManagerHandle` class (import/export and presets)
//! - `music`: stateless helpers (`parsePitch`, `calculateFragmentDuration`,
//!   `defaultConfig`)

pub mod helpers;
pub mod adapters;
pub mod capture;
pub mod config;
pub mod music;

pub use adapters::{key_input_from_js, JsCommitSink, JsKeySource, JsRenderer};
pub use capture::KeyboardCaptureHandle;
pub use config::ConfigManagerHandle;
pub use music::{calculate_fragment_duration_js, default_config, parse_pitch_js};
