//! Notation Capture WASM Module
//!
//! Turns keyboard events into an editable, undoable music notation fragment
//! with a debounced preview and commit delivery.

pub mod api;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod fragments;
pub mod models;
pub mod renderers;
pub mod shortcuts;
pub mod undo;
pub mod utils;

// Re-export commonly used types
pub use capture::{CaptureEvent, CaptureMode, CommitSink, Delivery, EventBus, EventKind, KeyboardCapture, SinkError};
pub use config::{CaptureConfig, ConfigError, ConfigManager};
pub use diagnostics::{CaptureError, ErrorCode, Severity};
pub use fragments::{FragmentError, FragmentManager};
pub use models::*;
pub use renderers::{AbcRenderer, RenderError, RenderSurface, Renderer};
pub use shortcuts::{Instruction, KeyInput, KeyMappings, ShortcutEngine};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("logger already initialized: {}", e)));
    }

    log::info!("Notation capture WASM module initialized");
}
