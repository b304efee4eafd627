//! Renderer collaborators
//!
//! The capture core only talks to a renderer through the [`Renderer`]
//! capability surface. Drawing backends live outside the crate; the JS
//! boundary adapts host objects (see `api::JsRenderer`) and [`AbcRenderer`]
//! writes ABC text for hosts without a drawing library.

pub mod abc;
pub mod preview;

pub use abc::AbcRenderer;
pub use preview::Preview;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RenderingOptions;
use crate::models::{Fragment, MusicalElement};

/// Where a renderer draws
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderSurface {
    /// Host element id (DOM container for browser renderers)
    pub container_id: String,
    pub width: u32,
    pub height: u32,
}

impl RenderSurface {
    pub fn new(container_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            container_id: container_id.into(),
            width,
            height,
        }
    }
}

impl Default for RenderSurface {
    fn default() -> Self {
        Self::new("notation-preview", 600, 200)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Renderer is not available")]
    Unavailable,
    #[error("Renderer initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Capability surface of a notation renderer
pub trait Renderer {
    fn initialize(&mut self, surface: &RenderSurface, options: &RenderingOptions) -> Result<(), RenderError>;

    /// Draw the whole fragment, replacing previous output
    fn render(&mut self, fragment: &Fragment) -> Result<(), RenderError>;

    /// Redraw only the element list, keeping header output
    fn update(&mut self, elements: &[MusicalElement]) -> Result<(), RenderError>;

    fn highlight(&mut self, index: usize);

    fn clear_highlight(&mut self);

    fn clear(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    fn destroy(&mut self);

    fn is_available(&self) -> bool;
}
