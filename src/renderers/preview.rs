//! Debounced preview
//!
//! The orchestrator stages a snapshot on every mutation and arms its
//! debounce timer; only the last staged snapshot is rendered when the timer
//! fires.

use super::{RenderError, RenderSurface, Renderer};
use crate::config::RenderingOptions;
use crate::models::Fragment;

pub struct Preview {
    renderer: Box<dyn Renderer>,
    surface: RenderSurface,
    staged: Option<Fragment>,
    highlight_current: bool,
    initialized: bool,
    render_count: usize,
}

impl Preview {
    pub fn new(renderer: Box<dyn Renderer>, surface: RenderSurface) -> Self {
        Self {
            renderer,
            surface,
            staged: None,
            highlight_current: true,
            initialized: false,
            render_count: 0,
        }
    }

    /// Initialize the renderer against the surface
    pub fn initialize(&mut self, options: &RenderingOptions) -> Result<(), RenderError> {
        self.highlight_current = options.highlight_current;
        if !self.renderer.is_available() {
            return Err(RenderError::Unavailable);
        }
        self.renderer.initialize(&self.surface, options)?;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replace the staged snapshot; the previous one is dropped unrendered
    pub fn stage(&mut self, fragment: Fragment) {
        self.staged = Some(fragment);
    }

    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Render the staged snapshot, if any
    ///
    /// Returns the rendered fragment so the caller can announce it. Nothing
    /// is drawn before a successful `initialize`.
    pub fn flush(&mut self) -> Result<Option<Fragment>, RenderError> {
        let Some(fragment) = self.staged.take() else {
            return Ok(None);
        };
        if !self.initialized {
            return Ok(None);
        }

        self.renderer.render(&fragment)?;
        self.render_count += 1;

        if self.highlight_current && !fragment.is_empty() {
            self.renderer.highlight(fragment.len() - 1);
        } else {
            self.renderer.clear_highlight();
        }
        Ok(Some(fragment))
    }

    /// Drop staged work and blank the output
    pub fn clear(&mut self) {
        self.staged = None;
        if self.initialized {
            self.renderer.clear();
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.width = width;
        self.surface.height = height;
        if self.initialized {
            self.renderer.resize(width, height);
        }
    }

    pub fn destroy(&mut self) {
        self.staged = None;
        if self.initialized {
            self.renderer.destroy();
            self.initialized = false;
        }
    }

    pub fn set_highlight_current(&mut self, highlight_current: bool) {
        self.highlight_current = highlight_current;
    }

    /// Number of renders performed so far
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }
}
