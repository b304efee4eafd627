//! Utility modules for the notation capture core
//!
//! This module contains stateless helpers shared across the engine,
//! the fragment manager and the renderers.

pub mod clock;
pub mod music;

// Re-export commonly used helpers
pub use clock::{Clock, ManualClock, SystemClock};
pub use music::*;
