//! Models module for the notation capture core
//!
//! This module contains the data models shared by the shortcut engine,
//! the fragment manager and the renderers.

pub mod duration;
pub mod elements;
pub mod fragment;
pub mod pitch;

// Re-export commonly used types
pub use duration::{Duration, DurationValue, MAX_DOTS};
pub use elements::*;
pub use fragment::{Fragment, FragmentMetadata, DEFAULT_TEMPO};
pub use pitch::{Accidental, Letter, Pitch, MAX_OCTAVE, MIN_OCTAVE};
