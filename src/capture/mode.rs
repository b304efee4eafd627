//! Capture-level mode

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall capture state
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureMode {
    #[default]
    Stopped,
    Capture,
    Paused,
    ChordMode,
    Error,
}

impl CaptureMode {
    /// Whether key events are forwarded to the shortcut engine
    pub fn accepts_keys(&self) -> bool {
        matches!(self, CaptureMode::Capture | CaptureMode::ChordMode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Stopped => "STOPPED",
            CaptureMode::Capture => "CAPTURE",
            CaptureMode::Paused => "PAUSED",
            CaptureMode::ChordMode => "CHORD_MODE",
            CaptureMode::Error => "ERROR",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
