//! The fragment document
//!
//! A fragment is the unit of capture: header state, an ordered element
//! sequence and metadata derived from both.

use serde::{Deserialize, Serialize};

use super::elements::{KeySignature, MusicalElement, TimeSignature};
use crate::utils::music::{calculate_fragment_duration, count_measures};

/// Tempo used for new fragments
pub const DEFAULT_TEMPO: u16 = 120;

/// Metadata recomputed after every change
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    /// Number of barline elements
    pub measure_count: usize,
    /// `"{measures}"` or `"{measures}.{remainder}/{numerator}"`
    pub total_duration: String,
}

impl Default for FragmentMetadata {
    fn default() -> Self {
        Self {
            measure_count: 0,
            total_duration: "0".to_string(),
        }
    }
}

/// A working or committed musical fragment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// RFC 3339 commit timestamp, set once committed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<String>,
    pub elements: Vec<MusicalElement>,
    pub time_signature: TimeSignature,
    pub key_signature: KeySignature,
    pub tempo: u16,
    pub metadata: FragmentMetadata,
}

impl Fragment {
    /// Create an empty fragment with default header state
    pub fn new() -> Self {
        Self::with_header(TimeSignature::default(), KeySignature::default(), DEFAULT_TEMPO)
    }

    /// Create an empty fragment carrying the given header state
    pub fn with_header(time_signature: TimeSignature, key_signature: KeySignature, tempo: u16) -> Self {
        Self {
            id: new_fragment_id(),
            created_at: now_rfc3339(),
            committed_at: None,
            elements: Vec::new(),
            time_signature,
            key_signature,
            tempo,
            metadata: FragmentMetadata::default(),
        }
    }

    /// Fresh empty fragment that keeps this fragment's header
    pub fn successor(&self) -> Self {
        Self::with_header(self.time_signature, self.key_signature, self.tempo)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether any note, rest or chord has been added
    pub fn has_timed_elements(&self) -> bool {
        self.elements.iter().any(MusicalElement::is_timed)
    }

    /// Recompute measure count and total duration
    pub fn refresh_metadata(&mut self) {
        self.metadata = FragmentMetadata {
            measure_count: count_measures(&self.elements),
            total_duration: calculate_fragment_duration(&self.elements, &self.time_signature),
        };
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn new_fragment_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
