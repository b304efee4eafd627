//! Key mapping tables
//!
//! Six independent dictionaries map `KeyboardEvent.key` strings to names the
//! engine understands. Lookups are case-sensitive except for pitch letters.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the six mapping dictionaries
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MappingCategory {
    Durations,
    Pitches,
    Modifiers,
    Controls,
    Articulations,
    Dynamics,
}

impl MappingCategory {
    pub const ALL: [MappingCategory; 6] = [
        MappingCategory::Durations,
        MappingCategory::Pitches,
        MappingCategory::Modifiers,
        MappingCategory::Controls,
        MappingCategory::Articulations,
        MappingCategory::Dynamics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MappingCategory::Durations => "durations",
            MappingCategory::Pitches => "pitches",
            MappingCategory::Modifiers => "modifiers",
            MappingCategory::Controls => "controls",
            MappingCategory::Articulations => "articulations",
            MappingCategory::Dynamics => "dynamics",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.name() == name)
    }
}

impl fmt::Display for MappingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyboard-to-notation mapping dictionaries
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KeyMappings {
    pub durations: BTreeMap<String, String>,
    pub pitches: BTreeMap<String, String>,
    pub modifiers: BTreeMap<String, String>,
    pub controls: BTreeMap<String, String>,
    pub articulations: BTreeMap<String, String>,
    pub dynamics: BTreeMap<String, String>,
}

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

// `Enter` stays unmapped so it can complete chords; shifted pitch letters
// (A-G) are reserved for sharps.
static DEFAULT_KEY_MAPPINGS: Lazy<KeyMappings> = Lazy::new(|| KeyMappings {
    durations: table(&[
        ("1", "whole"),
        ("2", "half"),
        ("3", "dotted-quarter"),
        ("4", "quarter"),
        ("5", "eighth"),
        ("6", "sixteenth"),
        ("7", "triplet-eighth"),
        ("8", "thirty-second"),
        ("9", "sixty-fourth"),
    ]),
    pitches: table(&[
        ("a", "A"),
        ("b", "B"),
        ("c", "C"),
        ("d", "D"),
        ("e", "E"),
        ("f", "F"),
        ("g", "G"),
    ]),
    modifiers: table(&[("Shift", "sharp"), ("Alt", "flat"), ("Control", "chord")]),
    controls: table(&[
        ("Tab", "commit"),
        (" ", "rest"),
        ("Backspace", "delete"),
        ("|", "barline"),
        ("Escape", "clear"),
        ("ArrowUp", "octave-up"),
        ("ArrowDown", "octave-down"),
        ("0", "octave-reset"),
        (".", "dot-toggle"),
        ("t", "triplet-toggle"),
        ("z", "undo"),
        ("y", "redo"),
    ]),
    articulations: table(&[
        (";", "staccato"),
        (">", "accent"),
        ("-", "tenuto"),
        ("^", "marcato"),
        ("~", "fermata"),
    ]),
    dynamics: table(&[
        ("p", "p"),
        ("P", "pp"),
        ("m", "mp"),
        ("M", "mf"),
        ("j", "f"),
        ("J", "ff"),
    ]),
});

impl Default for KeyMappings {
    fn default() -> Self {
        DEFAULT_KEY_MAPPINGS.clone()
    }
}

impl KeyMappings {
    pub fn category(&self, category: MappingCategory) -> &BTreeMap<String, String> {
        match category {
            MappingCategory::Durations => &self.durations,
            MappingCategory::Pitches => &self.pitches,
            MappingCategory::Modifiers => &self.modifiers,
            MappingCategory::Controls => &self.controls,
            MappingCategory::Articulations => &self.articulations,
            MappingCategory::Dynamics => &self.dynamics,
        }
    }

    pub fn category_mut(&mut self, category: MappingCategory) -> &mut BTreeMap<String, String> {
        match category {
            MappingCategory::Durations => &mut self.durations,
            MappingCategory::Pitches => &mut self.pitches,
            MappingCategory::Modifiers => &mut self.modifiers,
            MappingCategory::Controls => &mut self.controls,
            MappingCategory::Articulations => &mut self.articulations,
            MappingCategory::Dynamics => &mut self.dynamics,
        }
    }

    /// Insert or replace a single binding, returning the previous value
    pub fn set(&mut self, category: MappingCategory, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.category_mut(category).insert(key.into(), value.into())
    }

    pub fn remove(&mut self, category: MappingCategory, key: &str) -> Option<String> {
        self.category_mut(category).remove(key)
    }

    /// Case-sensitive lookup
    pub fn lookup(&self, category: MappingCategory, key: &str) -> Option<&str> {
        self.category(category).get(key).map(String::as_str)
    }

    /// Pitch lookup; the key is lower-cased first
    pub fn lookup_pitch(&self, key: &str) -> Option<&str> {
        self.pitches.get(&key.to_lowercase()).map(String::as_str)
    }
}
