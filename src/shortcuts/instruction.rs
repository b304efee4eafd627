//! Typed output of the shortcut engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BarlineStyle, Duration, DurationValue, MusicalElement, Pitch, Tuplet};

/// Control command names used in the `controls` mapping
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ControlCommand {
    Commit,
    Rest,
    Delete,
    Barline,
    Clear,
    OctaveUp,
    OctaveDown,
    OctaveReset,
    DotToggle,
    TripletToggle,
    Undo,
    Redo,
}

impl ControlCommand {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "commit" => Some(ControlCommand::Commit),
            "rest" => Some(ControlCommand::Rest),
            "delete" => Some(ControlCommand::Delete),
            "barline" => Some(ControlCommand::Barline),
            "clear" => Some(ControlCommand::Clear),
            "octave-up" => Some(ControlCommand::OctaveUp),
            "octave-down" => Some(ControlCommand::OctaveDown),
            "octave-reset" => Some(ControlCommand::OctaveReset),
            "dot-toggle" => Some(ControlCommand::DotToggle),
            "triplet-toggle" => Some(ControlCommand::TripletToggle),
            "undo" => Some(ControlCommand::Undo),
            "redo" => Some(ControlCommand::Redo),
            _ => None,
        }
    }

    /// Undo and redo only fire with Ctrl held
    pub fn requires_ctrl(&self) -> bool {
        matches!(self, ControlCommand::Undo | ControlCommand::Redo)
    }
}

/// Values accepted in the `durations` mapping
///
/// `dotted-quarter` and `triplet-eighth` are fixed aliases that also set the
/// matching flag; every other name clears both flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationToken {
    Plain(DurationValue),
    DottedQuarter,
    TripletEighth,
}

impl DurationToken {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dotted-quarter" => Some(DurationToken::DottedQuarter),
            "triplet-eighth" => Some(DurationToken::TripletEighth),
            other => DurationValue::from_name(other).map(DurationToken::Plain),
        }
    }
}

/// Document-level actions the orchestrator carries out
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControlAction {
    Commit,
    Delete,
    Clear,
    Undo,
    Redo,
    EnterChordMode,
}

/// A change to the engine's transient input state or pending modifiers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModifierChange {
    Duration { duration: Duration, triplet: bool },
    Octave { octave: u8 },
    Dotted { dotted: bool },
    Triplet { triplet: bool },
    Articulation { name: String },
    Dynamic { name: String },
    /// A pitch was added to the pending chord
    #[serde(rename_all = "camelCase")]
    ChordNote { pitch: Pitch, chord_notes: Vec<Pitch> },
}

/// Why the engine refused an input
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Error)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    #[error("Input not accepted in current mode")]
    ModeForbidsInput,

    #[error("Octave out of range")]
    OctaveOutOfRange,

    #[error("No notes in chord")]
    EmptyChord,

    #[error("Unrecognized input")]
    Unrecognized,
}

/// One edit or control action produced from one key event
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Instruction {
    Note {
        pitch: Pitch,
        duration: Duration,
        triplet: bool,
    },
    Rest {
        duration: Duration,
        triplet: bool,
    },
    Chord {
        pitches: Vec<Pitch>,
        duration: Duration,
        triplet: bool,
    },
    Barline {
        style: BarlineStyle,
    },
    Control {
        action: ControlAction,
    },
    Modifier {
        change: ModifierChange,
    },
    Rejected {
        reason: Rejection,
    },
}

impl Instruction {
    pub fn control(action: ControlAction) -> Self {
        Instruction::Control { action }
    }

    pub fn modifier(change: ModifierChange) -> Self {
        Instruction::Modifier { change }
    }

    pub fn rejected(reason: Rejection) -> Self {
        Instruction::Rejected { reason }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Instruction::Rejected { .. })
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Instruction::Rejected { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Element this instruction creates, without pending modifiers
    pub fn to_element(&self) -> Option<MusicalElement> {
        let tuplet = |triplet: bool| triplet.then_some(Tuplet::TRIPLET);
        match self {
            Instruction::Note {
                pitch,
                duration,
                triplet,
            } => Some(MusicalElement::Note {
                pitch: *pitch,
                duration: *duration,
                accidental: None,
                articulations: Vec::new(),
                dynamic: None,
                tuplet: tuplet(*triplet),
            }),
            Instruction::Rest { duration, triplet } => Some(MusicalElement::Rest {
                duration: *duration,
                tuplet: tuplet(*triplet),
            }),
            Instruction::Chord {
                pitches,
                duration,
                triplet,
            } => Some(MusicalElement::Chord {
                pitches: pitches.clone(),
                duration: *duration,
                articulations: Vec::new(),
                dynamic: None,
                tuplet: tuplet(*triplet),
            }),
            Instruction::Barline { style } => Some(MusicalElement::Barline { style: *style }),
            _ => None,
        }
    }
}
