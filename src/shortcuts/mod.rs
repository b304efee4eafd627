//! Shortcut engine
//!
//! A modal interpreter that turns one keyboard event plus the caller's
//! current capture mode into exactly one [`Instruction`]. The engine owns
//! transient input state (duration, octave, dotted/triplet flags and the
//! in-progress chord) but never tracks the capture mode itself.
//!
//! Dispatch follows the ordered rule table in [`rules`]:
//!
//! 1. stopped/error mode gate
//! 2. control commands (undo/redo only with Ctrl)
//! 3. chord accumulation (chord mode without Ctrl)
//! 4. duration keys
//! 5. articulation keys
//! 6. dynamic keys
//! 7. pitch keys (Ctrl+pitch enters chord mode)
//! 8. anything else is unrecognized

pub mod instruction;
pub mod keymap;
pub mod rules;

pub use instruction::{ControlAction, ControlCommand, DurationToken, Instruction, ModifierChange, Rejection};
pub use keymap::{KeyMappings, MappingCategory};
pub use rules::DispatchStage;

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::capture::CaptureMode;
use crate::models::{Accidental, BarlineStyle, Duration, DurationValue, Letter, Pitch, MAX_OCTAVE, MIN_OCTAVE};
use crate::utils::clock::{Clock, SystemClock};
use rules::RULES;

/// Duration selected before any duration key is pressed
pub const DEFAULT_DURATION: DurationValue = DurationValue::Quarter;

/// Octave selected before any octave key is pressed
pub const DEFAULT_OCTAVE: u8 = 4;

/// A raw keyboard event, shaped like the DOM `KeyboardEvent`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    pub key: String,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    /// Set by hosts when the event targets a text input control
    #[serde(default)]
    pub target_is_text_input: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn shift(mut self) -> Self {
        self.shift_key = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt_key = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }
}

/// Immutable snapshot of the engine's transient state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub duration: DurationValue,
    pub octave: u8,
    pub dotted: bool,
    pub triplet: bool,
    pub chord_notes: Vec<Pitch>,
}

/// Keyboard shortcut interpreter
pub struct ShortcutEngine {
    pub(crate) mappings: KeyMappings,
    duration: DurationValue,
    octave: u8,
    dotted: bool,
    triplet: bool,
    chord_notes: Vec<Pitch>,
    last_chord_note_at: Option<u64>,
    default_duration: DurationValue,
    default_octave: u8,
    clock: Rc<dyn Clock>,
}

impl Default for ShortcutEngine {
    fn default() -> Self {
        Self::new(KeyMappings::default())
    }
}

impl ShortcutEngine {
    pub fn new(mappings: KeyMappings) -> Self {
        Self::with_clock(mappings, Rc::new(SystemClock))
    }

    pub fn with_clock(mappings: KeyMappings, clock: Rc<dyn Clock>) -> Self {
        Self {
            mappings,
            duration: DEFAULT_DURATION,
            octave: DEFAULT_OCTAVE,
            dotted: false,
            triplet: false,
            chord_notes: Vec::new(),
            last_chord_note_at: None,
            default_duration: DEFAULT_DURATION,
            default_octave: DEFAULT_OCTAVE,
            clock,
        }
    }

    /// Interpret one key event under the caller's current mode
    pub fn process_key_input(&mut self, input: &KeyInput, mode: CaptureMode) -> Instruction {
        for rule in RULES {
            if (rule.matches)(self, input, mode) {
                let instruction = (rule.apply)(self, input, mode);
                log::trace!("key {:?} -> {:?}: {:?}", input.key, rule.stage, instruction);
                return instruction;
            }
        }
        Instruction::rejected(Rejection::Unrecognized)
    }

    /// The dispatch priority, highest first
    pub fn dispatch_order() -> Vec<DispatchStage> {
        RULES.iter().map(|rule| rule.stage).collect()
    }

    pub fn current_state(&self) -> EngineState {
        EngineState {
            duration: self.duration,
            octave: self.octave,
            dotted: self.dotted,
            triplet: self.triplet,
            chord_notes: self.chord_notes.clone(),
        }
    }

    /// Restore the configured defaults and drop any pending chord
    pub fn reset(&mut self) {
        self.duration = self.default_duration;
        self.octave = self.default_octave;
        self.dotted = false;
        self.triplet = false;
        self.clear_chord();
    }

    /// Drop the pending chord without emitting it
    pub fn clear_chord(&mut self) {
        self.chord_notes.clear();
        self.last_chord_note_at = None;
    }

    /// Defaults used by [`reset`](Self::reset); applied immediately
    pub fn set_defaults(&mut self, duration: DurationValue, octave: u8) {
        self.default_duration = duration;
        self.default_octave = octave.min(MAX_OCTAVE);
        self.reset();
    }

    pub fn key_mappings(&self) -> &KeyMappings {
        &self.mappings
    }

    pub fn set_key_mappings(&mut self, mappings: KeyMappings) {
        self.mappings = mappings;
    }

    /// Bind or rebind a single key
    pub fn update_key_mapping(&mut self, category: MappingCategory, key: impl Into<String>, value: impl Into<String>) {
        self.mappings.set(category, key, value);
    }

    /// Duration that the next note or rest gets
    pub fn current_duration(&self) -> Duration {
        Duration::new(self.duration, u8::from(self.dotted))
    }

    /// Whether the last chord note is older than `threshold_ms`
    ///
    /// A pure query: false when no chord is pending.
    pub fn has_chord_timed_out(&self, threshold_ms: u64) -> bool {
        match self.last_chord_note_at {
            Some(stamp) => self.clock.now_ms().saturating_sub(stamp) >= threshold_ms,
            None => false,
        }
    }

    /// Emit the pending chord and clear it
    pub fn complete_chord(&mut self) -> Instruction {
        if self.chord_notes.is_empty() {
            return Instruction::rejected(Rejection::EmptyChord);
        }
        let pitches = std::mem::take(&mut self.chord_notes);
        self.last_chord_note_at = None;
        Instruction::Chord {
            pitches,
            duration: self.current_duration(),
            triplet: self.triplet,
        }
    }

    pub(crate) fn apply_control(&mut self, command: ControlCommand) -> Instruction {
        match command {
            ControlCommand::Commit => Instruction::control(ControlAction::Commit),
            ControlCommand::Delete => Instruction::control(ControlAction::Delete),
            ControlCommand::Clear => Instruction::control(ControlAction::Clear),
            ControlCommand::Undo => Instruction::control(ControlAction::Undo),
            ControlCommand::Redo => Instruction::control(ControlAction::Redo),
            ControlCommand::Rest => Instruction::Rest {
                duration: self.current_duration(),
                triplet: self.triplet,
            },
            ControlCommand::Barline => Instruction::Barline {
                style: BarlineStyle::Single,
            },
            ControlCommand::OctaveUp => self.change_octave(self.octave as i32 + 1),
            ControlCommand::OctaveDown => self.change_octave(self.octave as i32 - 1),
            ControlCommand::OctaveReset => self.change_octave(self.default_octave as i32),
            ControlCommand::DotToggle => {
                self.dotted = !self.dotted;
                Instruction::modifier(ModifierChange::Dotted { dotted: self.dotted })
            }
            ControlCommand::TripletToggle => {
                self.triplet = !self.triplet;
                Instruction::modifier(ModifierChange::Triplet {
                    triplet: self.triplet,
                })
            }
        }
    }

    /// Out-of-range requests are rejected; the octave is never clamped
    fn change_octave(&mut self, target: i32) -> Instruction {
        if !(MIN_OCTAVE as i32..=MAX_OCTAVE as i32).contains(&target) {
            return Instruction::rejected(Rejection::OctaveOutOfRange);
        }
        self.octave = target as u8;
        Instruction::modifier(ModifierChange::Octave { octave: self.octave })
    }

    pub(crate) fn select_duration(&mut self, token: DurationToken) -> Instruction {
        let (value, dotted, triplet) = match token {
            DurationToken::DottedQuarter => (DurationValue::Quarter, true, false),
            DurationToken::TripletEighth => (DurationValue::Eighth, false, true),
            DurationToken::Plain(value) => (value, false, false),
        };
        self.duration = value;
        self.dotted = dotted;
        self.triplet = triplet;
        Instruction::modifier(ModifierChange::Duration {
            duration: self.current_duration(),
            triplet: self.triplet,
        })
    }

    pub(crate) fn articulation(name: &str) -> Instruction {
        Instruction::modifier(ModifierChange::Articulation {
            name: name.to_string(),
        })
    }

    pub(crate) fn dynamic(name: &str) -> Instruction {
        Instruction::modifier(ModifierChange::Dynamic {
            name: name.to_string(),
        })
    }

    fn pitch_for(&self, letter: Letter, input: &KeyInput) -> Pitch {
        // Shift wins when both modifiers are held
        let accidental = if input.shift_key {
            Accidental::Sharp
        } else if input.alt_key {
            Accidental::Flat
        } else {
            Accidental::Natural
        };
        Pitch::new(letter, accidental, self.octave)
    }

    pub(crate) fn append_chord_note(&mut self, letter: Letter, input: &KeyInput) -> Instruction {
        let pitch = self.pitch_for(letter, input);
        if !self.chord_notes.contains(&pitch) {
            self.chord_notes.push(pitch);
        }
        self.last_chord_note_at = Some(self.clock.now_ms());
        Instruction::modifier(ModifierChange::ChordNote {
            pitch,
            chord_notes: self.chord_notes.clone(),
        })
    }

    pub(crate) fn play_pitch(&mut self, letter: Letter, input: &KeyInput) -> Instruction {
        let pitch = self.pitch_for(letter, input);
        if input.ctrl_key {
            // Entering (or re-entering) chord mode seeds a fresh chord
            self.chord_notes = vec![pitch];
            self.last_chord_note_at = Some(self.clock.now_ms());
            return Instruction::control(ControlAction::EnterChordMode);
        }
        Instruction::Note {
            pitch,
            duration: self.current_duration(),
            triplet: self.triplet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ShortcutEngine {
        ShortcutEngine::default()
    }

    #[test]
    fn test_dispatch_order() {
        assert_eq!(
            ShortcutEngine::dispatch_order(),
            vec![
                DispatchStage::ModeGate,
                DispatchStage::Control,
                DispatchStage::ChordAccumulation,
                DispatchStage::Duration,
                DispatchStage::Articulation,
                DispatchStage::Dynamic,
                DispatchStage::Pitch,
                DispatchStage::Unrecognized,
            ]
        );
    }

    #[test]
    fn test_plain_note() {
        let mut engine = engine();
        let instruction = engine.process_key_input(&KeyInput::new("c"), CaptureMode::Capture);
        assert_eq!(
            instruction,
            Instruction::Note {
                pitch: Pitch::natural(Letter::C, 4),
                duration: Duration::plain(DurationValue::Quarter),
                triplet: false,
            }
        );
    }

    #[test]
    fn test_shift_takes_precedence_over_alt() {
        let mut engine = engine();
        let input = KeyInput::new("F").shift().alt();
        match engine.process_key_input(&input, CaptureMode::Capture) {
            Instruction::Note { pitch, .. } => assert_eq!(pitch.to_string(), "F#4"),
            other => panic!("expected note, got {:?}", other),
        }
    }

    #[test]
    fn test_alt_gives_flat() {
        let mut engine = engine();
        match engine.process_key_input(&KeyInput::new("b").alt(), CaptureMode::Capture) {
            Instruction::Note { pitch, .. } => assert_eq!(pitch.to_string(), "Bb4"),
            other => panic!("expected note, got {:?}", other),
        }
    }

    #[test]
    fn test_undo_requires_ctrl() {
        let mut engine = engine();
        assert_eq!(
            engine.process_key_input(&KeyInput::new("z"), CaptureMode::Capture),
            Instruction::rejected(Rejection::Unrecognized)
        );
        assert_eq!(
            engine.process_key_input(&KeyInput::new("z").ctrl(), CaptureMode::Capture),
            Instruction::control(ControlAction::Undo)
        );
    }

    #[test]
    fn test_dotted_flag_wraps_note_duration() {
        let mut engine = engine();
        engine.process_key_input(&KeyInput::new("."), CaptureMode::Capture);
        match engine.process_key_input(&KeyInput::new("e"), CaptureMode::Capture) {
            Instruction::Note { duration, .. } => assert_eq!(duration, Duration::new(DurationValue::Quarter, 1)),
            other => panic!("expected note, got {:?}", other),
        }
    }

    #[test]
    fn test_chord_timeout_query() {
        let clock = Rc::new(crate::utils::clock::ManualClock::new(0));
        let mut engine = ShortcutEngine::with_clock(KeyMappings::default(), clock.clone());
        assert!(!engine.has_chord_timed_out(0));

        engine.process_key_input(&KeyInput::new("c").ctrl(), CaptureMode::Capture);
        clock.advance(400);
        assert!(!engine.has_chord_timed_out(500));
        clock.advance(100);
        assert!(engine.has_chord_timed_out(500));
    }

    #[test]
    fn test_set_defaults_applies_to_reset() {
        let mut engine = engine();
        engine.set_defaults(DurationValue::Eighth, 5);
        engine.process_key_input(&KeyInput::new("ArrowUp"), CaptureMode::Capture);
        engine.reset();

        let state = engine.current_state();
        assert_eq!(state.duration, DurationValue::Eighth);
        assert_eq!(state.octave, 5);
    }
}
