//! Pitch representation and conversion logic
//!
//! A pitch is a natural letter, an optional single accidental and an octave
//! in `0..=8`. The canonical string form is `"{letter}{#|b|}{octave}"`,
//! e.g. `"F#5"`, and parsing and formatting are exact inverses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest octave a pitch may carry
pub const MIN_OCTAVE: u8 = 0;

/// Highest octave a pitch may carry
pub const MAX_OCTAVE: u8 = 8;

/// Natural pitch letter
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Parse an uppercase letter name
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    /// Semitones above C within one octave
    pub fn semitones(&self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Accidental attached to a pitch
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    /// Get the symbol for this accidental
    pub fn symbol(&self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        }
    }

    /// Get the semitone offset for this accidental
    pub fn semitone_offset(&self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// Pitch with octave information
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: u8,
}

impl Pitch {
    /// Create a new pitch
    pub fn new(letter: Letter, accidental: Accidental, octave: u8) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// Natural pitch shorthand
    pub fn natural(letter: Letter, octave: u8) -> Self {
        Self::new(letter, Accidental::Natural, octave)
    }

    /// Parse the canonical `[A-G][#b]?[0-8]` form
    ///
    /// Returns `None` for anything else; the input path never errors.
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let letter = Letter::from_char(chars.next()?)?;

        let rest = chars.as_str();
        let (accidental, octave_text) = match rest.chars().next()? {
            '#' => (Accidental::Sharp, &rest[1..]),
            'b' => (Accidental::Flat, &rest[1..]),
            _ => (Accidental::Natural, rest),
        };

        let mut digits = octave_text.chars();
        let digit = digits.next()?.to_digit(10)?;
        if digits.next().is_some() || digit > MAX_OCTAVE as u32 {
            return None;
        }

        Some(Self::new(letter, accidental, digit as u8))
    }

    /// Whether the octave is inside the supported range
    pub fn is_valid(&self) -> bool {
        self.octave <= MAX_OCTAVE
    }

    /// MIDI note number (C4 = 60)
    pub fn midi_number(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.letter.semitones() + self.accidental.semitone_offset()
    }

    /// Create a pitch from a MIDI number, spelled with sharps
    ///
    /// Returns `None` when the octave falls outside `0..=8`.
    pub fn from_midi_number(midi: i32) -> Option<Self> {
        let octave = midi.div_euclid(12) - 1;
        if !(MIN_OCTAVE as i32..=MAX_OCTAVE as i32).contains(&octave) {
            return None;
        }

        let (letter, accidental) = match midi.rem_euclid(12) {
            0 => (Letter::C, Accidental::Natural),
            1 => (Letter::C, Accidental::Sharp),
            2 => (Letter::D, Accidental::Natural),
            3 => (Letter::D, Accidental::Sharp),
            4 => (Letter::E, Accidental::Natural),
            5 => (Letter::F, Accidental::Natural),
            6 => (Letter::F, Accidental::Sharp),
            7 => (Letter::G, Accidental::Natural),
            8 => (Letter::G, Accidental::Sharp),
            9 => (Letter::A, Accidental::Natural),
            10 => (Letter::A, Accidental::Sharp),
            _ => (Letter::B, Accidental::Natural),
        };

        Some(Self::new(letter, accidental, octave as u8))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.letter, self.accidental.symbol(), self.octave)
    }
}

impl FromStr for Pitch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pitch::parse(s).ok_or_else(|| format!("Invalid pitch: '{}'", s))
    }
}

// Pitches travel as their canonical string in JSON payloads
impl Serialize for Pitch {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pitch {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
