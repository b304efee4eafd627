//! Musical elements that make up a fragment
//!
//! Notes, rests and chords carry durations; barlines only separate measures;
//! time signature, key signature and tempo markers are inline header state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::duration::Duration;
use super::pitch::{Accidental, Letter, Pitch};

/// Barline types
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BarlineStyle {
    #[default]
    Single, // |
    Double,      // ||
    StartRepeat, // |:
    EndRepeat,   // :|
    Final,       // |]
}

impl BarlineStyle {
    /// Parse barline from its text form
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "|" => Some(BarlineStyle::Single),
            "||" => Some(BarlineStyle::Double),
            "|:" => Some(BarlineStyle::StartRepeat),
            ":|" => Some(BarlineStyle::EndRepeat),
            "|]" => Some(BarlineStyle::Final),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BarlineStyle::Single => "|",
            BarlineStyle::Double => "||",
            BarlineStyle::StartRepeat => "|:",
            BarlineStyle::EndRepeat => ":|",
            BarlineStyle::Final => "|]",
        }
    }
}

/// Tuplet ratio: `actual` notes in the time of `normal`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tuplet {
    pub actual: u8,
    pub normal: u8,
}

impl Tuplet {
    pub const TRIPLET: Tuplet = Tuplet { actual: 3, normal: 2 };
}

/// Time signature, e.g. 3/4
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Numerator in 1..=32, denominator a power of two up to 64
    pub fn is_valid(&self) -> bool {
        (1..=32).contains(&self.numerator)
            && self.denominator.is_power_of_two()
            && self.denominator <= 64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Major or minor mode of a key
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    #[default]
    Major,
    Minor,
}

/// Key signature: tonic letter (with accidental) and mode
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySignature {
    pub letter: Letter,
    #[serde(default)]
    pub accidental: Accidental,
    #[serde(default)]
    pub mode: KeyMode,
}

impl KeySignature {
    pub fn new(letter: Letter, accidental: Accidental, mode: KeyMode) -> Self {
        Self {
            letter,
            accidental,
            mode,
        }
    }

    pub fn major(letter: Letter) -> Self {
        Self::new(letter, Accidental::Natural, KeyMode::Major)
    }

    pub fn minor(letter: Letter) -> Self {
        Self::new(letter, Accidental::Natural, KeyMode::Minor)
    }

    /// Tonic name as written in notation headers ("F#", "Bb")
    pub fn tonic(&self) -> String {
        format!("{}{}", self.letter, self.accidental.symbol())
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        Self::major(Letter::C)
    }
}

/// A single element in a fragment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MusicalElement {
    Note {
        pitch: Pitch,
        duration: Duration,
        /// Displayed accidental, when it differs from the key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accidental: Option<Accidental>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        articulations: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dynamic: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tuplet: Option<Tuplet>,
    },
    Rest {
        duration: Duration,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tuplet: Option<Tuplet>,
    },
    Chord {
        pitches: Vec<Pitch>,
        duration: Duration,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        articulations: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dynamic: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tuplet: Option<Tuplet>,
    },
    Barline {
        #[serde(default)]
        style: BarlineStyle,
    },
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    Tempo {
        bpm: u16,
    },
}

impl MusicalElement {
    /// Plain note with no modifiers
    pub fn note(pitch: Pitch, duration: Duration) -> Self {
        MusicalElement::Note {
            pitch,
            duration,
            accidental: None,
            articulations: Vec::new(),
            dynamic: None,
            tuplet: None,
        }
    }

    pub fn rest(duration: Duration) -> Self {
        MusicalElement::Rest {
            duration,
            tuplet: None,
        }
    }

    pub fn chord(pitches: Vec<Pitch>, duration: Duration) -> Self {
        MusicalElement::Chord {
            pitches,
            duration,
            articulations: Vec::new(),
            dynamic: None,
            tuplet: None,
        }
    }

    pub fn barline() -> Self {
        MusicalElement::Barline {
            style: BarlineStyle::Single,
        }
    }

    /// Duration of notes, rests and chords
    pub fn duration(&self) -> Option<&Duration> {
        match self {
            MusicalElement::Note { duration, .. }
            | MusicalElement::Rest { duration, .. }
            | MusicalElement::Chord { duration, .. } => Some(duration),
            _ => None,
        }
    }

    pub fn tuplet(&self) -> Option<&Tuplet> {
        match self {
            MusicalElement::Note { tuplet, .. }
            | MusicalElement::Rest { tuplet, .. }
            | MusicalElement::Chord { tuplet, .. } => tuplet.as_ref(),
            _ => None,
        }
    }

    /// Whether this element takes up time (note, rest or chord)
    pub fn is_timed(&self) -> bool {
        self.duration().is_some()
    }

    /// Whether this element is an inline header marker
    pub fn is_header_marker(&self) -> bool {
        matches!(
            self,
            MusicalElement::TimeSignature(_)
                | MusicalElement::KeySignature(_)
                | MusicalElement::Tempo { .. }
        )
    }

    pub fn is_barline(&self) -> bool {
        matches!(self, MusicalElement::Barline { .. })
    }

    /// Short label used in log lines
    pub fn kind_name(&self) -> &'static str {
        match self {
            MusicalElement::Note { .. } => "note",
            MusicalElement::Rest { .. } => "rest",
            MusicalElement::Chord { .. } => "chord",
            MusicalElement::Barline { .. } => "barline",
            MusicalElement::TimeSignature(_) => "timeSignature",
            MusicalElement::KeySignature(_) => "keySignature",
            MusicalElement::Tempo { .. } => "tempo",
        }
    }
}
