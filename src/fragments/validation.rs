//! Element and header validation
//!
//! Checks are syntactic only: pitch range, duration shape, chord contents
//! and header placement. No music-theory rules are applied.

use thiserror::Error;

use crate::models::{Fragment, MusicalElement, Pitch, TimeSignature, Tuplet, MAX_DOTS};

/// Lowest accepted tempo in beats per minute
pub const MIN_TEMPO: u16 = 1;

/// Highest accepted tempo in beats per minute
pub const MAX_TEMPO: u16 = 400;

/// Reasons a fragment edit is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),

    #[error("Invalid duration: {dots} dots (maximum 4)")]
    TooManyDots { dots: u8 },

    #[error("Chord must contain at least one pitch")]
    EmptyChord,

    #[error("Invalid tuplet ratio {actual}:{normal}")]
    InvalidTuplet { actual: u8, normal: u8 },

    #[error("{marker} must precede the first note, rest or chord")]
    MisplacedHeader { marker: &'static str },

    #[error("Invalid time signature {0}")]
    InvalidTimeSignature(TimeSignature),

    #[error("Invalid tempo {0} (must be 1-400 bpm)")]
    InvalidTempo(u16),

    #[error("Cannot commit an empty fragment")]
    EmptyFragment,
}

/// Validate an element against the fragment it would be appended to
pub fn validate_element(fragment: &Fragment, element: &MusicalElement) -> Result<(), FragmentError> {
    if let Some(duration) = element.duration() {
        if duration.dots > MAX_DOTS {
            return Err(FragmentError::TooManyDots { dots: duration.dots });
        }
    }

    if let Some(tuplet) = element.tuplet() {
        validate_tuplet(tuplet)?;
    }

    match element {
        MusicalElement::Note { pitch, .. } => validate_pitch(pitch),
        MusicalElement::Chord { pitches, .. } => {
            if pitches.is_empty() {
                return Err(FragmentError::EmptyChord);
            }
            pitches.iter().try_for_each(validate_pitch)
        }
        MusicalElement::TimeSignature(time_signature) => {
            validate_header_placement(fragment, element)?;
            validate_time_signature(time_signature)
        }
        MusicalElement::KeySignature(_) => validate_header_placement(fragment, element),
        MusicalElement::Tempo { bpm } => {
            validate_header_placement(fragment, element)?;
            validate_tempo(*bpm)
        }
        MusicalElement::Rest { .. } | MusicalElement::Barline { .. } => Ok(()),
    }
}

pub fn validate_pitch(pitch: &Pitch) -> Result<(), FragmentError> {
    if pitch.is_valid() {
        Ok(())
    } else {
        Err(FragmentError::InvalidPitch(pitch.to_string()))
    }
}

pub fn validate_time_signature(time_signature: &TimeSignature) -> Result<(), FragmentError> {
    if time_signature.is_valid() {
        Ok(())
    } else {
        Err(FragmentError::InvalidTimeSignature(*time_signature))
    }
}

pub fn validate_tempo(bpm: u16) -> Result<(), FragmentError> {
    if (MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
        Ok(())
    } else {
        Err(FragmentError::InvalidTempo(bpm))
    }
}

fn validate_tuplet(tuplet: &Tuplet) -> Result<(), FragmentError> {
    if tuplet.actual == 0 || tuplet.normal == 0 {
        return Err(FragmentError::InvalidTuplet {
            actual: tuplet.actual,
            normal: tuplet.normal,
        });
    }
    Ok(())
}

/// Header markers may not follow a note, rest or chord
fn validate_header_placement(fragment: &Fragment, element: &MusicalElement) -> Result<(), FragmentError> {
    if fragment.has_timed_elements() {
        return Err(FragmentError::MisplacedHeader {
            marker: element.kind_name(),
        });
    }
    Ok(())
}
