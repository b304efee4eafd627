//! Stateless musical value helpers
//!
//! Pitch parsing/formatting, beat arithmetic, measure counting and
//! transposition. Parse failures return `None` rather than erroring so the
//! key input path stays cheap.

use num_rational::Rational64;

use crate::models::{Duration, MusicalElement, Pitch, TimeSignature};

/// Parse a canonical pitch string (`"F#5"`)
pub fn parse_pitch(text: &str) -> Option<Pitch> {
    Pitch::parse(text)
}

/// Format a pitch in canonical form
pub fn format_pitch(pitch: &Pitch) -> String {
    pitch.to_string()
}

/// Beat value in whole notes, dots included
pub fn beat_value(duration: &Duration) -> f64 {
    duration.beat_value()
}

/// Exact length of an element as a fraction of a whole note
///
/// Barlines and header markers have zero length. Tuplets scale the written
/// duration by `normal / actual`.
pub fn element_length(element: &MusicalElement) -> Rational64 {
    let zero = Rational64::from_integer(0);
    let Some(duration) = element.duration() else {
        return zero;
    };
    let Some(length) = duration.fraction() else {
        return zero;
    };

    match element.tuplet() {
        Some(tuplet) if tuplet.actual > 0 => {
            length * Rational64::new(tuplet.normal as i64, tuplet.actual as i64)
        }
        _ => length,
    }
}

/// Total duration string of an element sequence under a time signature
///
/// Returns `"{measures}"` when the content fills whole measures, otherwise
/// `"{measures}.{remainderBeats}/{numerator}"`, where beats are counted in
/// units of the signature's denominator.
pub fn calculate_fragment_duration(elements: &[MusicalElement], time_signature: &TimeSignature) -> String {
    let total: Rational64 = elements.iter().map(element_length).sum();
    let numerator = time_signature.numerator.max(1) as i64;
    let beats = total * Rational64::from_integer(time_signature.denominator.max(1) as i64);

    let measures = (beats / numerator).floor();
    let remainder = beats - measures * numerator;

    if remainder == Rational64::from_integer(0) {
        format!("{}", measures.to_integer())
    } else {
        format!(
            "{}.{}/{}",
            measures.to_integer(),
            format_beats(remainder),
            numerator
        )
    }
}

/// Integer beats print as-is; fractional beats print as a trimmed decimal
fn format_beats(beats: Rational64) -> String {
    if beats.is_integer() {
        return beats.to_integer().to_string();
    }
    let value = *beats.numer() as f64 / *beats.denom() as f64;
    let text = format!("{:.3}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Number of measures, counted as barline elements
pub fn count_measures(elements: &[MusicalElement]) -> usize {
    elements.iter().filter(|element| element.is_barline()).count()
}

/// Transpose a pitch by a number of semitones
///
/// Results are spelled with sharps. Returns `None` when the result leaves
/// the supported octave range.
pub fn transpose(pitch: &Pitch, semitones: i32) -> Option<Pitch> {
    Pitch::from_midi_number(pitch.midi_number() + semitones)
}
