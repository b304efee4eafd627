//! Stateless helpers exported to JavaScript

use serde::Serialize;
use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, serialize, validation_error};
use crate::config::CaptureConfig;
use crate::models::{Accidental, MusicalElement, TimeSignature};
use crate::utils::music::{calculate_fragment_duration, parse_pitch};
use crate::wasm_log;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PitchInfo {
    letter: String,
    accidental: Accidental,
    octave: u8,
    midi_number: i32,
    canonical: String,
}

/// Parse `"C#4"`-style text; `null` when invalid
#[wasm_bindgen(js_name = parsePitch)]
pub fn parse_pitch_js(text: &str) -> Result<JsValue, JsValue> {
    let Some(pitch) = parse_pitch(text) else {
        wasm_log!("parsePitch: {:?} is not a pitch", text);
        return Ok(JsValue::NULL);
    };
    serialize(
        &PitchInfo {
            letter: pitch.letter.to_string(),
            accidental: pitch.accidental,
            octave: pitch.octave,
            midi_number: pitch.midi_number(),
            canonical: pitch.to_string(),
        },
        "pitch",
    )
}

/// Duration string ("measures.beats/numerator") for an element list
#[wasm_bindgen(js_name = calculateFragmentDuration)]
pub fn calculate_fragment_duration_js(elements: JsValue, numerator: u8, denominator: u8) -> Result<String, JsValue> {
    let elements: Vec<MusicalElement> = deserialize(elements, "Invalid elements")?;
    let time_signature = TimeSignature::new(numerator, denominator);
    if !time_signature.is_valid() {
        return Err(validation_error(format!("Invalid time signature: {}", time_signature)));
    }
    Ok(calculate_fragment_duration(&elements, &time_signature))
}

/// The default capture configuration as a plain object
#[wasm_bindgen(js_name = defaultConfig)]
pub fn default_config() -> Result<JsValue, JsValue> {
    serialize(&CaptureConfig::default(), "default config")
}
