//! ABC notation text renderer
//!
//! Writes the fragment as an ABC tune into an in-memory buffer. Useful for
//! hosts without a drawing backend and for exercising the renderer
//! contract in tests.

use num_rational::Rational64;

use super::{RenderError, RenderSurface, Renderer};
use crate::config::RenderingOptions;
use crate::models::{Accidental, Duration, Fragment, KeyMode, KeySignature, MusicalElement, Pitch, Tuplet};

/// Unit note length written in the `L:` header
const UNIT_DIVISIONS: i64 = 64;

#[derive(Debug)]
pub struct AbcRenderer {
    available: bool,
    initialized: bool,
    show_key_signature: bool,
    show_time_signature: bool,
    header: String,
    body: String,
    highlighted: Option<usize>,
    width: u32,
    height: u32,
}

impl Default for AbcRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AbcRenderer {
    pub fn new() -> Self {
        Self {
            available: true,
            initialized: false,
            show_key_signature: true,
            show_time_signature: true,
            header: String::new(),
            body: String::new(),
            highlighted: None,
            width: 0,
            height: 0,
        }
    }

    /// A renderer that reports itself unavailable
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// The complete tune text
    pub fn output(&self) -> String {
        if self.header.is_empty() && self.body.is_empty() {
            return String::new();
        }
        format!("{}{}\n", self.header, self.body)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn write_header(&mut self, fragment: &Fragment) {
        let mut header = String::new();
        header.push_str("X:1\n");
        if self.show_time_signature {
            header.push_str(&format!("M:{}\n", fragment.time_signature));
        }
        header.push_str(&format!("L:1/{}\n", UNIT_DIVISIONS));
        header.push_str(&format!("Q:1/4={}\n", fragment.tempo));
        if self.show_key_signature {
            header.push_str(&format!("K:{}\n", key_field(&fragment.key_signature)));
        } else {
            header.push_str("K:none\n");
        }
        self.header = header;
    }

    fn write_body(&mut self, elements: &[MusicalElement]) {
        let tokens: Vec<String> = elements.iter().map(element_token).collect();
        self.body = tokens.join(" ");
    }

    fn ensure_ready(&self) -> Result<(), RenderError> {
        if !self.available {
            return Err(RenderError::Unavailable);
        }
        if !self.initialized {
            return Err(RenderError::RenderFailed("renderer not initialized".to_string()));
        }
        Ok(())
    }
}

impl Renderer for AbcRenderer {
    fn initialize(&mut self, surface: &RenderSurface, options: &RenderingOptions) -> Result<(), RenderError> {
        if !self.available {
            return Err(RenderError::Unavailable);
        }
        self.show_key_signature = options.show_key_signature;
        self.show_time_signature = options.show_time_signature;
        self.width = surface.width;
        self.height = surface.height;
        self.initialized = true;
        log::debug!("abc renderer attached to {}", surface.container_id);
        Ok(())
    }

    fn render(&mut self, fragment: &Fragment) -> Result<(), RenderError> {
        self.ensure_ready()?;
        self.write_header(fragment);
        self.write_body(&fragment.elements);
        self.highlighted = None;
        Ok(())
    }

    fn update(&mut self, elements: &[MusicalElement]) -> Result<(), RenderError> {
        self.ensure_ready()?;
        if self.header.is_empty() {
            self.write_header(&Fragment::new());
        }
        self.write_body(elements);
        Ok(())
    }

    fn highlight(&mut self, index: usize) {
        self.highlighted = Some(index);
    }

    fn clear_highlight(&mut self) {
        self.highlighted = None;
    }

    fn clear(&mut self) {
        self.header.clear();
        self.body.clear();
        self.highlighted = None;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn destroy(&mut self) {
        self.clear();
        self.initialized = false;
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

fn key_field(key: &KeySignature) -> String {
    match key.mode {
        KeyMode::Major => key.tonic(),
        KeyMode::Minor => format!("{}m", key.tonic()),
    }
}

fn element_token(element: &MusicalElement) -> String {
    match element {
        MusicalElement::Note {
            pitch,
            duration,
            accidental,
            articulations,
            dynamic,
            tuplet,
        } => {
            let mut token = decorations(articulations, dynamic.as_deref());
            token.push_str(&tuplet_prefix(tuplet.as_ref()));
            token.push_str(&pitch_token(pitch, *accidental));
            token.push_str(&length_token(duration));
            token
        }
        MusicalElement::Rest { duration, tuplet } => {
            format!("{}z{}", tuplet_prefix(tuplet.as_ref()), length_token(duration))
        }
        MusicalElement::Chord {
            pitches,
            duration,
            articulations,
            dynamic,
            tuplet,
        } => {
            let mut token = decorations(articulations, dynamic.as_deref());
            token.push_str(&tuplet_prefix(tuplet.as_ref()));
            token.push('[');
            for pitch in pitches {
                token.push_str(&pitch_token(pitch, None));
            }
            token.push(']');
            token.push_str(&length_token(duration));
            token
        }
        MusicalElement::Barline { style } => style.symbol().to_string(),
        MusicalElement::TimeSignature(time_signature) => format!("[M:{}]", time_signature),
        MusicalElement::KeySignature(key) => format!("[K:{}]", key_field(key)),
        MusicalElement::Tempo { bpm } => format!("[Q:1/4={}]", bpm),
    }
}

fn decorations(articulations: &[String], dynamic: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(dynamic) = dynamic {
        out.push_str(&format!("!{}!", dynamic));
    }
    for name in articulations {
        out.push_str(&format!("!{}!", name));
    }
    out
}

/// `(p:q:1` applies the ratio to this element only
fn tuplet_prefix(tuplet: Option<&Tuplet>) -> String {
    match tuplet {
        Some(t) => format!("({}:{}:1", t.actual, t.normal),
        None => String::new(),
    }
}

/// ABC pitch: C4 is `C`, C5 is `c`, higher octaves add `'`, lower add `,`
fn pitch_token(pitch: &Pitch, explicit: Option<Accidental>) -> String {
    let mut out = String::new();
    match pitch.accidental {
        Accidental::Sharp => out.push('^'),
        Accidental::Flat => out.push('_'),
        Accidental::Natural if explicit == Some(Accidental::Natural) => out.push('='),
        Accidental::Natural => {}
    }

    let letter = pitch.letter.as_char();
    if pitch.octave >= 5 {
        out.push(letter.to_ascii_lowercase());
        for _ in 5..pitch.octave {
            out.push('\'');
        }
    } else {
        out.push(letter);
        for _ in pitch.octave..4 {
            out.push(',');
        }
    }
    out
}

/// Length in units of 1/64, omitted when exactly one unit
fn length_token(duration: &Duration) -> String {
    let Some(fraction) = duration.fraction() else {
        return String::new();
    };
    let units = fraction * Rational64::from_integer(UNIT_DIVISIONS);
    if units == Rational64::from_integer(1) {
        String::new()
    } else if units.is_integer() {
        units.to_integer().to_string()
    } else {
        format!("{}/{}", units.numer(), units.denom())
    }
}
