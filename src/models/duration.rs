//! Note durations
//!
//! Base values are negative powers of two of a whole note. A duration may
//! carry any number of dots; each dot adds half of the previous addition.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest dot count that element validation accepts
pub const MAX_DOTS: u8 = 4;

/// Base duration value
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum DurationValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl DurationValue {
    pub const ALL: [DurationValue; 7] = [
        DurationValue::Whole,
        DurationValue::Half,
        DurationValue::Quarter,
        DurationValue::Eighth,
        DurationValue::Sixteenth,
        DurationValue::ThirtySecond,
        DurationValue::SixtyFourth,
    ];

    /// Denominator of the value as a fraction of a whole note
    pub fn divisions(&self) -> i64 {
        match self {
            DurationValue::Whole => 1,
            DurationValue::Half => 2,
            DurationValue::Quarter => 4,
            DurationValue::Eighth => 8,
            DurationValue::Sixteenth => 16,
            DurationValue::ThirtySecond => 32,
            DurationValue::SixtyFourth => 64,
        }
    }

    /// Fraction of a whole note, as a float
    pub fn beats(&self) -> f64 {
        1.0 / self.divisions() as f64
    }

    pub fn name(&self) -> &'static str {
        match self {
            DurationValue::Whole => "whole",
            DurationValue::Half => "half",
            DurationValue::Quarter => "quarter",
            DurationValue::Eighth => "eighth",
            DurationValue::Sixteenth => "sixteenth",
            DurationValue::ThirtySecond => "thirty-second",
            DurationValue::SixtyFourth => "sixty-fourth",
        }
    }

    /// Parse a duration name, as used in key mappings and config
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.name() == name)
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DurationValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown duration: '{}'", s))
    }
}

/// A base value with an optional dot count
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Duration {
    pub value: DurationValue,
    #[serde(default)]
    pub dots: u8,
}

impl Duration {
    pub fn new(value: DurationValue, dots: u8) -> Self {
        Self { value, dots }
    }

    /// Undotted duration
    pub fn plain(value: DurationValue) -> Self {
        Self::new(value, 0)
    }

    pub fn is_dotted(&self) -> bool {
        self.dots > 0
    }

    /// Beat value in whole notes: `base * (2 - 2^-dots)`
    pub fn beat_value(&self) -> f64 {
        let base = self.value.beats();
        (1..=self.dots as i32).fold(base, |total, k| total + base / 2f64.powi(k))
    }

    /// Exact fraction of a whole note
    ///
    /// Returns `None` when the dot count exceeds [`MAX_DOTS`].
    pub fn fraction(&self) -> Option<Rational64> {
        if self.dots > MAX_DOTS {
            return None;
        }
        let base = Rational64::new(1, self.value.divisions());
        let mut total = base;
        let mut addition = base;
        for _ in 0..self.dots {
            addition /= 2;
            total += addition;
        }
        Some(total)
    }
}

impl From<DurationValue> for Duration {
    fn from(value: DurationValue) -> Self {
        Duration::plain(value)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, ".".repeat(self.dots as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dots_equals_bare_value() {
        for value in DurationValue::ALL {
            assert_eq!(Duration::plain(value).beat_value(), value.beats());
        }
    }

    #[test]
    fn test_dotted_beat_values() {
        let dotted_quarter = Duration::new(DurationValue::Quarter, 1);
        assert_eq!(dotted_quarter.beat_value(), 0.375);

        let double_dotted_half = Duration::new(DurationValue::Half, 2);
        assert_eq!(double_dotted_half.beat_value(), 0.875);
    }

    #[test]
    fn test_exact_fraction() {
        let dotted_eighth = Duration::new(DurationValue::Eighth, 1);
        assert_eq!(dotted_eighth.fraction(), Some(Rational64::new(3, 16)));
        assert_eq!(Duration::new(DurationValue::Quarter, MAX_DOTS + 1).fraction(), None);
    }

    #[test]
    fn test_names_round_trip() {
        for value in DurationValue::ALL {
            assert_eq!(DurationValue::from_name(value.name()), Some(value));
        }
        assert_eq!(DurationValue::from_name("dotted-quarter"), None);
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&Duration::plain(DurationValue::ThirtySecond)).unwrap();
        assert_eq!(json, r#"{"value":"thirty-second","dots":0}"#);
    }
}
