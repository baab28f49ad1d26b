//! Note names to equal-tempered frequencies
//!
//! Names are a letter `A`-`G`, an optional `#`, and a single octave digit
//! (`"A4"`, `"C#3"`). Tuning is referenced to A4 = 440 Hz.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Reference pitch for A4 in Hz
pub const A4_FREQUENCY: f64 = 440.0;

/// Semitone index of A within an octave
const A_INDEX: i32 = 9;

/// Pitch class names indexed by semitone above C
const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Failure to turn a note name into a pitch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("empty note name")]
    Empty,

    #[error("invalid octave '{0}' (expected a single trailing digit)")]
    InvalidOctave(char),

    #[error("unknown pitch class '{0}'")]
    UnknownPitchClass(String),
}

/// A parsed note: pitch class plus octave.
///
/// `Note` is `Copy` and compares by value, so it can be used as a lookup key
/// without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    semitone: u8,
    octave: u8,
}

impl Note {
    /// Build a note from a semitone above C (0-11) and an octave (0-9)
    pub fn from_parts(semitone: u8, octave: u8) -> Option<Self> {
        (semitone < 12 && octave <= 9).then_some(Self { semitone, octave })
    }

    /// Semitone above C within the octave
    pub fn semitone(&self) -> u8 {
        self.semitone
    }

    /// Octave number
    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Signed distance in semitones from A4
    pub fn distance_from_a4(&self) -> i32 {
        (i32::from(self.octave) - 4) * 12 + (i32::from(self.semitone) - A_INDEX)
    }

    /// Equal-tempered frequency in Hz
    pub fn frequency(&self) -> f64 {
        A4_FREQUENCY * 2.0_f64.powf(f64::from(self.distance_from_a4()) / 12.0)
    }

    /// Note `steps` semitones above C of `octave`, carrying into later octaves
    pub fn offset_from_c(octave: u8, steps: u8) -> Option<Self> {
        let absolute = u16::from(octave) * 12 + u16::from(steps);
        Self::from_parts((absolute % 12) as u8, u8::try_from(absolute / 12).ok()?)
    }
}

impl FromStr for Note {
    type Err = PitchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (split, last) = name.char_indices().next_back().ok_or(PitchError::Empty)?;
        let octave = last
            .to_digit(10)
            .ok_or(PitchError::InvalidOctave(last))? as u8;

        let class = &name[..split];
        let semitone = PITCH_CLASSES
            .iter()
            .position(|&c| c == class)
            .ok_or_else(|| PitchError::UnknownPitchClass(class.to_string()))?;

        Ok(Self {
            semitone: semitone as u8,
            octave,
        })
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PITCH_CLASSES[self.semitone as usize], self.octave)
    }
}

/// Frequency in Hz of a note name such as `"A4"` or `"F#3"`
pub fn frequency_of(name: &str) -> Result<f64, PitchError> {
    name.parse::<Note>().map(|note| note.frequency())
}
