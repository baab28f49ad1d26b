//! Sound generation primitives
//!
//! Oscillators and the note-name pitch table that feeds them.

mod oscillator;
mod pitch;

pub use oscillator::{Oscillator, Waveform};
pub use pitch::{frequency_of, Note, PitchError, A4_FREQUENCY};
