//! Tonebank - Oscillator bank tone generator
//!
//! A fixed bank of oscillators shared between a control thread and the
//! audio callback. Each note name is sounded by the first free oscillator,
//! and the bank is summed and scaled by a master volume into mono frames.

pub mod config;
pub mod engine;
pub mod synth;
pub mod viz;

pub use config::TonebankConfig;
pub use engine::{EngineError, NoteOutcome, SynthEngine, SynthHandle};
pub use synth::{frequency_of, Note, Oscillator, Waveform};
