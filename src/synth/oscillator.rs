//! Phase-accumulator oscillator

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Every waveform, in selection order
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// The waveform after this one, wrapping around
    pub fn next(self) -> Self {
        match self {
            Waveform::Sine => Waveform::Square,
            Waveform::Square => Waveform::Sawtooth,
            Waveform::Sawtooth => Waveform::Triangle,
            Waveform::Triangle => Waveform::Sine,
        }
    }

    /// Raw value at `phase` radians, in `[-1, 1]`.
    ///
    /// `phase` is expected in `[0, 2π)`. No band-limiting is applied.
    pub fn evaluate(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * (phase / TAU) - 1.0,
            // Trough at a quarter period, peak at three quarters, zero where
            // the sawtooth crosses zero
            Waveform::Triangle => 1.0 - 2.0 * (((phase / TAU + 0.75) % 1.0) * 2.0 - 1.0).abs(),
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        };
        f.write_str(name)
    }
}

/// A single periodic signal generator.
///
/// Holds a phase accumulator in radians that is advanced by a fixed increment
/// per sample. Inactive oscillators output silence and keep their phase.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    volume: f64,
    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
    active: bool,
}

impl Oscillator {
    /// Create a new, inactive oscillator at full volume
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            frequency,
            volume: 1.0,
            phase: 0.0,
            phase_increment: TAU * frequency / sample_rate,
            sample_rate,
            active: false,
        }
    }

    /// Set the frequency in Hz.
    ///
    /// Any value is accepted: zero holds the phase still and negative values
    /// run the waveform backwards.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.phase_increment = TAU * frequency / self.sample_rate;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Get the current volume
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the waveform. Takes effect on the next sample without resetting phase.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get the current waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Mark the oscillator as sounding or silent
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Check if the oscillator is sounding
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current phase in radians, always within `[0, 2π)`
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Sample rate in Hz the phase increment is computed for
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Generate the next sample
    pub fn produce_sample(&mut self) -> f64 {
        if !self.active {
            return 0.0;
        }

        self.phase = wrap_phase(self.phase + self.phase_increment);
        self.waveform.evaluate(self.phase) * self.volume
    }
}

/// Wrap a phase into `[0, 2π)`
fn wrap_phase(phase: f64) -> f64 {
    if (0.0..TAU).contains(&phase) {
        return phase;
    }
    if !phase.is_finite() {
        return 0.0;
    }

    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}
