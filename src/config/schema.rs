//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::engine::StreamSettings;
use crate::synth::{Oscillator, Waveform};

/// Most oscillators a bank may hold
pub const MAX_OSCILLATORS: usize = 16;

/// Main configuration for Tonebank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TonebankConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master settings
    #[serde(default)]
    pub master: MasterConfig,

    /// The oscillator bank, in allocation order
    #[serde(default = "default_oscillators")]
    pub oscillators: Vec<OscillatorConfig>,

    /// Terminal keyboard settings
    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

impl Default for TonebankConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            master: MasterConfig::default(),
            oscillators: default_oscillators(),
            keyboard: KeyboardConfig::default(),
        }
    }
}

impl TonebankConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 16 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 16 and 8192");
        }

        // Validate master settings
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }

        // Validate the bank
        if self.oscillators.is_empty() {
            bail!("At least one oscillator is required");
        }
        if self.oscillators.len() > MAX_OSCILLATORS {
            bail!("At most {} oscillators are supported", MAX_OSCILLATORS);
        }
        for (index, osc) in self.oscillators.iter().enumerate() {
            if !osc.frequency.is_finite() {
                bail!("Oscillator {} frequency must be a finite number", index);
            }
            if !(0.0..=1.0).contains(&osc.volume) {
                bail!("Oscillator {} volume must be between 0.0 and 1.0", index);
            }
        }

        // Validate keyboard settings
        if self.keyboard.base_octave > 8 {
            bail!("Keyboard base octave must be between 0 and 8");
        }
        if !(0.0..=1.0).contains(&self.keyboard.velocity) {
            bail!("Keyboard velocity must be between 0.0 and 1.0");
        }

        Ok(())
    }

    /// Stream parameters for the transport
    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            sample_rate: self.audio.sample_rate,
            buffer_size: self.audio.buffer_size,
            device: self.audio.device.clone(),
        }
    }

    /// Build the oscillator bank described by this configuration
    pub fn build_oscillators(&self) -> Vec<Oscillator> {
        let sample_rate = self.audio.sample_rate as f64;
        self.oscillators
            .iter()
            .map(|cfg| {
                let mut osc = Oscillator::new(cfg.waveform, cfg.frequency, sample_rate);
                osc.set_volume(cfg.volume);
                osc
            })
            .collect()
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per callback (default: 64)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> u32 { 64 }

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 1.0)
    #[serde(default = "default_volume")]
    pub volume: f64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self { volume: default_volume() }
    }
}

fn default_volume() -> f64 { 1.0 }

/// One oscillator in the bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorConfig {
    /// Waveform (default: sine)
    #[serde(default)]
    pub waveform: Waveform,

    /// Initial frequency in Hz (default: 440)
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Initial volume 0.0-1.0 (default: 1.0)
    #[serde(default = "default_volume")]
    pub volume: f64,
}

impl OscillatorConfig {
    fn with_waveform(waveform: Waveform) -> Self {
        Self {
            waveform,
            frequency: default_frequency(),
            volume: default_volume(),
        }
    }
}

fn default_frequency() -> f64 { 440.0 }

fn default_oscillators() -> Vec<OscillatorConfig> {
    vec![
        OscillatorConfig::with_waveform(Waveform::Sine),
        OscillatorConfig::with_waveform(Waveform::Square),
        OscillatorConfig::with_waveform(Waveform::Sawtooth),
    ]
}

/// Terminal keyboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Octave of the lowest key (default: 4)
    #[serde(default = "default_base_octave")]
    pub base_octave: u8,

    /// Volume given to triggered notes 0.0-1.0 (default: 0.5)
    #[serde(default = "default_velocity")]
    pub velocity: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            base_octave: default_base_octave(),
            velocity: default_velocity(),
        }
    }
}

fn default_base_octave() -> u8 { 4 }
fn default_velocity() -> f64 { 0.5 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 64); // default
        assert!(config.device.is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = TonebankConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: TonebankConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.master.volume, 1.0);
        assert_eq!(config.keyboard.base_octave, 4);
        assert_eq!(config.oscillators.len(), 3);
        assert_eq!(config.oscillators[2].waveform, Waveform::Sawtooth);
    }

    #[test]
    fn test_oscillator_config() {
        let yaml = r#"
waveform: triangle
frequency: 220
"#;
        let config: OscillatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.waveform, Waveform::Triangle);
        assert_eq!(config.frequency, 220.0);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn test_unknown_waveform_rejected() {
        let yaml = "waveform: noise";
        assert!(serde_yaml::from_str::<OscillatorConfig>(yaml).is_err());
    }

    #[test]
    fn test_build_oscillators() {
        let mut config = TonebankConfig::default();
        config.oscillators[0].volume = 0.3;

        let bank = config.build_oscillators();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank[0].volume(), 0.3);
        assert_eq!(bank[1].waveform(), Waveform::Square);
        assert_eq!(bank[0].sample_rate(), 44100.0);
        assert!(bank.iter().all(|osc| !osc.is_active()));
    }

    #[test]
    fn test_stream_settings() {
        let mut config = TonebankConfig::default();
        config.audio.device = Some("pulse".to_string());

        let settings = config.stream_settings();
        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.buffer_size, 64);
        assert_eq!(settings.device.as_deref(), Some("pulse"));
    }

    #[test]
    fn test_invalid_sample_rate() {
        let mut config = TonebankConfig::default();
        config.audio.sample_rate = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_master_volume() {
        let mut config = TonebankConfig::default();
        config.master.volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_bank_rejected() {
        let mut config = TonebankConfig::default();
        config.oscillators.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_bank_rejected() {
        let mut config = TonebankConfig::default();
        config.oscillators = (0..=MAX_OSCILLATORS)
            .map(|_| OscillatorConfig::with_waveform(Waveform::Sine))
            .collect();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_octave() {
        let mut config = TonebankConfig::default();
        config.keyboard.base_octave = 9;
        assert!(config.validate().is_err());
    }
}
