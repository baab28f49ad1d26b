//! Audio engine for Tonebank
//!
//! Owns the oscillator bank and the audio transport. Control calls go through
//! the shared [`SynthHandle`]; the transport pulls frames through the same
//! handle from its own thread.

mod error;
mod player;
mod recorder;
mod state;
mod transport;

pub use error::{EngineError, Result};
pub use player::{default_device_name, list_output_devices, CpalTransport, OutputDevice};
pub use recorder::Recorder;
pub use state::{NoteOutcome, SynthHandle};
pub use transport::{
    OfflineClock, OfflineTransport, RenderCallback, StreamSettings, Transport, TransportError,
};

use std::sync::{Arc, Mutex};

use crate::config::TonebankConfig;
use crate::synth::{Oscillator, Waveform};
use crate::viz::SampleBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// No stream has been opened yet
    Closed,
    /// Stream open but not pulling frames
    Stopped,
    Running,
    ShutDown,
}

/// The main audio engine
pub struct SynthEngine {
    synth: SynthHandle,
    transport: Box<dyn Transport>,
    settings: StreamSettings,
    stream: StreamState,
    scope: Option<Arc<Mutex<SampleBuffer>>>,
}

impl SynthEngine {
    /// Create an engine over pre-built oscillators.
    ///
    /// The oscillators are expected to share `settings.sample_rate`.
    pub fn new(
        settings: StreamSettings,
        oscillators: Vec<Oscillator>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            synth: SynthHandle::new(oscillators),
            transport,
            settings,
            stream: StreamState::Closed,
            scope: None,
        }
    }

    /// Create an engine from a configuration
    pub fn from_config(config: &TonebankConfig, transport: Box<dyn Transport>) -> Self {
        let engine = Self::new(config.stream_settings(), config.build_oscillators(), transport);
        engine.synth.set_master_volume(config.master.volume);
        engine
    }

    /// Copy every rendered buffer into `scope` for display.
    ///
    /// Must be set before the stream is opened.
    pub fn with_scope(mut self, scope: Arc<Mutex<SampleBuffer>>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// A cloneable control handle for other threads
    pub fn handle(&self) -> SynthHandle {
        self.synth.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.settings.sample_rate
    }

    pub fn oscillator_count(&self) -> usize {
        self.synth.oscillator_count()
    }

    /// Check if the transport is pulling frames
    pub fn is_running(&self) -> bool {
        self.stream == StreamState::Running
    }

    pub fn set_master_volume(&self, volume: f64) {
        self.synth.set_master_volume(volume);
    }

    pub fn master_volume(&self) -> f64 {
        self.synth.master_volume()
    }

    pub fn set_oscillator_frequency(&self, index: usize, frequency: f64) -> Result<()> {
        self.synth.set_oscillator_frequency(index, frequency)
    }

    pub fn set_oscillator_volume(&self, index: usize, volume: f64) -> Result<()> {
        self.synth.set_oscillator_volume(index, volume)
    }

    pub fn set_oscillator_waveform(&self, index: usize, waveform: Waveform) -> Result<()> {
        self.synth.set_oscillator_waveform(index, waveform)
    }

    pub fn waveform(&self, index: usize) -> Result<Waveform> {
        self.synth.waveform(index)
    }

    pub fn oscillator(&self, index: usize) -> Result<Oscillator> {
        self.synth.oscillator(index)
    }

    pub fn note_on(&self, name: &str, volume: f64) -> Result<NoteOutcome> {
        self.synth.note_on(name, volume)
    }

    pub fn note_off(&self, name: &str) -> bool {
        self.synth.note_off(name)
    }

    /// Fill a mono buffer directly, bypassing the transport
    pub fn produce_buffer(&self, out: &mut [f32]) {
        self.synth.render(out);
    }

    /// Start the engine, opening the stream first if needed.
    ///
    /// If the stream fails to start it is closed again before the error is
    /// returned, so a failed start never leaves a callback installed.
    pub fn start(&mut self) -> Result<()> {
        match self.stream {
            StreamState::ShutDown => return Err(EngineError::ShutDown),
            StreamState::Running => return Ok(()),
            StreamState::Closed => self.open()?,
            StreamState::Stopped => {}
        }

        if let Err(err) = self.transport.start() {
            if let Err(close_err) = self.transport.close() {
                tracing::warn!(%close_err, "failed to close stream after start failure");
            }
            self.stream = StreamState::Closed;
            tracing::error!(transport = self.transport.name(), %err, "audio stream failed to start");
            return Err(err.into());
        }

        self.stream = StreamState::Running;
        tracing::info!(transport = self.transport.name(), "audio stream started");
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let synth = self.synth.clone();
        let scope = self.scope.clone();
        let render: RenderCallback = Box::new(move |out: &mut [f32]| {
            synth.render(out);

            // Never wait on the display
            if let Some(scope) = &scope {
                if let Ok(mut buffer) = scope.try_lock() {
                    buffer.extend(out);
                }
            }
        });

        self.transport.open(&self.settings, render)?;
        self.stream = StreamState::Stopped;
        tracing::info!(
            transport = self.transport.name(),
            sample_rate = self.settings.sample_rate,
            buffer_size = self.settings.buffer_size,
            "audio stream opened"
        );
        Ok(())
    }

    /// Stop pulling frames. The stream stays open and can be restarted.
    pub fn stop(&mut self) -> Result<()> {
        match self.stream {
            StreamState::ShutDown => Err(EngineError::ShutDown),
            StreamState::Closed | StreamState::Stopped => Ok(()),
            StreamState::Running => {
                self.transport.stop()?;
                self.stream = StreamState::Stopped;
                tracing::info!(transport = self.transport.name(), "audio stream stopped");
                Ok(())
            }
        }
    }

    /// Stop and close the stream.
    ///
    /// Closing a stream that was never opened, or shutting down twice, is
    /// reported as [`TransportError::NotOpen`].
    pub fn shutdown(&mut self) -> Result<()> {
        if self.stream == StreamState::Running {
            if let Err(err) = self.transport.stop() {
                tracing::warn!(%err, "failed to stop stream during shutdown");
            }
        }

        let closed = self.transport.close();
        self.stream = StreamState::ShutDown;
        closed?;

        tracing::info!(transport = self.transport.name(), "audio stream closed");
        Ok(())
    }
}

impl Drop for SynthEngine {
    fn drop(&mut self) {
        if matches!(self.stream, StreamState::Running | StreamState::Stopped) {
            if let Err(err) = self.shutdown() {
                tracing::debug!(%err, "shutdown on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine(count: usize) -> (SynthEngine, OfflineClock) {
        let settings = StreamSettings::default();
        let oscillators = (0..count)
            .map(|_| Oscillator::new(Waveform::Sine, 440.0, settings.sample_rate as f64))
            .collect();
        let (transport, clock) = OfflineTransport::new();
        (SynthEngine::new(settings, oscillators, Box::new(transport)), clock)
    }

    #[test]
    fn test_engine_creation() {
        let (engine, clock) = test_engine(3);

        assert_eq!(engine.sample_rate(), 44100);
        assert_eq!(engine.oscillator_count(), 3);
        assert!(!engine.is_running());
        assert!(!clock.is_open());
    }

    #[test]
    fn test_engine_start_pumps_frames() {
        let (mut engine, clock) = test_engine(1);
        engine.note_on("A4", 1.0).unwrap();

        let mut buffer = vec![0.0f32; 64];
        assert!(!clock.pump(&mut buffer));

        engine.start().unwrap();
        assert!(engine.is_running());
        assert!(clock.pump(&mut buffer));
        assert!(buffer.iter().any(|&s| s.abs() > 0.0));
    }

    #[test]
    fn test_engine_stop_and_restart() {
        let (mut engine, clock) = test_engine(1);

        engine.start().unwrap();
        engine.stop().unwrap();
        assert!(!engine.is_running());
        assert!(clock.is_open());
        assert!(!clock.is_running());

        engine.start().unwrap();
        assert!(clock.is_running());
    }

    #[test]
    fn test_engine_start_twice_is_noop() {
        let (mut engine, _clock) = test_engine(1);
        engine.start().unwrap();
        assert!(engine.start().is_ok());
    }

    #[test]
    fn test_engine_shutdown_twice_fails() {
        let (mut engine, clock) = test_engine(1);
        engine.start().unwrap();

        engine.shutdown().unwrap();
        assert!(!clock.is_open());
        assert_eq!(
            engine.shutdown(),
            Err(EngineError::Transport(TransportError::NotOpen))
        );
        assert_eq!(engine.start(), Err(EngineError::ShutDown));
        assert_eq!(engine.stop(), Err(EngineError::ShutDown));
    }

    #[test]
    fn test_engine_shutdown_without_open_fails() {
        let (mut engine, _clock) = test_engine(1);
        assert_eq!(
            engine.shutdown(),
            Err(EngineError::Transport(TransportError::NotOpen))
        );
    }

    #[test]
    fn test_engine_drop_closes_stream() {
        let (mut engine, clock) = test_engine(1);
        engine.start().unwrap();
        drop(engine);
        assert!(!clock.is_open());
    }

    #[test]
    fn test_engine_scope_receives_output() {
        let (engine, clock) = test_engine(1);
        let scope = Arc::new(Mutex::new(SampleBuffer::new(16)));
        let mut engine = engine.with_scope(Arc::clone(&scope));

        engine.note_on("A4", 1.0).unwrap();
        engine.start().unwrap();

        let mut buffer = vec![0.0f32; 16];
        clock.pump(&mut buffer);

        assert_eq!(scope.lock().unwrap().get_samples(), buffer);
    }

    #[test]
    fn test_engine_from_config() {
        let config = TonebankConfig::default();
        let (transport, _clock) = OfflineTransport::new();
        let engine = SynthEngine::from_config(&config, Box::new(transport));

        assert_eq!(engine.oscillator_count(), 3);
        assert_eq!(engine.waveform(1).unwrap(), Waveform::Square);
        assert_eq!(engine.master_volume(), 1.0);
    }

    #[test]
    fn test_produce_buffer_silent_without_notes() {
        let (engine, _clock) = test_engine(3);
        let mut buffer = vec![1.0f32; 32];
        engine.produce_buffer(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
