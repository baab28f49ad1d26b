//! End-to-end engine tests driven through the offline transport.

use std::sync::{Arc, Mutex};

use tonebank::engine::{
    EngineError, NoteOutcome, OfflineClock, OfflineTransport, RenderCallback, StreamSettings,
    SynthEngine, Transport, TransportError,
};
use tonebank::synth::{frequency_of, Oscillator, Waveform};

fn sine_bank(count: usize, sample_rate: u32) -> Vec<Oscillator> {
    (0..count)
        .map(|_| Oscillator::new(Waveform::Sine, 440.0, sample_rate as f64))
        .collect()
}

fn offline_engine(count: usize) -> (SynthEngine, OfflineClock) {
    let settings = StreamSettings::default();
    let (transport, clock) = OfflineTransport::new();
    let engine = SynthEngine::new(
        settings.clone(),
        sine_bank(count, settings.sample_rate),
        Box::new(transport),
    );
    (engine, clock)
}

#[test]
fn first_sample_of_a4_sine() {
    let (mut engine, clock) = offline_engine(1);
    assert_eq!(engine.note_on("A4", 1.0), Ok(NoteOutcome::Started(0)));
    engine.start().unwrap();

    let mut frame = [0.0f32; 1];
    assert!(clock.pump(&mut frame));

    let expected = (std::f64::consts::TAU * 440.0 / 44100.0).sin() as f32;
    assert!((frame[0] - expected).abs() < 1e-6, "got {}", frame[0]);
}

#[test]
fn chord_fills_bank_and_drops_extra_note() {
    let (engine, _clock) = offline_engine(3);

    assert_eq!(engine.note_on("C4", 0.5), Ok(NoteOutcome::Started(0)));
    assert_eq!(engine.note_on("E4", 0.5), Ok(NoteOutcome::Started(1)));
    assert_eq!(engine.note_on("G4", 0.5), Ok(NoteOutcome::Started(2)));

    let before: Vec<(f64, f64)> = (0..3)
        .map(|i| {
            let osc = engine.oscillator(i).unwrap();
            (osc.frequency(), osc.volume())
        })
        .collect();

    assert_eq!(engine.note_on("B4", 0.9), Ok(NoteOutcome::Dropped));

    for (i, (frequency, volume)) in before.into_iter().enumerate() {
        let osc = engine.oscillator(i).unwrap();
        assert_eq!(osc.frequency(), frequency);
        assert_eq!(osc.volume(), volume);
        assert!(osc.is_active());
    }

    // B4 never sounded, so releasing it changes nothing
    assert!(!engine.note_off("B4"));
    assert_eq!(engine.handle().active_notes().len(), 3);
}

#[test]
fn pitch_lookup() {
    assert_eq!(frequency_of("A4").unwrap(), 440.0);
    assert_eq!(frequency_of("A5").unwrap(), 880.0);
    assert_eq!(frequency_of("A3").unwrap(), 220.0);
    assert!((frequency_of("C4").unwrap() - 261.63).abs() < 0.01);
}

#[test]
fn repeated_note_on_keeps_one_oscillator() {
    let (engine, _clock) = offline_engine(2);

    assert_eq!(engine.note_on("D4", 0.5), Ok(NoteOutcome::Started(0)));
    assert_eq!(engine.note_on("D4", 0.8), Ok(NoteOutcome::AlreadyHeld(0)));

    assert!(!engine.oscillator(1).unwrap().is_active());
    assert_eq!(engine.oscillator(0).unwrap().volume(), 0.5);
}

#[test]
fn note_off_of_invalid_name_is_noop() {
    let (engine, _clock) = offline_engine(1);
    engine.note_on("A4", 1.0).unwrap();

    assert!(!engine.note_off("Z9"));
    assert!(engine.oscillator(0).unwrap().is_active());

    assert!(engine.note_off("A4"));
    let osc = engine.oscillator(0).unwrap();
    assert!(!osc.is_active());
    assert_eq!(osc.volume(), 0.0);
}

#[test]
fn released_oscillator_is_reused() {
    let (engine, _clock) = offline_engine(2);
    engine.note_on("C4", 1.0).unwrap();
    engine.note_on("D4", 1.0).unwrap();

    engine.note_off("C4");
    assert_eq!(engine.note_on("F4", 1.0), Ok(NoteOutcome::Started(0)));
}

#[test]
fn invalid_note_on_is_an_error() {
    let (engine, _clock) = offline_engine(1);
    assert!(matches!(engine.note_on("H2", 1.0), Err(EngineError::Pitch(_))));
    assert!(!engine.oscillator(0).unwrap().is_active());
}

#[test]
fn output_scales_with_master_volume() {
    let (engine, _clock) = offline_engine(1);
    engine.set_oscillator_waveform(0, Waveform::Square).unwrap();
    engine.note_on("A4", 0.5).unwrap();
    engine.set_master_volume(0.5);

    let mut buffer = [0.0f32; 8];
    engine.produce_buffer(&mut buffer);
    assert!(buffer.iter().all(|&s| (s.abs() - 0.25).abs() < 1e-6));
}

#[test]
fn control_from_another_thread() {
    let (mut engine, clock) = offline_engine(4);
    engine.start().unwrap();

    let handle = engine.handle();
    let control = std::thread::spawn(move || {
        for name in ["C4", "E4", "G4", "B4"] {
            handle.note_on(name, 0.25).unwrap();
        }
    });

    let mut buffer = vec![0.0f32; 64];
    for _ in 0..100 {
        clock.pump(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    control.join().unwrap();
    assert_eq!(engine.handle().active_notes().len(), 4);
}

/// Transport that fails at a chosen stage and records what is installed
struct FailingTransport {
    fail_open: bool,
    installed: Arc<Mutex<Option<RenderCallback>>>,
}

impl Transport for FailingTransport {
    fn name(&self) -> &str {
        "failing"
    }

    fn open(&mut self, _settings: &StreamSettings, render: RenderCallback) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::Open("device busy".to_string()));
        }
        *self.installed.lock().unwrap() = Some(render);
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        Err(TransportError::Start("device vanished".to_string()))
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.installed
            .lock()
            .unwrap()
            .take()
            .map(drop)
            .ok_or(TransportError::NotOpen)
    }
}

fn failing_engine(fail_open: bool) -> (SynthEngine, Arc<Mutex<Option<RenderCallback>>>) {
    let installed = Arc::new(Mutex::new(None));
    let transport = FailingTransport {
        fail_open,
        installed: Arc::clone(&installed),
    };
    let settings = StreamSettings::default();
    let engine = SynthEngine::new(settings, sine_bank(1, 44100), Box::new(transport));
    (engine, installed)
}

#[test]
fn failed_open_installs_nothing() {
    let (mut engine, installed) = failing_engine(true);

    assert_eq!(
        engine.start(),
        Err(EngineError::Transport(TransportError::Open("device busy".to_string())))
    );
    assert!(installed.lock().unwrap().is_none());
    assert!(!engine.is_running());
}

#[test]
fn failed_start_closes_stream() {
    let (mut engine, installed) = failing_engine(false);

    assert_eq!(
        engine.start(),
        Err(EngineError::Transport(TransportError::Start("device vanished".to_string())))
    );
    assert!(installed.lock().unwrap().is_none());
    assert!(!engine.is_running());
}

#[test]
fn double_shutdown_reports_error() {
    let (mut engine, clock) = offline_engine(1);
    engine.start().unwrap();

    assert!(engine.shutdown().is_ok());
    assert!(!clock.is_open());
    assert_eq!(
        engine.shutdown(),
        Err(EngineError::Transport(TransportError::NotOpen))
    );
}
