//! Shared synthesis state and the control handle that guards it
//!
//! Every mutable field the audio thread reads (oscillators, master volume,
//! the note table) lives in one [`SynthState`] behind one mutex. Control calls
//! hold the lock for their whole duration and [`SynthHandle::render`] holds it
//! for a whole buffer, so the two domains never observe a half-applied change.
//! Nothing allocates while the lock is held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::{EngineError, Result};
use crate::synth::{Note, Oscillator, Waveform};

/// What a note-on did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    /// The note now sounds on this oscillator
    Started(usize),
    /// The note was already sounding on this oscillator; nothing changed
    AlreadyHeld(usize),
    /// Every oscillator was busy; the note was dropped
    Dropped,
}

pub(crate) struct SynthState {
    oscillators: Vec<Oscillator>,
    master_volume: f64,
    /// Slot `i` holds the note sounding on oscillator `i`
    voices: Vec<Option<Note>>,
}

impl SynthState {
    fn new(oscillators: Vec<Oscillator>) -> Self {
        let voices = vec![None; oscillators.len()];
        Self {
            oscillators,
            master_volume: 1.0,
            voices,
        }
    }

    fn oscillator_mut(&mut self, index: usize) -> Result<&mut Oscillator> {
        let count = self.oscillators.len();
        self.oscillators
            .get_mut(index)
            .ok_or(EngineError::OscillatorOutOfRange { index, count })
    }

    fn voice_of(&self, note: Note) -> Option<usize> {
        self.voices.iter().position(|v| *v == Some(note))
    }

    fn trigger(&mut self, note: Note, frequency: f64, volume: f64) -> NoteOutcome {
        if let Some(index) = self.voice_of(note) {
            return NoteOutcome::AlreadyHeld(index);
        }

        let Some(index) = self.oscillators.iter().position(|osc| !osc.is_active()) else {
            return NoteOutcome::Dropped;
        };

        let osc = &mut self.oscillators[index];
        osc.set_frequency(frequency);
        osc.set_volume(volume);
        osc.set_active(true);
        self.voices[index] = Some(note);

        NoteOutcome::Started(index)
    }

    fn release(&mut self, note: Note) -> Option<usize> {
        let index = self.voice_of(note)?;

        // Hard cut: no fade out
        let osc = &mut self.oscillators[index];
        osc.set_volume(0.0);
        osc.set_active(false);
        self.voices[index] = None;

        Some(index)
    }

    fn render(&mut self, out: &mut [f32]) {
        let master = self.master_volume;
        for frame in out.iter_mut() {
            let sum: f64 = self
                .oscillators
                .iter_mut()
                .map(Oscillator::produce_sample)
                .sum();
            *frame = (sum * master) as f32;
        }
    }
}

/// Cloneable, thread-safe access to the synthesis state.
///
/// Any number of control threads may hold a handle; the transport's render
/// callback holds one too.
#[derive(Clone)]
pub struct SynthHandle {
    state: Arc<Mutex<SynthState>>,
    oscillator_count: usize,
}

impl SynthHandle {
    /// Create a handle owning the given oscillators. Master volume starts at 1.0.
    pub fn new(oscillators: Vec<Oscillator>) -> Self {
        let oscillator_count = oscillators.len();
        Self {
            state: Arc::new(Mutex::new(SynthState::new(oscillators))),
            oscillator_count,
        }
    }

    // The state is plain numbers that are consistent between field writes,
    // so a panic elsewhere never leaves it unusable.
    fn lock(&self) -> MutexGuard<'_, SynthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of oscillators (fixed for the handle's lifetime)
    pub fn oscillator_count(&self) -> usize {
        self.oscillator_count
    }

    /// Set the master volume, clamped to `[0, 1]`
    pub fn set_master_volume(&self, volume: f64) {
        self.lock().master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f64 {
        self.lock().master_volume
    }

    /// Add `delta` to the master volume under one lock, clamped to `[0, 1]`.
    /// Returns the new value.
    pub fn adjust_master_volume(&self, delta: f64) -> f64 {
        let mut state = self.lock();
        state.master_volume = (state.master_volume + delta).clamp(0.0, 1.0);
        state.master_volume
    }

    pub fn set_oscillator_frequency(&self, index: usize, frequency: f64) -> Result<()> {
        self.lock().oscillator_mut(index)?.set_frequency(frequency);
        Ok(())
    }

    /// Set an oscillator's volume, clamped to `[0, 1]`
    pub fn set_oscillator_volume(&self, index: usize, volume: f64) -> Result<()> {
        self.lock().oscillator_mut(index)?.set_volume(volume);
        Ok(())
    }

    pub fn set_oscillator_waveform(&self, index: usize, waveform: Waveform) -> Result<()> {
        self.lock().oscillator_mut(index)?.set_waveform(waveform);
        Ok(())
    }

    /// Read-modify-write one oscillator under a single lock.
    ///
    /// `update` runs while the audio thread is locked out; it must not block.
    pub fn update_oscillator<F>(&self, index: usize, update: F) -> Result<()>
    where
        F: FnOnce(&mut Oscillator),
    {
        update(self.lock().oscillator_mut(index)?);
        Ok(())
    }

    pub fn waveform(&self, index: usize) -> Result<Waveform> {
        Ok(self.oscillator(index)?.waveform())
    }

    /// Copy of an oscillator's current state
    pub fn oscillator(&self, index: usize) -> Result<Oscillator> {
        self.lock().oscillator_mut(index).map(|osc| osc.clone())
    }

    /// Start a note by name, e.g. `"C#4"`
    pub fn note_on(&self, name: &str, volume: f64) -> Result<NoteOutcome> {
        let note: Note = name.parse()?;
        Ok(self.trigger(note, volume))
    }

    /// Stop a note by name. Unknown or unparseable names are ignored.
    ///
    /// Returns whether a sounding note was released.
    pub fn note_off(&self, name: &str) -> bool {
        match name.parse::<Note>() {
            Ok(note) => self.release(note),
            Err(err) => {
                tracing::debug!(note = name, %err, "ignoring note-off for invalid note");
                false
            }
        }
    }

    /// Start a parsed note on the first inactive oscillator
    pub fn trigger(&self, note: Note, volume: f64) -> NoteOutcome {
        let frequency = note.frequency();
        let outcome = self.lock().trigger(note, frequency, volume);

        match outcome {
            NoteOutcome::Started(index) => {
                tracing::debug!(%note, oscillator = index, frequency, "note on")
            }
            NoteOutcome::AlreadyHeld(_) => tracing::debug!(%note, "note already held"),
            NoteOutcome::Dropped => tracing::debug!(%note, "no free oscillator, note dropped"),
        }
        outcome
    }

    /// Stop a parsed note. Returns false if it was not sounding.
    pub fn release(&self, note: Note) -> bool {
        let released = self.lock().release(note);
        if let Some(index) = released {
            tracing::debug!(%note, oscillator = index, "note off");
        }
        released.is_some()
    }

    /// Release every sounding note, returning how many were released
    pub fn release_all(&self) -> usize {
        let mut state = self.lock();
        let mut released = 0;
        for index in 0..state.voices.len() {
            if let Some(note) = state.voices[index] {
                state.release(note);
                released += 1;
            }
        }
        released
    }

    pub fn is_held(&self, note: Note) -> bool {
        self.lock().voice_of(note).is_some()
    }

    /// Sounding notes with their oscillator index, in oscillator order
    pub fn active_notes(&self) -> Vec<(Note, usize)> {
        let mut notes = Vec::with_capacity(self.oscillator_count);
        let state = self.lock();
        notes.extend(
            state
                .voices
                .iter()
                .enumerate()
                .filter_map(|(index, voice)| voice.map(|note| (note, index))),
        );
        notes
    }

    /// Fill `out` with mixed mono frames. This is the real-time path.
    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }
}
