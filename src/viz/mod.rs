//! Terminal control surface for tonebank
//!
//! Provides a TUI showing:
//! - The oscillator bank and which notes it is sounding
//! - A scope of the most recent output
//! - Keyboard bindings for notes and oscillator controls

mod scope;

pub use scope::Scope;

use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::sync::{Arc, Mutex};

use crate::config::KeyboardConfig;
use crate::engine::{NoteOutcome, SynthHandle};
use crate::synth::{Note, Oscillator};

/// Keys that play notes, lowest first: one octave of C plus the next C
const NOTE_KEYS: [char; 13] = ['a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j', 'k'];

const VOLUME_STEP: f64 = 0.05;
/// Frequency ratio of one equal-tempered semitone
const SEMITONE: f64 = 1.059_463_094_359_295;
const MAX_BASE_OCTAVE: u8 = 8;

/// Buffer for storing recent audio samples for visualization
pub struct SampleBuffer {
    samples: Vec<f32>,
    capacity: usize,
    write_pos: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: vec![0.0; capacity],
            capacity,
            write_pos: 0,
        }
    }

    /// Push a new sample into the buffer
    pub fn push(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Push a block of samples. Does not allocate.
    pub fn extend(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push(sample);
        }
    }

    /// Get all samples in order (oldest to newest)
    pub fn get_samples(&self) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.capacity);
        result.extend_from_slice(&self.samples[self.write_pos..]);
        result.extend_from_slice(&self.samples[..self.write_pos]);
        result
    }

    /// Get the most recent N samples
    pub fn get_recent(&self, count: usize) -> Vec<f32> {
        let count = count.min(self.capacity);
        let samples = self.get_samples();
        samples[self.capacity - count..].to_vec()
    }
}

/// Interactive keyboard over a running engine
pub struct Surface {
    synth: SynthHandle,
    scope: Arc<Mutex<SampleBuffer>>,
    selected: usize,
    base_octave: u8,
    velocity: f64,
    running: bool,
    status: String,
}

impl Surface {
    pub fn new(synth: SynthHandle, scope: Arc<Mutex<SampleBuffer>>, keyboard: &KeyboardConfig) -> Self {
        Self {
            synth,
            scope,
            selected: 0,
            base_octave: keyboard.base_octave.min(MAX_BASE_OCTAVE),
            velocity: keyboard.velocity,
            running: true,
            status: String::from("ready"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Note bound to a key at the current base octave
    pub fn note_for_key(&self, key: char) -> Option<Note> {
        let step = NOTE_KEYS.iter().position(|&k| k == key)?;
        Note::offset_from_c(self.base_octave, step as u8)
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => {
                self.running = false;
            }
            (KeyCode::Char(' '), _) => {
                let released = self.synth.release_all();
                self.status = format!("released {} notes", released);
            }
            (KeyCode::Char('z'), _) => {
                self.base_octave = self.base_octave.saturating_sub(1);
                self.status = format!("octave {}", self.base_octave);
            }
            (KeyCode::Char('x'), _) => {
                self.base_octave = (self.base_octave + 1).min(MAX_BASE_OCTAVE);
                self.status = format!("octave {}", self.base_octave);
            }
            (KeyCode::Char('-'), _) => {
                self.synth.adjust_master_volume(-VOLUME_STEP);
            }
            (KeyCode::Char('='), _) => {
                self.synth.adjust_master_volume(VOLUME_STEP);
            }
            (KeyCode::Tab, _) => {
                self.selected = (self.selected + 1) % self.synth.oscillator_count().max(1);
            }
            (KeyCode::Char('v'), _) => {
                self.adjust_selected(|osc| osc.set_waveform(osc.waveform().next()))
            }
            (KeyCode::Up, _) => self.adjust_selected(|osc| osc.set_volume(osc.volume() + VOLUME_STEP)),
            (KeyCode::Down, _) => self.adjust_selected(|osc| osc.set_volume(osc.volume() - VOLUME_STEP)),
            (KeyCode::Right, _) => {
                self.adjust_selected(|osc| osc.set_frequency(osc.frequency() * SEMITONE))
            }
            (KeyCode::Left, _) => {
                self.adjust_selected(|osc| osc.set_frequency(osc.frequency() / SEMITONE))
            }
            (KeyCode::Char(c), _) => {
                if let Some(note) = self.note_for_key(c) {
                    self.toggle(note);
                }
            }
            _ => {}
        }
    }

    fn toggle(&mut self, note: Note) {
        if self.synth.release(note) {
            self.status = format!("{} off", note);
            return;
        }

        self.status = match self.synth.trigger(note, self.velocity) {
            NoteOutcome::Started(index) => format!("{} on (osc {})", note, index + 1),
            NoteOutcome::AlreadyHeld(index) => format!("{} held (osc {})", note, index + 1),
            NoteOutcome::Dropped => format!("{} dropped: all oscillators busy", note),
        };
    }

    /// Step the selected oscillator. Read and write happen under one lock.
    fn adjust_selected<F: FnOnce(&mut Oscillator)>(&mut self, step: F) {
        if let Err(err) = self.synth.update_oscillator(self.selected, step) {
            self.status = err.to_string();
        }
    }

    /// Run the control surface until the user quits
    pub fn run(mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Cleanup
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while self.running {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(30))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn draw(&self, f: &mut Frame) {
        let rows = self.synth.oscillator_count() as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(rows), // Bank
                Constraint::Min(5),       // Scope
                Constraint::Length(4),    // Status
            ])
            .split(f.area());

        self.draw_bank(f, chunks[0]);
        self.draw_scope(f, chunks[1]);
        self.draw_status(f, chunks[2]);
    }

    fn draw_bank(&self, f: &mut Frame, area: Rect) {
        let notes = self.synth.active_notes();
        let mut lines = Vec::with_capacity(self.synth.oscillator_count());

        for index in 0..self.synth.oscillator_count() {
            let Ok(osc) = self.synth.oscillator(index) else {
                continue;
            };
            let note = notes
                .iter()
                .find(|(_, i)| *i == index)
                .map(|(note, _)| note.to_string())
                .unwrap_or_else(|| String::from("-"));

            let marker = if index == self.selected { ">" } else { " " };
            let style = if osc.is_active() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            lines.push(Line::from(vec![
                Span::raw(format!("{} {} ", marker, index + 1)),
                Span::styled(
                    format!(
                        "{:<9} {:>9.2} Hz  vol {:.2}  note {:<4}",
                        osc.waveform().to_string(),
                        osc.frequency(),
                        osc.volume(),
                        note
                    ),
                    style,
                ),
            ]));
        }

        let title = format!(
            " Oscillators  master {:.2}  octave {} ",
            self.synth.master_volume(),
            self.base_octave
        );
        let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(paragraph, area);
    }

    fn draw_scope(&self, f: &mut Frame, area: Rect) {
        let samples = match self.scope.lock() {
            Ok(buffer) => buffer.get_recent(area.width as usize * 2),
            Err(_) => Vec::new(),
        };

        let scope = Scope::new(&samples)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().borders(Borders::ALL).title(" Output "));

        f.render_widget(scope, area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let text = vec![
            Line::from(vec![Span::raw("  "), Span::styled(self.status.clone(), Style::default().fg(Color::Yellow))]),
            Line::from(Span::raw(
                "  a-k: notes  z/x: octave  tab: select  v: wave  up/down: vol  left/right: pitch  -/=: master  space: release  q: quit",
            )),
        ];

        let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}
