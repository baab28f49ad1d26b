//! Tonebank - Oscillator bank tone generator

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tonebank::config::{self, TonebankConfig, EXAMPLE_CONFIG};
use tonebank::engine::{
    list_output_devices, CpalTransport, NoteOutcome, OfflineTransport, Recorder, SynthEngine,
};
use tonebank::synth::frequency_of;
use tonebank::viz::{SampleBuffer, Surface};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

/// Samples kept for the scope display
const SCOPE_CAPACITY: usize = 4096;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = config::load_or_default(&config_path)?;
            let scope = Arc::new(Mutex::new(SampleBuffer::new(SCOPE_CAPACITY)));

            let mut engine = SynthEngine::from_config(&cfg, Box::new(CpalTransport::new()))
                .with_scope(Arc::clone(&scope));
            engine.start()?;

            let surface = Surface::new(engine.handle(), scope, &cfg.keyboard);
            let result = surface.run();

            engine.shutdown()?;
            result?;
        }

        Commands::Hold { config: config_path, notes } => {
            let cfg = config::load_or_default(&config_path)?;
            let mut engine = SynthEngine::from_config(&cfg, Box::new(CpalTransport::new()));

            sound_notes(&engine, &notes, cfg.keyboard.velocity)?;
            engine.start()?;

            let running = Arc::new(AtomicBool::new(true));
            let r = Arc::clone(&running);
            ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

            println!("Holding {} (Ctrl-C to stop)", notes.join(" "));
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }

            engine.shutdown()?;
            println!("Stopped.");
        }

        Commands::Record {
            config: config_path,
            output,
            duration,
            notes,
        } => {
            if !duration.is_finite() || duration <= 0.0 {
                bail!("Duration must be a positive number of seconds");
            }

            let cfg = config::load_or_default(&config_path)?;
            let sample_rate = cfg.audio.sample_rate;

            let (transport, clock) = OfflineTransport::new();
            let mut engine = SynthEngine::from_config(&cfg, Box::new(transport));
            sound_notes(&engine, &notes, cfg.keyboard.velocity)?;
            engine.start()?;

            println!("Recording {} seconds to {:?}...", duration, output);

            let mut recorder = Recorder::new(&output, sample_rate)?;
            let frames = (duration * sample_rate as f64).round() as u64;
            recorder.capture(&clock, frames)?;

            engine.shutdown()?;
            let recorded = recorder.duration_secs();
            recorder.finalize()?;
            println!("Recorded {:.2}s to {:?}", recorded, output);
        }

        Commands::Devices => {
            let devices = list_output_devices();
            if devices.is_empty() {
                println!("No output devices found.");
                return Ok(());
            }

            println!("Output devices:");
            for device in devices {
                println!(
                    "  {} {} ({} Hz, {} ch)",
                    if device.is_default { "*" } else { "-" },
                    device.name,
                    device.sample_rate,
                    device.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => print_summary(&cfg),
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Freq { notes } => {
            let mut failed = false;
            for name in &notes {
                match frequency_of(name) {
                    Ok(freq) => println!("{:<4} {:.2} Hz", name, freq),
                    Err(e) => {
                        println!("{:<4} error: {}", name, e);
                        failed = true;
                    }
                }
            }
            if failed {
                std::process::exit(1);
            }
        }

        Commands::Init => {
            let path = Path::new("tonebank.yaml");
            if path.exists() {
                println!("tonebank.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created tonebank.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Start each note, warning about any that find no free oscillator
fn sound_notes(engine: &SynthEngine, notes: &[String], volume: f64) -> Result<()> {
    for name in notes {
        match engine.note_on(name, volume)? {
            NoteOutcome::Started(_) | NoteOutcome::AlreadyHeld(_) => {}
            NoteOutcome::Dropped => {
                tracing::warn!(note = %name, "no free oscillator, note dropped");
                eprintln!("Warning: {} dropped, all {} oscillators busy", name, engine.oscillator_count());
            }
        }
    }
    Ok(())
}

fn print_summary(cfg: &TonebankConfig) {
    println!("Configuration is valid!");
    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
    println!("  Buffer size: {}", cfg.audio.buffer_size);
    println!(
        "  Device: {}",
        cfg.audio.device.as_deref().unwrap_or("(default)")
    );
    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
    println!("  Oscillators: {}", cfg.oscillators.len());
    for (index, osc) in cfg.oscillators.iter().enumerate() {
        println!(
            "    {}. {} {:.2} Hz, volume {:.0}%",
            index + 1,
            osc.waveform,
            osc.frequency,
            osc.volume * 100.0
        );
    }
    println!(
        "  Keyboard: base octave {}, velocity {:.2}",
        cfg.keyboard.base_octave, cfg.keyboard.velocity
    );
}
