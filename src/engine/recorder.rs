//! WAV file recorder
//!
//! Renders engine output to mono 32-bit float WAV files by pumping an
//! [`OfflineClock`].

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::transport::OfflineClock;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    frames_written: u64,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            frames_written: 0,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of frames written
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames_written as f64 / self.sample_rate as f64
    }

    /// Write a buffer of mono frames
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;
        }
        self.frames_written += buffer.len() as u64;
        Ok(())
    }

    /// Pump `frames` frames out of a running offline stream, one transport
    /// buffer at a time.
    pub fn capture(&mut self, clock: &OfflineClock, frames: u64) -> Result<()> {
        let block = clock.buffer_size().max(1);
        let mut buffer = vec![0.0f32; block];
        let mut remaining = frames;

        while remaining > 0 {
            let len = remaining.min(block as u64) as usize;
            if !clock.pump(&mut buffer[..len]) {
                bail!("offline stream is not running");
            }
            self.write_buffer(&buffer[..len])?;
            remaining -= len as u64;
        }
        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("failed to finalize WAV file")
    }
}
