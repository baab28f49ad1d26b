//! Real-time audio playback using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Host, SampleFormat, SampleRate, Stream, StreamConfig};

use super::transport::{RenderCallback, StreamSettings, Transport, TransportError};

/// Transport backed by the platform's default cpal host.
///
/// The engine renders mono frames; each frame is copied to every channel of
/// the device's native layout.
pub struct CpalTransport {
    host: Host,
    stream: Option<Stream>,
}

impl CpalTransport {
    /// Create a transport on the platform's default host
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::debug!(host = host.id().name(), "cpal host selected");
        Self { host, stream: None }
    }

    /// Find an output device whose name contains `name`, or the default
    fn find_device(&self, name: Option<&str>) -> Result<Device, TransportError> {
        let Some(search) = name else {
            return self
                .host
                .default_output_device()
                .ok_or(TransportError::NoDevice);
        };

        let search = search.to_lowercase();
        let devices = self
            .host
            .output_devices()
            .map_err(|e| TransportError::Open(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name.to_lowercase().contains(&search) {
                    return Ok(device);
                }
            }
        }
        Err(TransportError::DeviceNotFound(search))
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        frames: usize,
        mut render: RenderCallback,
    ) -> Result<Stream, TransportError> {
        let channels = config.channels as usize;
        // Allocated here so the callback never allocates
        let mut mono = vec![0.0f32; frames.max(1)];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    fill_interleaved(data, channels, &mut mono, &mut render);
                },
                |err| {
                    tracing::error!(%err, "audio stream error");
                },
                None,
            )
            .map_err(|e| TransportError::Open(e.to_string()))
    }
}

/// Render mono frames in blocks of at most `mono.len()` and copy each one to
/// every channel of `data`. Trailing samples that do not make up a whole
/// frame are written as silence.
fn fill_interleaved<T, F>(data: &mut [T], channels: usize, mono: &mut [f32], render: &mut F)
where
    T: cpal::Sample + cpal::FromSample<f32>,
    F: FnMut(&mut [f32]) + ?Sized,
{
    let channels = channels.max(1);
    let frames = data.len() / channels;
    let (whole, partial) = data.split_at_mut(frames * channels);

    for block in whole.chunks_mut(channels * mono.len()) {
        let mono = &mut mono[..block.len() / channels];
        render(mono);

        for (frame, &sample) in block.chunks_mut(channels).zip(mono.iter()) {
            for channel_sample in frame.iter_mut() {
                *channel_sample = T::from_sample(sample);
            }
        }
    }

    for sample in partial.iter_mut() {
        *sample = T::from_sample(0.0f32);
    }
}

impl Default for CpalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for CpalTransport {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&mut self, settings: &StreamSettings, render: RenderCallback) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyOpen);
        }

        let device = self.find_device(settings.device.as_deref())?;
        let supported = device
            .default_output_config()
            .map_err(|e| TransportError::Open(e.to_string()))?;
        let sample_format = supported.sample_format();

        let mut config: StreamConfig = supported.into();
        config.sample_rate = SampleRate(settings.sample_rate);
        config.buffer_size = BufferSize::Fixed(settings.buffer_size);

        let frames = settings.buffer_size as usize;
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, frames, render)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, frames, render)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, frames, render)?,
            other => return Err(TransportError::UnsupportedFormat(other.to_string())),
        };

        // Some hosts start streams as soon as they are built
        if let Err(err) = stream.pause() {
            tracing::debug!(%err, "stream could not be paused after open");
        }

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            channels = config.channels,
            format = %sample_format,
            "cpal stream built"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        let stream = self.stream.as_ref().ok_or(TransportError::NotOpen)?;
        stream.play().map_err(|e| TransportError::Start(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        let stream = self.stream.as_ref().ok_or(TransportError::NotOpen)?;
        stream.pause().map_err(|e| TransportError::Stop(e.to_string()))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the stream tears down the callback thread
        self.stream.take().map(drop).ok_or(TransportError::NotOpen)
    }
}

/// An output device and its default configuration
#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub is_default: bool,
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<OutputDevice> {
    let host = cpal::default_host();
    let default_name = default_device_name();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push(OutputDevice {
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    devices
}
