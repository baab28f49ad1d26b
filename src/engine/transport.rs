//! Audio transport boundary
//!
//! A [`Transport`] owns the device, the buffering and the callback thread.
//! The engine hands it a [`RenderCallback`] on `open` and afterwards only
//! starts, stops and closes the stream. Buffers handed to the callback are
//! mono: one `f32` per frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Fill routine invoked by the transport on its real-time thread
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Errors raised by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to open audio stream: {0}")]
    Open(String),

    #[error("failed to start audio stream: {0}")]
    Start(String),

    #[error("failed to stop audio stream: {0}")]
    Stop(String),

    #[error("audio stream is already open")]
    AlreadyOpen,

    #[error("audio stream is not open")]
    NotOpen,
}

/// Stream parameters requested from a transport
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frames per callback
    pub buffer_size: u32,
    /// Output device name filter (None = default device)
    pub device: Option<String>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 64,
            device: None,
        }
    }
}

/// Trait for audio transports
pub trait Transport {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Open a stream that will call `render` once started.
    ///
    /// On failure no callback may remain installed.
    fn open(&mut self, settings: &StreamSettings, render: RenderCallback) -> Result<(), TransportError>;

    /// Begin invoking the render callback
    fn start(&mut self) -> Result<(), TransportError>;

    /// Pause the stream; it can be started again
    fn stop(&mut self) -> Result<(), TransportError>;

    /// Tear the stream down. Closing a stream that is not open is an error.
    fn close(&mut self) -> Result<(), TransportError>;
}

struct OfflineStream {
    render: Option<RenderCallback>,
    running: bool,
    buffer_size: usize,
}

fn lock_stream(inner: &Mutex<OfflineStream>) -> MutexGuard<'_, OfflineStream> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport without a device: the render callback runs when an
/// [`OfflineClock`] pumps it.
///
/// Used to render to files and to drive the engine deterministically in tests.
pub struct OfflineTransport {
    inner: Arc<Mutex<OfflineStream>>,
}

/// Drives an [`OfflineTransport`] from the caller's thread
#[derive(Clone)]
pub struct OfflineClock {
    inner: Arc<Mutex<OfflineStream>>,
}

impl OfflineTransport {
    /// Create a transport and the clock that drives it
    pub fn new() -> (Self, OfflineClock) {
        let inner = Arc::new(Mutex::new(OfflineStream {
            render: None,
            running: false,
            buffer_size: 0,
        }));
        let clock = OfflineClock {
            inner: Arc::clone(&inner),
        };
        (Self { inner }, clock)
    }
}

impl Transport for OfflineTransport {
    fn name(&self) -> &str {
        "offline"
    }

    fn open(&mut self, settings: &StreamSettings, render: RenderCallback) -> Result<(), TransportError> {
        let mut stream = lock_stream(&self.inner);
        if stream.render.is_some() {
            return Err(TransportError::AlreadyOpen);
        }
        stream.render = Some(render);
        stream.running = false;
        stream.buffer_size = settings.buffer_size as usize;
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        let mut stream = lock_stream(&self.inner);
        if stream.render.is_none() {
            return Err(TransportError::NotOpen);
        }
        stream.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        let mut stream = lock_stream(&self.inner);
        if stream.render.is_none() {
            return Err(TransportError::NotOpen);
        }
        stream.running = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut stream = lock_stream(&self.inner);
        stream.render.take().ok_or(TransportError::NotOpen)?;
        stream.running = false;
        Ok(())
    }
}

impl OfflineClock {
    /// Invoke the render callback on `out`.
    ///
    /// Returns false and writes silence when the stream is not running.
    pub fn pump(&self, out: &mut [f32]) -> bool {
        let mut stream = lock_stream(&self.inner);
        let running = stream.running;
        match stream.render.as_mut() {
            Some(render) if running => {
                render(out);
                true
            }
            _ => {
                out.fill(0.0);
                false
            }
        }
    }

    /// Frames per callback requested on open (0 before the first open)
    pub fn buffer_size(&self) -> usize {
        lock_stream(&self.inner).buffer_size
    }

    pub fn is_open(&self) -> bool {
        lock_stream(&self.inner).render.is_some()
    }

    pub fn is_running(&self) -> bool {
        lock_stream(&self.inner).running
    }
}
