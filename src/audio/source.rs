//! Sample sources
//!
//! The segmentation engine consumes audio through the [`SampleSource`]
//! capability trait so platform backends can be swapped without touching the
//! engine. The production implementation, [`CpalSource`], opens a cpal
//! stream whose callback feeds a lock-free ring buffer; [`SampleSource::poll`]
//! drains that buffer without ever blocking on the device.

use super::device::{self, CaptureEndpoint};
use super::ring_buffer::AudioRingBuffer;
use super::AudioFormat;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors surfaced by a sample source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No capture endpoint could be selected at all
    #[error("no usable capture device available")]
    DeviceUnavailable,

    /// The endpoint exists but exposes a sample format the frame
    /// normaliser does not accept
    #[error("capture device uses unsupported sample format {0:?}")]
    UnsupportedFormat(SampleFormat),

    /// Building the capture stream failed
    #[error("failed to build capture stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// Starting the capture stream failed
    #[error("failed to start capture stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The stream reported a mid-session error; the session should be
    /// flushed and ended as if stopped
    #[error("capture stream was interrupted")]
    StreamInterrupted,
}

/// A non-blocking producer of interleaved 32-bit float sample batches
///
/// Dropping a source releases the underlying device.
pub trait SampleSource {
    /// Negotiated capture format (canonical 16-bit output shape).
    fn format(&self) -> AudioFormat;

    /// Append any captured samples to `out` and return how many were added.
    ///
    /// Never blocks; an empty poll simply returns 0. Returns
    /// [`SourceError::StreamInterrupted`] once the underlying stream has
    /// died, after which the caller should flush and end the session.
    fn poll(&mut self, out: &mut Vec<f32>) -> Result<usize, SourceError>;
}

/// cpal-backed sample source (loopback where the host supports it)
pub struct CpalSource {
    // Held to keep the capture stream alive; dropping stops capture.
    _stream: cpal::Stream,
    format: AudioFormat,
    ring: Arc<AudioRingBuffer>,
    interrupted: Arc<AtomicBool>,
    scratch: Vec<f32>,
}

impl CpalSource {
    /// Open the configured capture endpoint and start streaming into the
    /// ring buffer.
    pub fn open(device_id: Option<&str>, prefer_loopback: bool) -> Result<Self, SourceError> {
        let CaptureEndpoint {
            device,
            config,
            loopback,
        } = device::capture_endpoint(device_id, prefer_loopback)
            .ok_or(SourceError::DeviceUnavailable)?;

        // The shared-mode mix format is 32-bit float on every host we
        // target; anything else is refused rather than silently garbled.
        if config.sample_format() != SampleFormat::F32 {
            return Err(SourceError::UnsupportedFormat(config.sample_format()));
        }

        let format = AudioFormat::pcm16(config.sample_rate(), config.channels());
        let ring = Arc::new(AudioRingBuffer::with_capacity(
            format.samples_per_second() * 4,
        ));
        let interrupted = Arc::new(AtomicBool::new(false));

        let callback_ring = ring.clone();
        let error_flag = interrupted.clone();
        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Lock-free, allocation-free handoff to the capture thread
                let written = callback_ring.write(data);
                if written < data.len() {
                    tracing::warn!(
                        "capture buffer overflow: dropped {} samples",
                        data.len() - written
                    );
                }
            },
            move |err| {
                tracing::error!("capture stream error: {}", err);
                error_flag.store(true, Ordering::SeqCst);
            },
            None,
        )?;
        stream.play()?;

        tracing::info!(
            "capture stream running: {}Hz, {} channels, loopback={}",
            format.sample_rate,
            format.channels,
            loopback
        );

        Ok(Self {
            _stream: stream,
            format,
            ring,
            interrupted,
            scratch: vec![0.0; 4096],
        })
    }
}

impl SampleSource for CpalSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn poll(&mut self, out: &mut Vec<f32>) -> Result<usize, SourceError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(SourceError::StreamInterrupted);
        }

        let mut total = 0;
        loop {
            let read = self.ring.read(&mut self.scratch);
            if read == 0 {
                break;
            }
            out.extend_from_slice(&self.scratch[..read]);
            total += read;
        }
        Ok(total)
    }
}
