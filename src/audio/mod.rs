//! Audio subsystem for Loopscribe
//!
//! Capture-device selection, the loopback sample source, frame
//! normalisation, voice activity detection, segment assembly and
//! per-segment gain normalisation.

pub mod device;
pub mod frame;
pub mod gain;
pub mod ring_buffer;
pub mod segmenter;
pub mod source;
pub mod vad;

pub use frame::FrameNormalizer;
pub use gain::{GainConfig, GainNormalizer};
pub use ring_buffer::AudioRingBuffer;
pub use segmenter::{
    BoundaryPolicy, FinishedSegment, FlushReason, SegmentAssembler, SegmenterConfig,
};
pub use source::{CpalSource, SampleSource, SourceError};
pub use vad::{EnergyVad, FrameClass, VadConfig};

use serde::{Deserialize, Serialize};

/// PCM format of a capture session
///
/// Derived once from the sample source when a session starts and immutable
/// for its duration. Output is always signed 16-bit PCM regardless of the
/// source's native representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample in the canonical representation (always 16)
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Canonical 16-bit PCM format at the given rate and channel count.
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
        }
    }

    /// Interleaved samples per second across all channels.
    pub fn samples_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }

    /// Interleaved sample count covering `ms` milliseconds.
    ///
    /// Always a whole number of channel frames, so slicing at this length
    /// never splits a frame.
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        let frames = (self.sample_rate as u64 * ms as u64 / 1000) as usize;
        frames * self.channels as usize
    }

    /// Interleaved sample count covering `secs` seconds.
    pub fn samples_for_secs(&self, secs: f32) -> usize {
        let frames = (self.sample_rate as f32 * secs) as usize;
        frames * self.channels as usize
    }

    /// Duration in seconds of `samples` interleaved samples.
    pub fn duration_secs(&self, samples: usize) -> f32 {
        samples as f32 / self.samples_per_second() as f32
    }
}
