//! Segment persistence
//!
//! Finished segments leave the engine through the [`SegmentSink`] trait.
//! The production implementation writes standard 16-bit PCM WAV files via
//! hound, under a temporary name that is renamed into place on close so a
//! directory watcher can never pick up a half-written file.

use crate::audio::AudioFormat;
use std::path::Path;

/// Errors from persisting a segment
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("could not finalise audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists a finished, normalised segment under a final path
pub trait SegmentSink: Send + Sync {
    fn write(&self, path: &Path, format: &AudioFormat, pcm: &[i16]) -> Result<(), SinkError>;
}

/// WAV file sink (write-then-rename)
pub struct WavSink;

impl SegmentSink for WavSink {
    fn write(&self, path: &Path, format: &AudioFormat, pcm: &[i16]) -> Result<(), SinkError> {
        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        // Files only become visible under their final name once complete.
        let staging = path.with_extension("wav.part");
        let result = write_wav(&staging, spec, pcm);
        if result.is_err() {
            let _ = std::fs::remove_file(&staging);
            return result;
        }
        std::fs::rename(&staging, path)?;

        tracing::info!(
            "wrote {} ({} KiB)",
            path.display(),
            pcm.len() * 2 / 1024
        );
        Ok(())
    }
}

fn write_wav(path: &Path, spec: hound::WavSpec, pcm: &[i16]) -> Result<(), SinkError> {
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in pcm {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
