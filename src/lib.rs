//! Loopscribe - loopback capture with voice-activity segmentation
//!
//! Records the machine's audio output, cuts the stream into
//! silence-delimited utterances and writes each one as a WAV file for an
//! external speech-to-text process to pick up.

pub mod audio;
pub mod config;
pub mod paths;
pub mod recorder;
pub mod session;
pub mod sink;
pub mod watcher;
