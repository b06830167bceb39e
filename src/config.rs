//! Configuration management
//!
//! Persistent settings stored as JSON in `<data-dir>/config.json`. Every
//! section tolerates missing fields via `#[serde(default)]` so configs
//! written by older versions keep loading.

use crate::audio::{GainConfig, SegmenterConfig, VadConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current config schema version
const CURRENT_VERSION: u32 = 1;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    /// Capture device and static gain settings
    pub audio: AudioConfig,
    /// Voice activity detection thresholds
    pub vad: VadConfig,
    /// Segment boundary policy
    pub segmenter: SegmenterConfig,
    /// Per-segment gain normalisation
    pub gain: GainConfig,
    /// External transcriber invocation
    pub transcriber: TranscriberConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            audio: AudioConfig::default(),
            vad: VadConfig::default(),
            segmenter: SegmenterConfig::default(),
            gain: GainConfig::default(),
            transcriber: TranscriberConfig::default(),
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device ID (None for the default loopback endpoint)
    pub device_id: Option<String>,
    /// Static gain applied during frame normalisation (1.0 = unity)
    pub capture_gain: f32,
    /// Prefer the default output endpoint (loopback) over the default
    /// input device
    pub prefer_loopback: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            capture_gain: 1.0,
            prefer_loopback: true,
        }
    }
}

/// External transcriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Whether the directory watcher launches the transcriber at all
    pub enabled: bool,
    /// Transcriber executable (resolved via PATH when not absolute)
    pub command: String,
    /// Model file, resolved against the models directory when relative
    pub model: String,
    /// How often the watcher scans the audio directory
    pub poll_interval_ms: u64,
    /// Delay between discovering a file and transcribing it
    pub settle_ms: u64,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "whisper-cli".to_string(),
            model: "ggml-medium.bin".to_string(),
            poll_interval_ms: 500,
            settle_ms: 100,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it is missing
    /// or unreadable. A malformed file is logged and replaced by defaults
    /// rather than aborting startup.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(mut config) => {
                    if config.version < CURRENT_VERSION {
                        tracing::info!(
                            "migrating config from version {} to {}",
                            config.version,
                            CURRENT_VERSION
                        );
                        config.version = CURRENT_VERSION;
                    }
                    config
                }
                Err(e) => {
                    tracing::warn!("config file is malformed ({}), using defaults", e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("could not write config to {}", path.display()))?;
        Ok(())
    }
}
