//! Application data directories
//!
//! All persistent data lives under a single base directory
//! (default `~/.loopscribe`): captured audio segments, transcripts
//! produced by the external transcriber, and speech models.

use std::io;
use std::path::{Path, PathBuf};

/// Resolved data directory layout
#[derive(Debug, Clone)]
pub struct AppDirs {
    /// Base directory (default `~/.loopscribe`)
    pub root: PathBuf,
    /// Segmented audio output, watched by the transcription launcher
    pub audio: PathBuf,
    /// Transcript output of the external transcriber
    pub transcripts: PathBuf,
    /// Speech model storage for the external transcriber
    pub models: PathBuf,
}

impl AppDirs {
    /// Resolve the directory layout, honouring an explicit base override.
    pub fn resolve(base: Option<&Path>) -> Self {
        let root = match base {
            Some(p) => p.to_path_buf(),
            None => default_root(),
        };
        Self {
            audio: root.join("audio"),
            transcripts: root.join("transcripts"),
            models: root.join("models"),
            root,
        }
    }

    /// Create any missing directories.
    pub fn bootstrap(&self) -> io::Result<()> {
        for dir in [&self.root, &self.audio, &self.transcripts, &self.models] {
            if !dir.is_dir() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Path of the JSON config file.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }
}

fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".loopscribe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_with_override() {
        let dirs = AppDirs::resolve(Some(Path::new("/tmp/ls-test")));
        assert_eq!(dirs.root, Path::new("/tmp/ls-test"));
        assert_eq!(dirs.audio, Path::new("/tmp/ls-test/audio"));
        assert_eq!(dirs.config_file(), Path::new("/tmp/ls-test/config.json"));
    }

    #[test]
    fn test_bootstrap_creates_subdirs() {
        let tmp = tempdir().unwrap();
        let base = tmp.path().join("data");
        let dirs = AppDirs::resolve(Some(&base));
        dirs.bootstrap().unwrap();

        assert!(dirs.audio.is_dir());
        assert!(dirs.transcripts.is_dir());
        assert!(dirs.models.is_dir());

        // Second bootstrap is a no-op
        dirs.bootstrap().unwrap();
    }
}
