//! Transcription launcher
//!
//! Watches the segmented-audio directory and hands every new WAV file to an
//! external speech-to-text binary. Relies on the sink's write-then-rename
//! contract: anything visible under a final `.wav` name is complete.

use crate::config::TranscriberConfig;
use crate::paths::AppDirs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Directory-watching transcription launcher
pub struct TranscriptionWatcher {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TranscriptionWatcher {
    /// Spawn the monitor thread.
    pub fn start(config: TranscriberConfig, dirs: &AppDirs) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let audio_dir = dirs.audio.clone();
        let transcript_dir = dirs.transcripts.clone();
        let model = resolve_model(&config.model, &dirs.models);

        let thread = std::thread::Builder::new()
            .name("transcribe-watch".to_string())
            .spawn(move || monitor_loop(config, model, audio_dir, transcript_dir, flag))
            .ok();
        if thread.is_some() {
            tracing::info!("transcription monitoring started");
        } else {
            tracing::error!("could not spawn transcription monitor thread");
        }

        Self { running, thread }
    }

    /// Signal the monitor thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            tracing::info!("transcription monitoring stopped");
        }
    }
}

fn resolve_model(model: &str, models_dir: &Path) -> PathBuf {
    let path = Path::new(model);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        models_dir.join(model)
    }
}

fn monitor_loop(
    config: TranscriberConfig,
    model: PathBuf,
    audio_dir: PathBuf,
    transcript_dir: PathBuf,
    running: Arc<AtomicBool>,
) {
    let poll = Duration::from_millis(config.poll_interval_ms.max(50));
    let settle = Duration::from_millis(config.settle_ms);
    let mut processed: HashSet<PathBuf> = HashSet::new();

    while running.load(Ordering::SeqCst) {
        match std::fs::read_dir(&audio_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !is_candidate(&path) || processed.contains(&path) {
                        continue;
                    }
                    // Give the producer a moment in case the file was
                    // renamed into place this very instant.
                    std::thread::sleep(settle);
                    transcribe_file(&config, &model, &path, &transcript_dir);
                    // Failed invocations are not retried; the file would
                    // fail the same way every tick.
                    processed.insert(path);
                }
            }
            Err(e) => {
                tracing::warn!("could not scan {}: {}", audio_dir.display(), e);
            }
        }
        std::thread::sleep(poll);
    }
}

/// WAV segments only; staging files and the combined full-session artifact
/// are skipped.
fn is_candidate(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("wav") {
        return false;
    }
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => !stem.ends_with("_FULL"),
        None => false,
    }
}

/// Invoke the external transcriber for one audio file. Returns whether the
/// invocation reported success.
fn transcribe_file(
    config: &TranscriberConfig,
    model: &Path,
    audio: &Path,
    transcript_dir: &Path,
) -> bool {
    let stem = match audio.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return false,
    };
    let output_base = transcript_dir.join(stem);

    let result = Command::new(&config.command)
        .arg("-m")
        .arg(model)
        .arg("-f")
        .arg(audio)
        .arg("-of")
        .arg(&output_base)
        .arg("--output-txt")
        .arg("--output-srt")
        .status();

    match result {
        Ok(status) if status.success() => {
            tracing::info!("transcribed {}", audio.display());
            true
        }
        Ok(status) => {
            tracing::error!("transcriber exited with {} for {}", status, audio.display());
            false
        }
        Err(e) => {
            tracing::error!("could not launch transcriber '{}': {}", config.command, e);
            false
        }
    }
}
