//! Loopscribe CLI
//!
//! Thin command surface over the session controller: a line-oriented
//! command loop (`start-recording`, `stop-recording`, `get-status`,
//! `exit`) plus a one-shot `--command` mode for scripting.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use loopscribe::audio::BoundaryPolicy;
use loopscribe::config::Config;
use loopscribe::paths::AppDirs;
use loopscribe::recorder::{Recorder, SegmentEvent};
use loopscribe::watcher::TranscriptionWatcher;

#[derive(Parser)]
#[command(name = "loopscribe", version, about = "Loopback capture with VAD segmentation")]
struct Cli {
    /// Base data directory (default ~/.loopscribe)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Begin recording immediately
    #[arg(long)]
    start_recording: bool,

    /// Execute one command and exit: start-recording, stop-recording,
    /// get-status or exit
    #[arg(long)]
    command: Option<String>,

    /// Override the segment boundary policy: vad_only or hybrid
    #[arg(long)]
    policy: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("loopscribe=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    let dirs = AppDirs::resolve(cli.data_dir.as_deref());
    dirs.bootstrap().with_context(|| {
        format!(
            "could not create data directories under {}",
            dirs.root.display()
        )
    })?;

    let config_path = dirs.config_file();
    let mut config = Config::load_or_default(&config_path);
    if !config_path.exists() {
        config.save(&config_path)?;
        info!("wrote default config to {}", config_path.display());
    }

    if let Some(policy) = cli.policy.as_deref() {
        config.segmenter.policy = match policy {
            "vad_only" | "vad-only" => BoundaryPolicy::VadOnly,
            "hybrid" => BoundaryPolicy::Hybrid,
            other => anyhow::bail!("unknown policy '{}' (expected vad_only or hybrid)", other),
        };
    }

    let recorder = Recorder::new(config.clone(), dirs.audio.clone());
    spawn_event_logger(&recorder);

    let mut watcher = config
        .transcriber
        .enabled
        .then(|| TranscriptionWatcher::start(config.transcriber.clone(), &dirs));

    let mut interactive = true;
    if let Some(command) = cli.command.as_deref() {
        // One-shot mode: everything except start-recording exits after the
        // command. Starting a recording only makes sense while the process
        // lives, so that one falls through to the command loop.
        dispatch(command, &recorder);
        interactive = command.starts_with("start-recording");
    } else if cli.start_recording {
        dispatch("start-recording", &recorder);
    }

    if interactive {
        info!("ready; commands: start-recording [secs], stop-recording, get-status, exit");
        command_loop(&recorder);
    }

    recorder.stop();
    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }
    Ok(())
}

/// Forward capture-thread events into the log.
fn spawn_event_logger(recorder: &Recorder) {
    let events = recorder.events();
    std::thread::spawn(move || {
        for event in events.iter() {
            match event {
                SegmentEvent::SegmentWritten {
                    index,
                    path,
                    duration_secs,
                    ..
                } => info!(
                    "segment {} ({:.1}s) -> {}",
                    index,
                    duration_secs,
                    path.display()
                ),
                SegmentEvent::SegmentLost { index, error } => {
                    warn!("segment {} lost: {}", index, error)
                }
                SegmentEvent::SessionFinished { id, segments, .. } => {
                    info!("session {} closed ({} segments)", id, segments)
                }
            }
        }
    });
}

/// Read commands from stdin until `exit` or EOF.
fn command_loop(recorder: &Recorder) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }
        dispatch(trimmed, recorder);
    }
}

/// Map one command line onto the session controller.
fn dispatch(command: &str, recorder: &Recorder) {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("start-recording") => {
            let seconds_per_file = parts.next().and_then(|arg| arg.parse::<f32>().ok());
            if recorder.is_active() {
                println!("already recording");
                return;
            }
            match recorder.start(seconds_per_file) {
                Ok(()) => println!("recording started"),
                Err(e) => {
                    error!("could not start recording: {}", e);
                    println!("start failed");
                }
            }
        }
        Some("stop-recording") => {
            recorder.stop();
            println!("recording stopped");
        }
        Some("get-status") => match recorder.status() {
            Some(status) => println!("recording ({}: {} segments)", status.id, status.segments),
            None => println!("not-recording"),
        },
        Some("exit") => {}
        Some(other) => println!("unknown command: {}", other),
        None => {}
    }
}
