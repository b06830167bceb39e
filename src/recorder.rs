//! Session controller and capture loop
//!
//! Owns the lifecycle of the dedicated capture thread. Exactly two logical
//! actors exist: the control side (start/stop/status) and one capture
//! thread per session. The only state they share is the recording flag,
//! the thread handle and a small status slot; every pipeline buffer is
//! owned exclusively by the capture thread.

use crate::audio::{
    AudioFormat, CpalSource, FinishedSegment, FlushReason, FrameNormalizer, GainNormalizer,
    SampleSource, SegmentAssembler, SourceError,
};
use crate::config::Config;
use crate::session::Session;
use crate::sink::{SegmentSink, WavSink};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Bounded sleep between polls of the sample source
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long start() waits for the capture thread to acquire the device
const INIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors reported by [`Recorder::start`]
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("could not spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("capture thread did not initialise in time")]
    InitTimeout,
}

/// Progress notifications published by the capture thread
#[derive(Debug, Clone)]
pub enum SegmentEvent {
    /// A segment was normalised and persisted
    SegmentWritten {
        index: u32,
        path: PathBuf,
        duration_secs: f32,
        reason: FlushReason,
    },
    /// The sink failed; the segment's audio is lost but the session
    /// continues
    SegmentLost { index: u32, error: String },
    /// The session ended and all buffers were flushed
    SessionFinished {
        id: String,
        segments: u32,
        full_path: Option<PathBuf>,
    },
}

/// Snapshot of the active session for the status surface
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub id: String,
    pub segments: u32,
}

/// Capture session controller
pub struct Recorder {
    config: Config,
    audio_dir: PathBuf,
    recording: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    status: Arc<Mutex<Option<SessionStatus>>>,
    event_tx: Sender<SegmentEvent>,
    event_rx: Receiver<SegmentEvent>,
}

impl Recorder {
    pub fn new(config: Config, audio_dir: PathBuf) -> Self {
        let (event_tx, event_rx) = bounded(64);
        Self {
            config,
            audio_dir,
            recording: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            status: Arc::new(Mutex::new(None)),
            event_tx,
            event_rx,
        }
    }

    /// Receiver for segment progress events. Clone to consume from another
    /// thread.
    pub fn events(&self) -> Receiver<SegmentEvent> {
        self.event_rx.clone()
    }

    /// Whether a capture session is active. Safe to call concurrently with
    /// start/stop; reflects the recording flag, not thread liveness.
    pub fn is_active(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Status of the active session, None when idle.
    pub fn status(&self) -> Option<SessionStatus> {
        if !self.is_active() {
            return None;
        }
        self.status.lock().clone()
    }

    /// Start a capture session.
    ///
    /// Idempotent: a no-op while a session is active. Blocks until the
    /// capture thread has acquired the sample source, so a missing device
    /// fails here with no thread left running and no partial session state.
    /// `seconds_per_file` overrides the hybrid policy's maximum segment
    /// duration for this session.
    pub fn start(&self, seconds_per_file: Option<f32>) -> Result<(), RecorderError> {
        let mut thread_slot = self.thread.lock();
        if self.recording.load(Ordering::SeqCst) {
            tracing::debug!("start ignored: session already active");
            return Ok(());
        }
        // Reap a thread left behind by a stream-interrupted session
        if let Some(stale) = thread_slot.take() {
            let _ = stale.join();
        }

        let (init_tx, init_rx) = bounded(1);
        self.recording.store(true, Ordering::SeqCst);

        let config = self.config.clone();
        let audio_dir = self.audio_dir.clone();
        let recording = self.recording.clone();
        let status = self.status.clone();
        let events = self.event_tx.clone();

        let spawned = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                capture_thread(
                    config,
                    seconds_per_file,
                    audio_dir,
                    &recording,
                    status,
                    events,
                    init_tx,
                );
                // A session that ends on its own (stream loss) must still
                // read as inactive.
                recording.store(false, Ordering::SeqCst);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.recording.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        match init_rx.recv_timeout(INIT_TIMEOUT) {
            Ok(Ok(())) => {
                *thread_slot = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.recording.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e.into())
            }
            Err(_) => {
                self.recording.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(RecorderError::InitTimeout)
            }
        }
    }

    /// Stop the active session.
    ///
    /// Idempotent. Blocks until the capture thread has joined, which
    /// guarantees the final flush (pending segment and full-session
    /// artifact) has completed before this returns.
    pub fn stop(&self) {
        let mut thread_slot = self.thread.lock();
        self.recording.store(false, Ordering::SeqCst);
        if let Some(handle) = thread_slot.take() {
            if handle.join().is_err() {
                tracing::error!("capture thread panicked");
            }
        }
    }
}

/// Capture thread entry: acquire the source, report the outcome to the
/// waiting start() call, then run the pipeline until cancelled.
fn capture_thread(
    config: Config,
    seconds_per_file: Option<f32>,
    audio_dir: PathBuf,
    recording: &AtomicBool,
    status: Arc<Mutex<Option<SessionStatus>>>,
    events: Sender<SegmentEvent>,
    init_tx: Sender<Result<(), SourceError>>,
) {
    let source = match CpalSource::open(
        config.audio.device_id.as_deref(),
        config.audio.prefer_loopback,
    ) {
        Ok(source) => source,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };
    let _ = init_tx.send(Ok(()));

    let format = source.format();
    let mut assembler = SegmentAssembler::new(format, config.vad.clone(), &config.segmenter);
    if let Some(secs) = seconds_per_file {
        assembler.set_max_duration(format, secs);
    }

    let session = Session::begin(&audio_dir);
    *status.lock() = Some(SessionStatus {
        id: session.id.clone(),
        segments: 0,
    });

    let mut pipeline = CapturePipeline {
        source,
        sink: WavSink,
        assembler,
        normalizer: FrameNormalizer::new(config.audio.capture_gain),
        gain: GainNormalizer::new(config.gain.clone()),
        session,
        format,
        audio_dir,
        status,
        events,
    };
    pipeline.run(recording);
    pipeline.finish();
}

/// Everything the capture thread owns exclusively
struct CapturePipeline<S: SampleSource, K: SegmentSink> {
    source: S,
    sink: K,
    assembler: SegmentAssembler,
    normalizer: FrameNormalizer,
    gain: GainNormalizer,
    session: Session,
    format: AudioFormat,
    audio_dir: PathBuf,
    status: Arc<Mutex<Option<SessionStatus>>>,
    events: Sender<SegmentEvent>,
}

impl<S: SampleSource, K: SegmentSink> CapturePipeline<S, K> {
    /// Poll-classify-assemble until the flag clears or the source dies.
    fn run(&mut self, recording: &AtomicBool) {
        let mut raw: Vec<f32> = Vec::with_capacity(8192);
        let mut canonical: Vec<i16> = Vec::with_capacity(8192);

        while recording.load(Ordering::SeqCst) {
            raw.clear();
            match self.source.poll(&mut raw) {
                Ok(0) => {}
                Ok(_) => {
                    canonical.clear();
                    self.normalizer.convert(&raw, &mut canonical);
                    for segment in self.assembler.push(&canonical) {
                        self.write_segment(segment);
                    }
                }
                Err(e) => {
                    // Treat a dead stream like a stop request: flush what we
                    // have instead of losing buffered audio.
                    tracing::warn!("sample source failed mid-session ({}), ending session", e);
                    break;
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Final flush: the partial segment, then the full-session artifact.
    fn finish(&mut self) {
        if let Some(segment) = self.assembler.force_flush(FlushReason::Stop) {
            self.write_segment(segment);
        }

        let full = self.session.take_full();
        let full_path = if full.is_empty() {
            None
        } else {
            let path = self.session.full_path(&self.audio_dir);
            match self.sink.write(&path, &self.format, &full) {
                Ok(()) => Some(path),
                Err(e) => {
                    tracing::error!("could not write full-session artifact: {}", e);
                    None
                }
            }
        };

        tracing::info!(
            "session {} finished with {} segments",
            self.session.id,
            self.session.segments_emitted()
        );
        let _ = self.events.try_send(SegmentEvent::SessionFinished {
            id: self.session.id.clone(),
            segments: self.session.segments_emitted(),
            full_path,
        });
    }

    fn write_segment(&mut self, mut segment: FinishedSegment) {
        let applied = self.gain.normalize(&mut segment.pcm);
        if applied != 1.0 {
            tracing::debug!("applied corrective gain {:.2}", applied);
        }

        let (index, path) = self.session.next_segment_path(&self.audio_dir);
        match self.sink.write(&path, &self.format, &segment.pcm) {
            Ok(()) => {
                let _ = self.events.try_send(SegmentEvent::SegmentWritten {
                    index,
                    path,
                    duration_secs: self.format.duration_secs(segment.pcm.len()),
                    reason: segment.reason,
                });
            }
            Err(e) => {
                // A failing sink must not stall capture: the segment's audio
                // is lost but index and overlap state advance as if the
                // write had succeeded.
                tracing::error!("segment {} write failed: {}", index, e);
                let _ = self.events.try_send(SegmentEvent::SegmentLost {
                    index,
                    error: e.to_string(),
                });
            }
        }

        self.session.append_full(segment.fresh());
        if let Some(active) = self.status.lock().as_mut() {
            active.segments = self.session.segments_emitted();
        }
    }
}
