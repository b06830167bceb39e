//! Segment assembly
//!
//! Accumulates classified frames into a pending utterance buffer, decides
//! segment boundaries (VAD end-of-utterance, max-duration force flush, or
//! session stop) and maintains the overlap carry that preserves continuity
//! across cut points.

use super::vad::{EnergyVad, VadConfig, VadDecision};
use super::AudioFormat;
use serde::{Deserialize, Serialize};

/// How segment boundaries are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Boundaries exactly as decided by the VAD state machine. Segment
    /// length is unbounded under continuous speech.
    VadOnly,
    /// VAD boundaries plus a forced flush once the pending segment exceeds
    /// the maximum duration, bounding worst-case segment size.
    #[default]
    Hybrid,
}

/// Configuration for segment boundary decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub policy: BoundaryPolicy,

    /// No VAD boundary is honoured before this much audio has accumulated;
    /// avoids degenerate near-empty files
    pub min_segment_secs: f32,

    /// Hybrid policy: force a flush once the pending segment reaches this
    /// duration
    pub max_segment_secs: f32,

    /// Trailing slice of each emitted segment prepended to the next one
    pub overlap_secs: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            policy: BoundaryPolicy::default(),
            min_segment_secs: 1.0,
            max_segment_secs: 8.0,
            overlap_secs: 0.5,
        }
    }
}

/// Why a segment was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Sustained silence after sufficient speech
    Utterance,
    /// Maximum segment duration reached (hybrid policy)
    MaxDuration,
    /// Session stop
    Stop,
}

/// An emitted segment ready for gain normalisation and persistence
#[derive(Debug)]
pub struct FinishedSegment {
    /// Overlap carry from the previous segment followed by the fresh audio
    pub pcm: Vec<i16>,
    /// Length of the prepended carry; `pcm[overlap_len..]` is the audio
    /// that was not part of any earlier segment
    pub overlap_len: usize,
    pub reason: FlushReason,
}

impl FinishedSegment {
    /// The portion of the segment not carried over from its predecessor.
    pub fn fresh(&self) -> &[i16] {
        &self.pcm[self.overlap_len..]
    }
}

/// Assembles classified frames into silence-delimited segments
pub struct SegmentAssembler {
    vad: EnergyVad,
    policy: BoundaryPolicy,
    /// Utterance being accumulated; grows by whole VAD frames
    pending: Vec<i16>,
    /// Residue shorter than one VAD frame, waiting for the next poll
    partial: Vec<i16>,
    /// Trailing slice of the last emitted segment
    overlap: Vec<i16>,
    frame_samples: usize,
    min_samples: usize,
    max_samples: usize,
    overlap_samples: usize,
}

impl SegmentAssembler {
    pub fn new(format: AudioFormat, vad_config: VadConfig, config: &SegmenterConfig) -> Self {
        let frame_samples = format.samples_for_ms(vad_config.frame_ms).max(1);
        Self {
            vad: EnergyVad::new(vad_config),
            policy: config.policy,
            pending: Vec::new(),
            partial: Vec::new(),
            overlap: Vec::new(),
            frame_samples,
            min_samples: format.samples_for_secs(config.min_segment_secs),
            max_samples: format.samples_for_secs(config.max_segment_secs),
            overlap_samples: format.samples_for_secs(config.overlap_secs),
        }
    }

    /// Override the maximum segment duration for this session.
    pub fn set_max_duration(&mut self, format: AudioFormat, secs: f32) {
        self.max_samples = format.samples_for_secs(secs);
    }

    /// Samples accumulated but not yet emitted (pending plus sub-frame
    /// residue).
    pub fn pending_samples(&self) -> usize {
        self.pending.len() + self.partial.len()
    }

    /// Feed a batch of canonical PCM into the assembler.
    ///
    /// Frames are classified in arrival order; every frame, speech or
    /// silence, is appended to the pending buffer so leading silence before
    /// speech onset is preserved. Returns any segments whose boundary fell
    /// inside this batch, in temporal order.
    pub fn push(&mut self, samples: &[i16]) -> Vec<FinishedSegment> {
        let mut finished = Vec::new();
        self.partial.extend_from_slice(samples);

        let mut offset = 0;
        while self.partial.len() - offset >= self.frame_samples {
            let frame = &self.partial[offset..offset + self.frame_samples];
            let decision = {
                let class = self.vad.classify(frame);
                self.vad.observe(class)
            };
            self.pending.extend_from_slice(frame);
            offset += self.frame_samples;

            let boundary = decision == VadDecision::EndOfUtterance
                && self.pending.len() >= self.min_samples;
            if boundary {
                finished.push(self.emit(FlushReason::Utterance));
            } else if self.policy == BoundaryPolicy::Hybrid
                && self.pending.len() >= self.max_samples
            {
                finished.push(self.emit(FlushReason::MaxDuration));
            }
        }
        self.partial.drain(..offset);

        finished
    }

    /// Emit whatever is pending regardless of VAD state.
    ///
    /// Sub-frame residue is included so no captured audio is lost on stop.
    /// An empty pending buffer is a no-op: the sink never sees zero-length
    /// segments.
    pub fn force_flush(&mut self, reason: FlushReason) -> Option<FinishedSegment> {
        let residue = std::mem::take(&mut self.partial);
        self.pending.extend_from_slice(&residue);

        if self.pending.is_empty() {
            return None;
        }
        Some(self.emit(reason))
    }

    fn emit(&mut self, reason: FlushReason) -> FinishedSegment {
        let overlap_len = self.overlap.len();
        let mut pcm = Vec::with_capacity(overlap_len + self.pending.len());
        pcm.extend_from_slice(&self.overlap);
        pcm.extend_from_slice(&self.pending);

        // The carry is taken from the pre-overlap pending buffer: the whole
        // buffer when it is shorter than the overlap window.
        let carry = self.overlap_samples.min(self.pending.len());
        self.overlap.clear();
        self.overlap
            .extend_from_slice(&self.pending[self.pending.len() - carry..]);

        self.pending.clear();
        self.vad.reset();

        FinishedSegment {
            pcm,
            overlap_len,
            reason,
        }
    }
}
