//! Voice activity detection
//!
//! A deterministic energy detector: each fixed-duration frame is classified
//! speech/silence from its RMS energy (optionally rescued by zero-crossing
//! rate for low-energy fricatives), and a run-length state machine decides
//! when an utterance has ended. All smoothing is expressed as
//! consecutive-frame run lengths rather than decaying averages so boundary
//! decisions are reproducible.

use serde::{Deserialize, Serialize};

/// Configuration for the energy detector and its run-length thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// RMS energy above which a frame counts as speech, as a fraction of
    /// full scale. Useful range in practice: 0.004-0.01.
    pub energy_threshold: f32,

    /// Classification frame duration in milliseconds
    pub frame_ms: u32,

    /// Consecutive speech frames required before a silence run may end the
    /// utterance. Prevents pure-noise micro-segments.
    pub min_speech_frames: u32,

    /// Consecutive silence frames required to end an utterance
    pub min_silence_frames: u32,

    /// Rescue low-energy frames with a high zero-crossing rate (fricatives)
    pub zcr_enabled: bool,

    /// Zero-crossing rate (sign changes per sample) above which a
    /// low-energy frame is still counted as speech
    pub zcr_threshold: f32,

    /// Minimum energy for the ZCR rescue to apply; keeps true silence from
    /// being promoted by electrical noise
    pub zcr_energy_floor: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.005,
            frame_ms: 20,
            min_speech_frames: 12,
            min_silence_frames: 18,
            zcr_enabled: false,
            zcr_threshold: 0.12,
            zcr_energy_floor: 0.002,
        }
    }
}

/// Classification result for a single frame
#[derive(Debug, Clone, Copy)]
pub struct FrameClass {
    pub is_speech: bool,
    /// RMS energy of the frame, normalised to [0, 1]
    pub energy: f32,
}

/// Run-length counters of the speech/silence state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VadState {
    pub in_speech: bool,
    pub speech_frames: u32,
    pub silence_frames: u32,
}

/// Decision after observing one classified frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    /// Keep accumulating
    Continue,
    /// A sustained-silence boundary after sufficient speech; the pending
    /// segment should be emitted
    EndOfUtterance,
}

/// Energy/ZCR voice activity detector
pub struct EnergyVad {
    config: VadConfig,
    state: VadState,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: VadState::default(),
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    /// Classify one frame of canonical PCM. Stateless.
    pub fn classify(&self, frame: &[i16]) -> FrameClass {
        let energy = rms(frame);
        let mut is_speech = energy > self.config.energy_threshold;

        if !is_speech
            && self.config.zcr_enabled
            && energy > self.config.zcr_energy_floor
            && zero_crossing_rate(frame) > self.config.zcr_threshold
        {
            is_speech = true;
        }

        FrameClass { is_speech, energy }
    }

    /// Feed one classification into the run-length state machine.
    ///
    /// Returns [`VadDecision::EndOfUtterance`] when the silence run has
    /// reached `min_silence_frames` *and* the utterance accumulated at least
    /// `min_speech_frames` of speech. The caller resets the machine on every
    /// emission, including forced ones.
    pub fn observe(&mut self, class: FrameClass) -> VadDecision {
        if class.is_speech {
            self.state.in_speech = true;
            self.state.speech_frames += 1;
            self.state.silence_frames = 0;
            return VadDecision::Continue;
        }

        if !self.state.in_speech {
            // Leading silence before speech onset: no state change, the
            // frame is still accumulated by the assembler.
            return VadDecision::Continue;
        }

        self.state.silence_frames += 1;
        if self.state.silence_frames >= self.config.min_silence_frames
            && self.state.speech_frames >= self.config.min_speech_frames
        {
            VadDecision::EndOfUtterance
        } else {
            VadDecision::Continue
        }
    }

    /// Reset to the initial silence state. Called on every segment emission.
    pub fn reset(&mut self) {
        self.state = VadState::default();
    }
}

/// RMS energy of a frame, with samples normalised to [-1, 1]
pub fn rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame
        .iter()
        .map(|&s| {
            let normalised = s as f64 / 32768.0;
            normalised * normalised
        })
        .sum();
    (sum_sq / frame.len() as f64).sqrt() as f32
}

/// Fraction of adjacent sample pairs whose signs differ
pub fn zero_crossing_rate(frame: &[i16]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
        .count();
    crossings as f32 / (frame.len() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(amplitude: i16, len: usize) -> Vec<i16> {
        vec![amplitude; len]
    }

    fn speech() -> FrameClass {
        FrameClass {
            is_speech: true,
            energy: 0.1,
        }
    }

    fn silence() -> FrameClass {
        FrameClass {
            is_speech: false,
            energy: 0.0,
        }
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let frame = frame_of(3277, 160); // ~0.1 full scale
        let energy = rms(&frame);
        assert!((energy - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_classify_against_threshold() {
        let vad = EnergyVad::new(VadConfig::default());

        let loud = frame_of(1000, 160); // ~0.03 full scale
        assert!(vad.classify(&loud).is_speech);

        let quiet = frame_of(30, 160); // ~0.0009 full scale
        assert!(!vad.classify(&quiet).is_speech);
    }

    #[test]
    fn test_zcr_rescues_fricative_frames() {
        let config = VadConfig {
            zcr_enabled: true,
            ..VadConfig::default()
        };
        let vad = EnergyVad::new(config);

        // Low-energy but rapidly alternating signal, like an unvoiced 's'
        let fricative: Vec<i16> = (0..160).map(|i| if i % 2 == 0 { 120 } else { -120 }).collect();
        let class = vad.classify(&fricative);
        assert!(class.energy < vad.config().energy_threshold);
        assert!(class.is_speech);

        // Same energy without the crossings stays silence
        let hum = frame_of(120, 160);
        assert!(!vad.classify(&hum).is_speech);
    }

    #[test]
    fn test_zcr_floor_keeps_true_silence_out() {
        let config = VadConfig {
            zcr_enabled: true,
            ..VadConfig::default()
        };
        let vad = EnergyVad::new(config);

        // Alternating but far below the energy floor
        let noise: Vec<i16> = (0..160).map(|i| if i % 2 == 0 { 10 } else { -10 }).collect();
        assert!(!vad.classify(&noise).is_speech);
    }

    #[test]
    fn test_exact_run_lengths_trigger_one_boundary() {
        let config = VadConfig::default();
        let (min_speech, min_silence) = (config.min_speech_frames, config.min_silence_frames);
        let mut vad = EnergyVad::new(config);

        let mut boundaries = 0;
        for _ in 0..min_speech {
            assert_eq!(vad.observe(speech()), VadDecision::Continue);
        }
        for i in 0..min_silence {
            match vad.observe(silence()) {
                VadDecision::EndOfUtterance => {
                    boundaries += 1;
                    assert_eq!(i, min_silence - 1);
                    vad.reset();
                }
                VadDecision::Continue => {}
            }
        }
        assert_eq!(boundaries, 1);
        assert_eq!(vad.state(), VadState::default());
    }

    #[test]
    fn test_insufficient_speech_never_splits() {
        let config = VadConfig::default();
        let min_speech = config.min_speech_frames;
        let mut vad = EnergyVad::new(config);

        for _ in 0..min_speech - 1 {
            vad.observe(speech());
        }
        // Far more silence than the threshold still yields no boundary
        for _ in 0..100 {
            assert_eq!(vad.observe(silence()), VadDecision::Continue);
        }
    }

    #[test]
    fn test_speech_resumption_resets_silence_run() {
        let mut vad = EnergyVad::new(VadConfig::default());

        for _ in 0..20 {
            vad.observe(speech());
        }
        for _ in 0..10 {
            vad.observe(silence());
        }
        vad.observe(speech());
        assert_eq!(vad.state().silence_frames, 0);

        // The pause did not cost the accumulated speech run
        assert!(vad.state().speech_frames > 20);
    }

    #[test]
    fn test_leading_silence_is_ignored_by_the_machine() {
        let mut vad = EnergyVad::new(VadConfig::default());
        for _ in 0..50 {
            assert_eq!(vad.observe(silence()), VadDecision::Continue);
        }
        assert_eq!(vad.state(), VadState::default());
    }

    #[test]
    fn test_zero_crossing_rate() {
        let alternating: Vec<i16> = (0..100).map(|i| if i % 2 == 0 { 1 } else { -1 }).collect();
        assert!(zero_crossing_rate(&alternating) > 0.99);

        let constant = vec![500i16; 100];
        assert_eq!(zero_crossing_rate(&constant), 0.0);
    }
}
