//! Per-segment gain normalisation
//!
//! Before a segment is persisted its peak amplitude is scanned and a single
//! corrective gain brings the peak up to a target ceiling. One global gain
//! per segment, no per-frame dynamics, so the operation is deterministic
//! and idempotent.

use serde::{Deserialize, Serialize};

/// Configuration for peak normalisation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    /// Peak level the corrective gain aims for, as a fraction of full
    /// scale. Kept just under 1.0 so rounding never clips.
    pub target_peak: f32,

    /// Corrective gains at or below this factor are skipped; material that
    /// is already near the ceiling is left untouched
    pub min_gain: f32,

    /// Peaks below this level are treated as silence and not amplified
    pub silence_floor: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            target_peak: 0.98,
            min_gain: 1.01,
            silence_floor: 1e-4,
        }
    }
}

/// Applies a single corrective gain per segment
#[derive(Debug, Clone, Default)]
pub struct GainNormalizer {
    config: GainConfig,
}

impl GainNormalizer {
    pub fn new(config: GainConfig) -> Self {
        Self { config }
    }

    /// Normalise the buffer in place and return the gain that was applied
    /// (1.0 when the buffer was left unchanged).
    pub fn normalize(&self, samples: &mut [i16]) -> f32 {
        let peak = peak(samples);
        if peak < self.config.silence_floor || peak >= self.config.target_peak {
            return 1.0;
        }

        let gain = self.config.target_peak / peak;
        if gain <= self.config.min_gain {
            return 1.0;
        }

        for sample in samples.iter_mut() {
            let amplified = (*sample as f32 * gain).round();
            *sample = amplified.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
        gain
    }
}

/// Peak absolute amplitude of a buffer, normalised to [0, 1]
pub fn peak(samples: &[i16]) -> f32 {
    samples
        .iter()
        .map(|&s| (s as f32 / 32768.0).abs())
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_buffer_is_raised_to_target() {
        let normalizer = GainNormalizer::default();
        // Peak at ~0.3 full scale
        let mut samples: Vec<i16> = (0..1000)
            .map(|i| ((i as f32 * 0.1).sin() * 0.3 * 32767.0) as i16)
            .collect();

        let gain = normalizer.normalize(&mut samples);
        assert!(gain > 3.0 && gain < 3.4);

        let new_peak = peak(&samples);
        assert!((new_peak - 0.98).abs() < 0.01, "peak was {}", new_peak);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = GainNormalizer::default();
        let mut samples: Vec<i16> = (0..1000)
            .map(|i| ((i as f32 * 0.1).sin() * 0.3 * 32767.0) as i16)
            .collect();

        normalizer.normalize(&mut samples);
        let once = samples.clone();
        let second_gain = normalizer.normalize(&mut samples);

        assert_eq!(second_gain, 1.0);
        assert_eq!(samples, once);
    }

    #[test]
    fn test_near_silence_is_untouched() {
        let normalizer = GainNormalizer::default();
        let mut samples = vec![1i16, -1, 2, -2, 0];
        let original = samples.clone();

        assert_eq!(normalizer.normalize(&mut samples), 1.0);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_already_loud_buffer_is_untouched() {
        let normalizer = GainNormalizer::default();
        let mut samples = vec![32700i16, -32700, 16000];
        let original = samples.clone();

        assert_eq!(normalizer.normalize(&mut samples), 1.0);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_marginal_gain_is_skipped() {
        let normalizer = GainNormalizer::default();
        // Peak ~0.975: corrective gain would be ~1.005, below min_gain
        let mut samples = vec![(0.975f32 * 32768.0) as i16];
        let original = samples.clone();

        assert_eq!(normalizer.normalize(&mut samples), 1.0);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_no_sample_exceeds_full_scale() {
        let normalizer = GainNormalizer::default();
        let mut samples: Vec<i16> = (0..1000)
            .map(|i| if i % 2 == 0 { 9830 } else { -9830 }) // ~0.3
            .collect();

        normalizer.normalize(&mut samples);
        for &s in &samples {
            assert!((s as f32 / 32768.0).abs() <= 1.0);
        }
    }

    #[test]
    fn test_empty_buffer() {
        let normalizer = GainNormalizer::default();
        let mut samples: Vec<i16> = Vec::new();
        assert_eq!(normalizer.normalize(&mut samples), 1.0);
    }
}
