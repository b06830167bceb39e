//! Frame normalisation
//!
//! Converts captured 32-bit float batches into the canonical signed 16-bit
//! representation used by the rest of the pipeline, applying an optional
//! static capture gain and hard clipping.

/// Converts source sample batches to canonical 16-bit PCM
#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    gain: f32,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FrameNormalizer {
    /// Create a normaliser with a static gain multiplier (1.0 = unity).
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    /// Convert an interleaved f32 batch, appending the result to `out`.
    ///
    /// Samples are scaled by the static gain, clipped to [-1.0, 1.0] and
    /// rounded to i16 full scale.
    pub fn convert(&self, input: &[f32], out: &mut Vec<i16>) {
        out.reserve(input.len());
        for &sample in input {
            let scaled = (sample * self.gain).clamp(-1.0, 1.0);
            out.push((scaled * 32767.0).round() as i16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_all(normalizer: &FrameNormalizer, input: &[f32]) -> Vec<i16> {
        let mut out = Vec::new();
        normalizer.convert(input, &mut out);
        out
    }

    #[test]
    fn test_unity_gain_scaling() {
        let n = FrameNormalizer::default();
        let out = convert_all(&n, &[0.0, 0.5, -0.5, 1.0, -1.0]);
        assert_eq!(out, vec![0, 16384, -16384, 32767, -32767]);
    }

    #[test]
    fn test_out_of_range_input_is_clipped() {
        let n = FrameNormalizer::default();
        let out = convert_all(&n, &[1.7, -2.3]);
        assert_eq!(out, vec![32767, -32767]);
    }

    #[test]
    fn test_static_gain_applied_before_clip() {
        let n = FrameNormalizer::new(2.0);
        let out = convert_all(&n, &[0.25, 0.75]);
        // 0.25 * 2 = 0.5; 0.75 * 2 clips at 1.0
        assert_eq!(out, vec![16384, 32767]);
    }

    #[test]
    fn test_appends_to_existing_buffer() {
        let n = FrameNormalizer::default();
        let mut out = vec![7i16];
        n.convert(&[0.0], &mut out);
        assert_eq!(out, vec![7, 0]);
    }
}
