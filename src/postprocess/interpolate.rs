use crate::types::WordAlignment;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Re-times runs of unreliable words by spreading them evenly between their
/// reliable neighbours.
#[derive(Debug, Clone, Copy)]
pub struct LowConfidenceInterpolator {
    threshold: f32,
}

impl Default for LowConfidenceInterpolator {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl LowConfidenceInterpolator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Each maximal run below the threshold is bounded by the end of the word
    /// before it and the start of the word after it; at the edges the run's
    /// own first start or last end stands in. Runs with no room keep their
    /// timestamps.
    pub fn interpolate(&self, words: &[WordAlignment]) -> Vec<WordAlignment> {
        let mut result = words.to_vec();
        let mut i = 0;
        while i < result.len() {
            if result[i].confidence >= self.threshold {
                i += 1;
                continue;
            }
            let run_start = i;
            while i < result.len() && result[i].confidence < self.threshold {
                i += 1;
            }
            let run_end = i;

            let start_ms = match run_start {
                0 => result[0].start_ms,
                _ => result[run_start - 1].end_ms,
            };
            let end_ms = match result.get(run_end) {
                Some(next) => next.start_ms,
                None => result[run_end - 1].end_ms,
            };
            spread(&mut result[run_start..run_end], start_ms, end_ms);
        }
        result
    }
}

fn spread(words: &mut [WordAlignment], start_ms: u64, end_ms: u64) {
    if end_ms <= start_ms {
        return;
    }
    let span = end_ms - start_ms;
    let count = words.len() as u64;
    for (idx, word) in words.iter_mut().enumerate() {
        let idx = idx as u64;
        word.start_ms = start_ms + span * idx / count;
        word.end_ms = start_ms + span * (idx + 1) / count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start_ms: u64, end_ms: u64, confidence: f32) -> WordAlignment {
        WordAlignment {
            word: "w".into(),
            start_ms,
            end_ms,
            confidence,
            line_index: 0,
        }
    }

    #[test]
    fn spreads_interior_run_between_anchors() {
        let words = [
            word(0, 1000, 0.9),
            word(5000, 5100, 0.1),
            word(1200, 1300, 0.0),
            word(3000, 4000, 0.8),
        ];
        let out = LowConfidenceInterpolator::default().interpolate(&words);
        assert_eq!((out[1].start_ms, out[1].end_ms), (1000, 2000));
        assert_eq!((out[2].start_ms, out[2].end_ms), (2000, 3000));
        assert_eq!(out[0], words[0]);
        assert_eq!(out[3], words[3]);
    }

    #[test]
    fn edge_runs_use_their_own_bounds() {
        let words = [word(0, 100, 0.1), word(900, 1000, 0.1), word(1000, 2000, 0.9)];
        let out = LowConfidenceInterpolator::default().interpolate(&words);
        assert_eq!((out[0].start_ms, out[0].end_ms), (0, 500));
        assert_eq!((out[1].start_ms, out[1].end_ms), (500, 1000));
    }

    #[test]
    fn collapsed_span_is_left_alone() {
        let words = [word(1000, 1000, 0.9), word(400, 500, 0.0), word(1000, 1200, 0.9)];
        let out = LowConfidenceInterpolator::default().interpolate(&words);
        assert_eq!(out[1], words[1]);
    }
}
