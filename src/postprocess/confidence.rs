use std::ops::Range;

use crate::types::WordAlignment;

use super::timestamps::TimestampedPhoneme;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceCalculator;

impl ConfidenceCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Duration-weighted mean confidence of the non-blank runs.
    pub fn overall(&self, phonemes: &[TimestampedPhoneme]) -> f32 {
        let (weighted, total) = phonemes
            .iter()
            .filter(|p| !p.is_blank)
            .fold((0.0f64, 0u64), |(weighted, total), p| {
                let duration = p.duration_ms();
                (weighted + p.confidence as f64 * duration as f64, total + duration)
            });
        if total == 0 {
            return 0.0;
        }
        clamp((weighted / total as f64) as f32)
    }

    /// Replaces each word's confidence with the mean of the non-blank runs
    /// whose phoneme index falls in its range. Words without runs keep theirs.
    pub fn word_confidence(
        &self,
        words: &[WordAlignment],
        phonemes: &[TimestampedPhoneme],
        ranges: &[Range<usize>],
    ) -> Vec<WordAlignment> {
        words
            .iter()
            .enumerate()
            .map(|(idx, word)| {
                let Some(range) = ranges.get(idx) else {
                    return word.clone();
                };
                match mean_confidence(phonemes, range) {
                    Some(confidence) => WordAlignment {
                        confidence,
                        ..word.clone()
                    },
                    None => word.clone(),
                }
            })
            .collect()
    }
}

/// Unweighted mean over the non-blank runs for phonemes in `range`.
pub fn mean_confidence(phonemes: &[TimestampedPhoneme], range: &Range<usize>) -> Option<f32> {
    let (sum, count) = phonemes
        .iter()
        .filter(|p| p.phoneme_index.is_some_and(|idx| range.contains(&idx)))
        .fold((0.0f32, 0usize), |(sum, count), p| (sum + p.confidence, count + 1));
    (count > 0).then(|| clamp(sum / count as f32))
}

fn clamp(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
