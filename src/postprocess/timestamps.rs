use crate::alignment::ctc::AlignedPhoneme;

/// An aligned phoneme run expressed in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedPhoneme {
    pub phoneme_index: Option<usize>,
    pub label: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
    pub is_blank: bool,
}

impl TimestampedPhoneme {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Maps frame indices onto the track timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampConverter {
    frame_duration_ms: f32,
    chunk_offset_ms: u64,
}

impl TimestampConverter {
    pub fn new(frame_duration_ms: f32, chunk_offset_ms: u64) -> Self {
        Self {
            frame_duration_ms: frame_duration_ms.max(0.0),
            chunk_offset_ms,
        }
    }

    pub fn frame_to_ms(&self, frame: usize) -> u64 {
        (frame as f32 * self.frame_duration_ms).round() as u64 + self.chunk_offset_ms
    }

    /// Runs keep their order; each end is the start of the frame after the
    /// run's last frame.
    pub fn convert(&self, runs: &[AlignedPhoneme]) -> Vec<TimestampedPhoneme> {
        runs.iter()
            .map(|run| TimestampedPhoneme {
                phoneme_index: run.phoneme_index,
                label: run.label,
                start_ms: self.frame_to_ms(run.start_frame),
                end_ms: self.frame_to_ms(run.end_frame + 1),
                confidence: run.confidence,
                is_blank: run.is_blank,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_frame_duration_and_offset() {
        let converter = TimestampConverter::new(20.0, 30_000);
        let runs = [AlignedPhoneme {
            phoneme_index: Some(0),
            label: 3,
            start_frame: 5,
            end_frame: 9,
            confidence: 0.8,
            is_blank: false,
        }];
        let stamped = converter.convert(&runs);
        assert_eq!(stamped[0].start_ms, 30_100);
        assert_eq!(stamped[0].end_ms, 30_200);
        assert_eq!(stamped[0].duration_ms(), 100);
    }
}
