//! Lyric-to-audio alignment: the phoneme vocabulary, the CTC forced aligner,
//! the transcript matcher and the chunk connector.

pub mod connector;
pub mod ctc;
pub mod matcher;
pub mod vocabulary;

use std::ops::Range;

use tracing::{debug, error, warn};

use crate::config::AlignerConfig;
use crate::g2p::G2p;
use crate::postprocess::{
    ConfidenceCalculator, LowConfidenceInterpolator, TimestampConverter, TimestampedPhoneme,
};
use crate::types::{AlignmentResult, Language, LineAlignment, WordAlignment};

pub use connector::{ChunkAlignment, ChunkBoundaryConnector};
pub use ctc::{AlignedPhoneme, CtcForcedAligner, LogProbMatrix, PosteriorScale};
pub use matcher::{LineMatch, TranscriptionMatcher};
pub use vocabulary::PhonemeVocabulary;

/// A lyric word and the slice of the concatenated phoneme sequence it owns.
#[derive(Debug, Clone)]
struct WordPlan {
    word: String,
    line_index: usize,
    phonemes: Range<usize>,
}

/// Lines plus the phoneme runs they were built from, before LRC rendering.
#[derive(Debug, Clone, Default)]
pub struct ForcedAlignment {
    pub lines: Vec<LineAlignment>,
    pub phonemes: Vec<TimestampedPhoneme>,
}

/// Forced-alignment pipeline: G2P, CTC Viterbi, then post-processing.
#[derive(Debug, Clone)]
pub struct LyricsAligner {
    g2p: G2p,
    vocabulary: &'static PhonemeVocabulary,
    ctc: CtcForcedAligner,
    interpolator: LowConfidenceInterpolator,
    confidence: ConfidenceCalculator,
}

impl Default for LyricsAligner {
    fn default() -> Self {
        Self::new(&AlignerConfig::default())
    }
}

impl LyricsAligner {
    pub fn new(config: &AlignerConfig) -> Self {
        Self {
            g2p: G2p::new(),
            vocabulary: PhonemeVocabulary::shared(),
            ctc: CtcForcedAligner::default(),
            interpolator: LowConfidenceInterpolator::new(config.interpolation_threshold),
            confidence: ConfidenceCalculator::new(),
        }
    }

    pub fn vocabulary(&self) -> &'static PhonemeVocabulary {
        self.vocabulary
    }

    /// Vocabulary indices for one word.
    pub fn encode_word(&self, word: &str, language: Language) -> Vec<usize> {
        self.vocabulary.encode(self.g2p.convert(word, language))
    }

    /// Number of phonemes a line contributes to the label sequence.
    pub fn phoneme_count(&self, line: &str, language: Language) -> usize {
        line.split_whitespace()
            .map(|word| self.encode_word(word, language).len())
            .sum()
    }

    /// Aligns `lyrics` against a whole-track posterior matrix.
    ///
    /// Degenerate input (no lyrics, no frames, a matrix built for another
    /// vocabulary, or lyrics with no pronounceable words) yields an empty
    /// zero-confidence result.
    pub fn align(
        &self,
        lyrics: &[String],
        matrix: &LogProbMatrix,
        frame_duration_ms: f32,
        language: Language,
    ) -> AlignmentResult {
        let detailed = self.align_detailed(lyrics, matrix, frame_duration_ms, 0, language);
        if detailed.lines.is_empty() {
            return AlignmentResult::empty();
        }
        let overall = self.confidence.overall(&detailed.phonemes);
        AlignmentResult::from_lines(detailed.lines, overall)
    }

    /// Same as [`align`](Self::align) but returns the timestamped phoneme
    /// runs as well, with every timestamp shifted by `offset_ms`.
    pub fn align_detailed(
        &self,
        lyrics: &[String],
        matrix: &LogProbMatrix,
        frame_duration_ms: f32,
        offset_ms: u64,
        language: Language,
    ) -> ForcedAlignment {
        if lyrics.is_empty() {
            return ForcedAlignment::default();
        }
        if matrix.num_frames() == 0 {
            error!(lines = lyrics.len(), "posterior matrix has no frames");
            return ForcedAlignment::default();
        }
        if let Err(err) = self.vocabulary.ensure_matches(matrix.vocab_size()) {
            error!(%err, "cannot align against this posterior matrix");
            return ForcedAlignment::default();
        }

        let (plans, sequence) = self.plan_words(lyrics, language);
        if sequence.is_empty() {
            warn!(lines = lyrics.len(), "lyrics produced no phonemes");
            return ForcedAlignment::default();
        }

        let runs = self.ctc.align(matrix, &sequence);
        let phonemes = TimestampConverter::new(frame_duration_ms, offset_ms).convert(&runs);
        let words = self.place_words(&plans, &phonemes, offset_ms);
        let words = self.interpolator.interpolate(&words);
        let lines = assemble_lines(lyrics, words);
        debug!(
            lines = lines.len(),
            phonemes = sequence.len(),
            frames = matrix.num_frames(),
            "forced alignment complete"
        );
        ForcedAlignment { lines, phonemes }
    }

    fn plan_words(&self, lyrics: &[String], language: Language) -> (Vec<WordPlan>, Vec<usize>) {
        let mut plans = Vec::new();
        let mut sequence = Vec::new();
        for (line_index, line) in lyrics.iter().enumerate() {
            for word in line.split_whitespace() {
                let start = sequence.len();
                sequence.extend(self.encode_word(word, language));
                plans.push(WordPlan {
                    word: word.to_string(),
                    line_index,
                    phonemes: start..sequence.len(),
                });
            }
        }
        (plans, sequence)
    }

    /// Word spans come from the first and last runs of their phonemes. Words
    /// without phonemes sit at the previous word's end with zero confidence,
    /// which hands them to the interpolator.
    fn place_words(
        &self,
        plans: &[WordPlan],
        phonemes: &[TimestampedPhoneme],
        offset_ms: u64,
    ) -> Vec<WordAlignment> {
        let mut cursor = offset_ms;
        let mut words = Vec::with_capacity(plans.len());
        for plan in plans {
            let mut owned = phonemes
                .iter()
                .filter(|p| p.phoneme_index.is_some_and(|idx| plan.phonemes.contains(&idx)));
            let (start_ms, end_ms) = match owned.next() {
                Some(first) => {
                    let last = owned.last().unwrap_or(first);
                    (first.start_ms, last.end_ms.max(first.start_ms))
                }
                None => (cursor, cursor),
            };
            cursor = end_ms;
            words.push(WordAlignment {
                word: plan.word.clone(),
                start_ms,
                end_ms,
                confidence: 0.0,
                line_index: plan.line_index,
            });
        }
        let ranges: Vec<Range<usize>> = plans.iter().map(|plan| plan.phonemes.clone()).collect();
        self.confidence.word_confidence(&words, phonemes, &ranges)
    }
}

/// Groups words back into their lines. A line's span is the span of its
/// words; a line with no words sits where the previous one ended.
fn assemble_lines(lyrics: &[String], words: Vec<WordAlignment>) -> Vec<LineAlignment> {
    let mut grouped: Vec<Vec<WordAlignment>> = vec![Vec::new(); lyrics.len()];
    for word in words {
        if let Some(slot) = grouped.get_mut(word.line_index) {
            slot.push(word);
        }
    }

    let mut previous_end = 0;
    lyrics
        .iter()
        .zip(grouped)
        .map(|(text, words)| {
            let start_ms = words.iter().map(|w| w.start_ms).min().unwrap_or(previous_end);
            let end_ms = words.iter().map(|w| w.end_ms).max().unwrap_or(start_ms);
            previous_end = end_ms;
            LineAlignment {
                text: text.clone(),
                start_ms,
                end_ms,
                words,
            }
        })
        .collect()
}
