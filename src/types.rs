//! Core types shared by the alignment pipelines

use serde::{Deserialize, Serialize};

use crate::postprocess::lrc::LrcGenerator;

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// A slice of the track handed to the acoustic model or transcriber.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub index: usize,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Position of the first sample in the source track.
    pub offset_ms: u64,
}

impl AudioChunk {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Language mode of a set of lyrics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Korean,
    English,
    Mixed,
}

/// Text segment produced by an ASR engine, timestamps in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribedSegment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TranscribedSegment {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms: end_ms.max(start_ms),
        }
    }

    pub fn shifted(mut self, offset_ms: u64) -> Self {
        self.start_ms += offset_ms;
        self.end_ms += offset_ms;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAlignment {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
    pub line_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAlignment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub words: Vec<WordAlignment>,
}

impl LineAlignment {
    /// Builds a line whose words evenly divide `[start_ms, end_ms]`.
    pub fn evenly_spaced(
        text: &str,
        line_index: usize,
        start_ms: u64,
        end_ms: u64,
        confidence: f32,
    ) -> Self {
        let end_ms = end_ms.max(start_ms);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let span = end_ms - start_ms;
        let count = tokens.len() as u64;
        let words = tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| {
                let idx = idx as u64;
                WordAlignment {
                    word: (*token).to_string(),
                    start_ms: start_ms + span * idx / count,
                    end_ms: start_ms + span * (idx + 1) / count,
                    confidence,
                    line_index,
                }
            })
            .collect();
        Self {
            text: text.to_string(),
            start_ms,
            end_ms,
            words,
        }
    }
}

/// Final alignment of a set of lyric lines against a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub lines: Vec<LineAlignment>,
    pub overall_confidence: f32,
    pub enhanced_lrc: String,
}

impl AlignmentResult {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            overall_confidence: 0.0,
            enhanced_lrc: String::new(),
        }
    }

    /// Assembles a result, rendering the LRC text from the line starts.
    pub fn from_lines(lines: Vec<LineAlignment>, overall_confidence: f32) -> Self {
        let enhanced_lrc = LrcGenerator::generate(&lines);
        Self {
            lines,
            overall_confidence: overall_confidence.clamp(0.0, 1.0),
            enhanced_lrc,
        }
    }

    /// All words in line order.
    pub fn words(&self) -> impl Iterator<Item = &WordAlignment> + '_ {
        self.lines.iter().flat_map(|line| line.words.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of the result with every timestamp shifted by `offset_ms`,
    /// saturating at zero. Used for display-time user offsets.
    pub fn with_offset(&self, offset_ms: i64) -> Self {
        if offset_ms == 0 {
            return self.clone();
        }
        let shift = |ms: u64| -> u64 { (ms as i64).saturating_add(offset_ms).max(0) as u64 };
        let lines = self
            .lines
            .iter()
            .map(|line| LineAlignment {
                text: line.text.clone(),
                start_ms: shift(line.start_ms),
                end_ms: shift(line.end_ms),
                words: line
                    .words
                    .iter()
                    .map(|word| WordAlignment {
                        start_ms: shift(word.start_ms),
                        end_ms: shift(word.end_ms),
                        ..word.clone()
                    })
                    .collect(),
            })
            .collect();
        Self::from_lines(lines, self.overall_confidence)
    }
}
