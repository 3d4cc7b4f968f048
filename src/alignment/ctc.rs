use std::ops::Range;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AlignError, Result};

use super::vocabulary::BLANK_INDEX;

/// Log-probabilities below this are treated as this value so that `ln(0)`
/// entries cannot make every path infeasible.
const LOG_PROB_FLOOR: f32 = -100.0;

const STAY: u8 = 0;
const ADVANCE: u8 = 1;
const SKIP_BLANK: u8 = 2;

/// How posterior values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PosteriorScale {
    #[default]
    Log,
    Linear,
}

/// Frame-major `[frames x vocabulary]` matrix of log-probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct LogProbMatrix {
    data: Array2<f32>,
}

impl LogProbMatrix {
    pub fn from_log_probs(data: Array2<f32>) -> Self {
        let mut data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        data.mapv_inplace(|value| {
            if value.is_nan() || value < LOG_PROB_FLOOR {
                LOG_PROB_FLOOR
            } else {
                value.min(0.0)
            }
        });
        Self { data }
    }

    pub fn from_probabilities(data: Array2<f32>) -> Self {
        Self::from_log_probs(data.mapv(|p| if p > 0.0 { p.ln() } else { LOG_PROB_FLOOR }))
    }

    pub fn from_scaled(data: Array2<f32>, scale: PosteriorScale) -> Self {
        match scale {
            PosteriorScale::Log => Self::from_log_probs(data),
            PosteriorScale::Linear => Self::from_probabilities(data),
        }
    }

    /// Builds a matrix from a flat frame-major buffer.
    pub fn from_flat(values: Vec<f32>, vocab_size: usize, scale: PosteriorScale) -> Result<Self> {
        if vocab_size == 0 {
            return Err(AlignError::invalid_input("vocabulary size must be positive"));
        }
        if values.len() % vocab_size != 0 {
            return Err(AlignError::invalid_input(format!(
                "{} posterior values do not divide into rows of {vocab_size}",
                values.len()
            )));
        }
        let frames = values.len() / vocab_size;
        let data = Array2::from_shape_vec((frames, vocab_size), values)
            .map_err(|err| AlignError::invalid_input(err.to_string()))?;
        Ok(Self::from_scaled(data, scale))
    }

    /// Builds a matrix from one row per frame.
    pub fn from_rows(rows: &[Vec<f32>], scale: PosteriorScale) -> Result<Self> {
        let vocab_size = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != vocab_size) {
            return Err(AlignError::invalid_input(
                "posterior rows have inconsistent widths",
            ));
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        if flat.is_empty() {
            return Ok(Self::from_log_probs(Array2::zeros((0, vocab_size))));
        }
        Self::from_flat(flat, vocab_size, scale)
    }

    pub fn num_frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn vocab_size(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Row-major backing storage; the constructors guarantee standard layout.
    fn flat(&self) -> &[f32] {
        self.data.as_slice().unwrap_or(&[])
    }

    /// Most likely class at `frame`; ties resolve to the lowest index.
    pub fn argmax(&self, frame: usize) -> usize {
        let vocab = self.vocab_size();
        let row = &self.flat()[frame * vocab..(frame + 1) * vocab];
        let mut best = 0;
        for (idx, &value) in row.iter().enumerate().skip(1) {
            if value > row[best] {
                best = idx;
            }
        }
        best
    }

    /// Copy of the frames in `range`, clamped to the matrix.
    pub fn slice_frames(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.num_frames());
        let start = range.start.min(end);
        Self {
            data: self.data.slice(ndarray::s![start..end, ..]).to_owned(),
        }
    }
}

/// One run of identical extended-label positions on the Viterbi path.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPhoneme {
    /// Position in the input phoneme sequence; `None` for blank runs.
    pub phoneme_index: Option<usize>,
    /// Vocabulary index of the emitted label.
    pub label: usize,
    pub start_frame: usize,
    /// Inclusive.
    pub end_frame: usize,
    pub confidence: f32,
    pub is_blank: bool,
}

impl AlignedPhoneme {
    pub fn frame_count(&self) -> usize {
        self.end_frame + 1 - self.start_frame
    }
}

/// Viterbi forced alignment of a phoneme sequence against CTC posteriors.
#[derive(Debug, Clone, Copy)]
pub struct CtcForcedAligner {
    blank_index: usize,
}

impl Default for CtcForcedAligner {
    fn default() -> Self {
        Self::new(BLANK_INDEX)
    }
}

impl CtcForcedAligner {
    pub fn new(blank_index: usize) -> Self {
        Self { blank_index }
    }

    pub fn blank_index(&self) -> usize {
        self.blank_index
    }

    /// Aligns `phonemes` (vocabulary indices, no blanks) to `matrix`.
    ///
    /// The returned runs are contiguous, in frame order, and together cover
    /// every frame exactly once. An empty sequence or matrix yields no runs.
    pub fn align(&self, matrix: &LogProbMatrix, phonemes: &[usize]) -> Vec<AlignedPhoneme> {
        let frames = matrix.num_frames();
        let vocab = matrix.vocab_size();
        if frames == 0 || phonemes.is_empty() {
            return Vec::new();
        }
        debug_assert!(phonemes
            .iter()
            .all(|&p| p < vocab && p != self.blank_index));

        let labels = self.extend_labels(phonemes);
        let (backpointers, final_scores) = self.forward(matrix, &labels);
        let path = match best_terminal(&final_scores) {
            Some(terminal) => traceback(&backpointers, labels.len(), frames, terminal),
            None => {
                warn!(
                    frames,
                    phonemes = phonemes.len(),
                    "no feasible CTC path; spreading phonemes evenly"
                );
                uniform_path(frames, phonemes.len())
            }
        };
        let runs = collapse_runs(&path, &labels, matrix);
        debug!(frames, runs = runs.len(), "ctc alignment complete");
        runs
    }

    /// Whether at least `threshold` of the frames in `frames` have blank as
    /// their most likely class. An empty range counts as blank.
    pub fn is_blank_heavy(
        &self,
        matrix: &LogProbMatrix,
        frames: Range<usize>,
        threshold: f32,
    ) -> bool {
        let end = frames.end.min(matrix.num_frames());
        if frames.start >= end {
            return true;
        }
        let blank_frames = (frames.start..end)
            .filter(|&t| matrix.argmax(t) == self.blank_index)
            .count();
        blank_frames as f32 / (end - frames.start) as f32 >= threshold
    }

    /// `[blank, p0, blank, p1, ..., pN, blank]`
    fn extend_labels(&self, phonemes: &[usize]) -> Vec<usize> {
        let mut labels = Vec::with_capacity(phonemes.len() * 2 + 1);
        labels.push(self.blank_index);
        for &phoneme in phonemes {
            labels.push(phoneme);
            labels.push(self.blank_index);
        }
        labels
    }

    /// Runs the Viterbi recursion, returning the flat `[frame x position]`
    /// backpointer table and the scores at the last frame.
    fn forward(&self, matrix: &LogProbMatrix, labels: &[usize]) -> (Vec<u8>, Vec<f32>) {
        let frames = matrix.num_frames();
        let vocab = matrix.vocab_size();
        let positions = labels.len();
        let emissions = matrix.flat();

        let mut prev = vec![f32::NEG_INFINITY; positions];
        let mut curr = vec![f32::NEG_INFINITY; positions];
        let mut backpointers = vec![STAY; frames * positions];

        prev[0] = emissions[labels[0]];
        if positions > 1 {
            prev[1] = emissions[labels[1]];
        }

        for t in 1..frames {
            let row = &emissions[t * vocab..(t + 1) * vocab];
            let bp_row = &mut backpointers[t * positions..(t + 1) * positions];
            // Position s needs at least (s - 1) / 2 + 1 frames to reach.
            let reachable = (2 * t + 1).min(positions - 1);
            for s in 0..=reachable {
                let (best, step) = self.best_transition(&prev, labels, s);
                curr[s] = best + row[labels[s]];
                bp_row[s] = step;
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        (backpointers, prev)
    }

    #[inline]
    fn best_transition(&self, prev: &[f32], labels: &[usize], s: usize) -> (f32, u8) {
        let mut best = prev[s];
        let mut step = STAY;
        if s >= 1 && prev[s - 1] > best {
            best = prev[s - 1];
            step = ADVANCE;
        }
        if s >= 2
            && labels[s] != self.blank_index
            && labels[s] != labels[s - 2]
            && prev[s - 2] > best
        {
            best = prev[s - 2];
            step = SKIP_BLANK;
        }
        (best, step)
    }
}

/// The better of the final phoneme and the trailing blank.
fn best_terminal(final_scores: &[f32]) -> Option<usize> {
    let last = final_scores.len() - 1;
    let terminal = if last >= 1 && final_scores[last - 1] > final_scores[last] {
        last - 1
    } else {
        last
    };
    final_scores[terminal].is_finite().then_some(terminal)
}

fn traceback(backpointers: &[u8], positions: usize, frames: usize, terminal: usize) -> Vec<usize> {
    let mut path = vec![0; frames];
    let mut s = terminal;
    path[frames - 1] = s;
    for t in (1..frames).rev() {
        s = match backpointers[t * positions + s] {
            ADVANCE => s - 1,
            SKIP_BLANK => s - 2,
            _ => s,
        };
        path[t - 1] = s;
    }
    path
}

/// Monotone path that gives every phoneme an equal share of the frames.
fn uniform_path(frames: usize, phonemes: usize) -> Vec<usize> {
    (0..frames)
        .map(|t| 2 * (t * phonemes / frames) + 1)
        .collect()
}

fn collapse_runs(path: &[usize], labels: &[usize], matrix: &LogProbMatrix) -> Vec<AlignedPhoneme> {
    let vocab = matrix.vocab_size();
    let emissions = matrix.flat();
    let mut runs = Vec::new();
    let mut start = 0;
    let mut sum = 0.0f32;

    for t in 0..path.len() {
        let position = path[t];
        sum += emissions[t * vocab + labels[position]];
        let run_ends = t + 1 == path.len() || path[t + 1] != position;
        if !run_ends {
            continue;
        }
        let is_blank = position % 2 == 0;
        let frame_count = t + 1 - start;
        runs.push(AlignedPhoneme {
            phoneme_index: (!is_blank).then_some(position / 2),
            label: labels[position],
            start_frame: start,
            end_frame: t,
            confidence: run_confidence(sum, frame_count, vocab),
            is_blank,
        });
        start = t + 1;
        sum = 0.0;
    }
    runs
}

/// Mean log-probability rescaled so the uniform distribution maps to 0 and
/// certainty maps to 1.
pub fn run_confidence(sum_log_prob: f32, frame_count: usize, vocab_size: usize) -> f32 {
    if frame_count == 0 {
        return 0.0;
    }
    let average = sum_log_prob / frame_count as f32;
    let uniform = -(vocab_size.max(2) as f32).ln();
    (1.0 - average / uniform).clamp(0.0, 1.0)
}
