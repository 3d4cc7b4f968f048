//! Drives one alignment pipeline end to end: cache lookup, per-chunk model
//! calls, stitching, caching and progress reporting.

pub mod backend;
pub mod cache;
pub mod progress;

use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::alignment::{
    ChunkAlignment, ChunkBoundaryConnector, CtcForcedAligner, LyricsAligner, TranscriptionMatcher,
};
use crate::config::{AlignerConfig, PipelineKind};
use crate::error::{AlignError, Result};
use crate::postprocess::{ConfidenceCalculator, TimestampedPhoneme};
use crate::types::{AlignmentResult, AudioChunk, Language, LineAlignment, TranscribedSegment};

use backend::{AcousticModel, AudioPreprocessor, Posteriors, Transcriber};
use cache::{AlignmentCache, CachedAlignment};

pub use progress::{AlignmentJob, AlignmentProgress};

/// Everything needed to align one track.
#[derive(Debug, Clone)]
pub struct AlignmentRequest {
    pub song_id: String,
    pub audio_path: PathBuf,
    pub lyrics: Vec<String>,
    pub language: Language,
}

#[derive(Clone)]
pub struct AlignmentOrchestrator {
    config: AlignerConfig,
    preprocessor: Arc<dyn AudioPreprocessor>,
    transcriber: Option<Arc<dyn Transcriber>>,
    acoustic_model: Option<Arc<dyn AcousticModel>>,
    cache: Arc<dyn AlignmentCache>,
}

impl AlignmentOrchestrator {
    pub fn new(
        config: AlignerConfig,
        preprocessor: Arc<dyn AudioPreprocessor>,
        cache: Arc<dyn AlignmentCache>,
    ) -> Self {
        Self {
            config,
            preprocessor,
            transcriber: None,
            acoustic_model: None,
            cache,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_acoustic_model(mut self, model: Arc<dyn AcousticModel>) -> Self {
        self.acoustic_model = Some(model);
        self
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Identifies everything that shapes a result: the preprocessor, the
    /// model of the active pipeline and the algorithm revision.
    pub fn pipeline_version(&self) -> String {
        let model = match self.config.pipeline {
            PipelineKind::Transcription => self.transcriber.as_ref().map(|t| t.model_id()),
            PipelineKind::Forced => self.acoustic_model.as_ref().map(|m| m.model_id()),
        };
        format!(
            "{}|{}|{}",
            self.preprocessor.model_id(),
            model.unwrap_or("none"),
            self.config.pipeline.tag()
        )
    }

    /// Cached result for `song_id` if it was produced by the current
    /// pipeline. A stale entry is deleted.
    pub fn cached_alignment(&self, song_id: &str) -> Result<Option<AlignmentResult>> {
        let version = self.pipeline_version();
        match self.cache.get(song_id)? {
            Some(entry) if entry.pipeline_version == version => Ok(Some(entry.result)),
            Some(entry) => {
                info!(
                    song_id,
                    cached = %entry.pipeline_version,
                    current = %version,
                    "dropping stale alignment"
                );
                self.cache.remove(song_id)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Cached result with the user's display offset applied.
    pub fn display_alignment(&self, song_id: &str) -> Result<Option<AlignmentResult>> {
        let Some(result) = self.cached_alignment(song_id)? else {
            return Ok(None);
        };
        let offset = self.cache.user_offset(song_id)?;
        Ok(Some(result.with_offset(offset)))
    }

    pub fn user_offset(&self, song_id: &str) -> Result<i64> {
        self.cache.user_offset(song_id)
    }

    pub fn set_user_offset(&self, song_id: &str, offset_ms: i64) -> Result<()> {
        self.cache.set_user_offset(song_id, offset_ms)
    }

    /// Runs [`run`](Self::run) on a worker thread.
    pub fn spawn(&self, request: AlignmentRequest) -> Result<AlignmentJob> {
        let (tx, rx) = channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker = self.clone();
        let flag = Arc::clone(&cancelled);
        let join = thread::Builder::new()
            .name(format!("align-{}", request.song_id))
            .spawn(move || {
                worker.run(&request, &flag, |event| {
                    let _ = tx.send(event);
                })
            })
            .map_err(|err| AlignError::io("spawning alignment worker", err))?;
        Ok(AlignmentJob::new(rx, cancelled, join))
    }

    /// Aligns one track on the calling thread, reporting through `emit`.
    ///
    /// Every outcome ends with either `Complete` or a `Failed` event whose
    /// `retries_left` is 0. Nothing is cached when the run is cancelled.
    pub fn run(
        &self,
        request: &AlignmentRequest,
        cancelled: &AtomicBool,
        mut emit: impl FnMut(AlignmentProgress),
    ) -> Result<AlignmentResult> {
        let song_id = request.song_id.as_str();
        if request.lyrics.is_empty() {
            let empty = AlignmentResult::empty();
            emit(AlignmentProgress::Complete(empty.clone()));
            return Ok(empty);
        }

        match self.cached_alignment(song_id) {
            Ok(Some(result)) => {
                info!(song_id, "alignment cache hit");
                emit(AlignmentProgress::Complete(result.clone()));
                return Ok(result);
            }
            Ok(None) => debug!(song_id, "alignment cache miss"),
            Err(err) => warn!(song_id, %err, "cache lookup failed; recomputing"),
        }

        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        loop {
            let outcome = self
                .compute(request, cancelled, &mut emit)
                .and_then(|result| {
                    if cancelled.load(Ordering::SeqCst) {
                        Err(AlignError::Cancelled)
                    } else {
                        Ok(result)
                    }
                });
            let err = match outcome {
                Ok(result) => {
                    let entry = CachedAlignment {
                        pipeline_version: self.pipeline_version(),
                        result,
                    };
                    if let Err(err) = self.cache.put(song_id, &entry) {
                        warn!(song_id, %err, "failed to cache alignment");
                    }
                    info!(
                        song_id,
                        lines = entry.result.lines.len(),
                        confidence = entry.result.overall_confidence,
                        "alignment complete"
                    );
                    emit(AlignmentProgress::Complete(entry.result.clone()));
                    return Ok(entry.result);
                }
                Err(err) => err,
            };

            let was_cancelled = err.is_cancellation();
            let retries_left = if was_cancelled {
                0
            } else {
                max_retries.saturating_sub(attempt)
            };
            error!(song_id, attempt, retries_left, %err, "alignment attempt failed");
            let shared = Arc::new(err);
            emit(AlignmentProgress::Failed {
                error: Arc::clone(&shared),
                retries_left,
            });
            if retries_left == 0 {
                if was_cancelled {
                    return Err(AlignError::Cancelled);
                }
                return Err(Arc::try_unwrap(shared)
                    .unwrap_or_else(|shared| AlignError::inference("aligning", shared)));
            }
            attempt += 1;
        }
    }

    fn compute(
        &self,
        request: &AlignmentRequest,
        cancelled: &AtomicBool,
        emit: &mut dyn FnMut(AlignmentProgress),
    ) -> Result<AlignmentResult> {
        let chunks = self.preprocessor.prepare(&request.audio_path)?;
        info!(
            song_id = %request.song_id,
            chunks = chunks.len(),
            pipeline = ?self.config.pipeline,
            "aligning track"
        );
        match self.config.pipeline {
            PipelineKind::Transcription => {
                self.transcription_pipeline(request, &chunks, cancelled, emit)
            }
            PipelineKind::Forced => self.forced_pipeline(request, &chunks, cancelled, emit),
        }
    }

    fn transcription_pipeline(
        &self,
        request: &AlignmentRequest,
        chunks: &[AudioChunk],
        cancelled: &AtomicBool,
        emit: &mut dyn FnMut(AlignmentProgress),
    ) -> Result<AlignmentResult> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| AlignError::config("transcription pipeline needs a transcriber"))?;
        let matcher = TranscriptionMatcher::new(self.config.matcher.clone());

        let mut segments: Vec<TranscribedSegment> = Vec::new();
        for chunk in chunks {
            check_cancelled(cancelled)?;
            emit(AlignmentProgress::Processing {
                chunk_index: chunk.index,
                total_chunks: chunks.len(),
            });
            let found = transcriber.transcribe(chunk, request.language)?;
            segments.extend(found.into_iter().map(|s| s.shifted(chunk.offset_ms)));

            let matches = matcher.assign(&segments, &request.lyrics, request.language);
            if let Some(last) = matches.iter().rposition(Option::is_some) {
                let so_far = matcher.match_segments(&segments, &request.lyrics, request.language);
                emit(AlignmentProgress::PartialResult {
                    lines: so_far.lines.into_iter().take(last + 1).collect(),
                });
            }
        }
        Ok(matcher.match_segments(&segments, &request.lyrics, request.language))
    }

    fn forced_pipeline(
        &self,
        request: &AlignmentRequest,
        chunks: &[AudioChunk],
        cancelled: &AtomicBool,
        emit: &mut dyn FnMut(AlignmentProgress),
    ) -> Result<AlignmentResult> {
        let model = self
            .acoustic_model
            .as_ref()
            .ok_or_else(|| AlignError::config("forced pipeline needs an acoustic model"))?;
        let aligner = LyricsAligner::new(&self.config);
        let ctc = CtcForcedAligner::default();

        let mut posteriors: Vec<Posteriors> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            check_cancelled(cancelled)?;
            emit(AlignmentProgress::Processing {
                chunk_index: chunk.index,
                total_chunks: chunks.len(),
            });
            let chunk_posteriors = model.posteriors(chunk)?;
            aligner
                .vocabulary()
                .ensure_matches(chunk_posteriors.matrix.vocab_size())?;
            posteriors.push(chunk_posteriors);
        }

        let vocal_frames: Vec<usize> = posteriors
            .iter()
            .zip(chunks)
            .map(|(p, chunk)| {
                let frames = p.matrix.num_frames();
                if ctc.is_blank_heavy(&p.matrix, 0..frames, self.config.blank_heavy_threshold) {
                    debug!(chunk = chunk.index, "chunk looks instrumental; skipping");
                    0
                } else {
                    (0..frames)
                        .filter(|&t| p.matrix.argmax(t) != ctc.blank_index())
                        .count()
                }
            })
            .collect();
        let phoneme_counts: Vec<usize> = request
            .lyrics
            .iter()
            .map(|line| aligner.phoneme_count(line, request.language))
            .collect();
        let weights = if vocal_frames.iter().any(|&v| v > 0) {
            vocal_frames
        } else {
            warn!(
                song_id = %request.song_id,
                "no vocal frames detected; spreading lines by length"
            );
            posteriors.iter().map(|p| p.matrix.num_frames()).collect()
        };
        let allocation = allocate_lines(&phoneme_counts, &weights);

        let mut stitched_chunks = Vec::with_capacity(chunks.len());
        let mut phonemes: Vec<TimestampedPhoneme> = Vec::new();
        let connector = ChunkBoundaryConnector::new(self.config.connector.clone());
        let planned = chunks.iter().zip(&posteriors).zip(allocation);
        for ((chunk, chunk_posteriors), lines) in planned {
            check_cancelled(cancelled)?;
            let lyrics = &request.lyrics[lines];
            if lyrics.is_empty() {
                stitched_chunks.push(ChunkAlignment::new(Vec::new(), chunk.offset_ms));
                continue;
            }
            let detailed = aligner.align_detailed(
                lyrics,
                &chunk_posteriors.matrix,
                chunk_posteriors.frame_duration_ms,
                0,
                request.language,
            );
            let chunk_lines = if detailed.lines.len() == lyrics.len() {
                detailed.lines
            } else {
                placeholder_lines(lyrics, chunk.duration_ms())
            };
            phonemes.extend(detailed.phonemes);
            stitched_chunks.push(ChunkAlignment::new(chunk_lines, chunk.offset_ms));

            emit(AlignmentProgress::PartialResult {
                lines: connector.connect(stitched_chunks.clone()),
            });
        }

        let lines = connector.connect(stitched_chunks);
        let overall = ConfidenceCalculator::new().overall(&phonemes);
        Ok(AlignmentResult::from_lines(lines, overall))
    }
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::SeqCst) {
        Err(AlignError::Cancelled)
    } else {
        Ok(())
    }
}

/// Splits lines into one contiguous range per chunk so that each chunk's
/// share of the phonemes tracks its share of the weights. A line goes to the
/// first chunk whose cumulative weight covers the line's midpoint; chunks
/// with zero weight receive nothing.
pub fn allocate_lines(phoneme_counts: &[usize], weights: &[usize]) -> Vec<Range<usize>> {
    let chunks = weights.len();
    if chunks == 0 {
        return Vec::new();
    }
    let total_weight: usize = weights.iter().sum();
    let total_phonemes: usize = phoneme_counts.iter().sum();
    let last_weighted = weights.iter().rposition(|&w| w > 0).unwrap_or(chunks - 1);

    let mut boundaries = Vec::with_capacity(chunks);
    let mut cumulative = 0usize;
    for &weight in weights {
        cumulative += weight;
        boundaries.push(if total_weight == 0 {
            0.0
        } else {
            total_phonemes as f64 * cumulative as f64 / total_weight as f64
        });
    }

    let mut owner = Vec::with_capacity(phoneme_counts.len());
    let mut before = 0usize;
    let mut chunk = 0usize;
    for &count in phoneme_counts {
        let midpoint = before as f64 + count as f64 / 2.0;
        while chunk < last_weighted && (weights[chunk] == 0 || midpoint > boundaries[chunk]) {
            chunk += 1;
        }
        owner.push(chunk);
        before += count;
    }

    (0..chunks)
        .map(|c| {
            let start = owner.iter().position(|&o| o >= c).unwrap_or(owner.len());
            let end = owner.iter().position(|&o| o > c).unwrap_or(owner.len());
            start..end
        })
        .collect()
}

/// Zero-confidence lines spread evenly over a chunk, for lines the aligner
/// could not place.
fn placeholder_lines(lyrics: &[String], duration_ms: u64) -> Vec<LineAlignment> {
    let count = lyrics.len().max(1) as u64;
    lyrics
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let idx_u = idx as u64;
            LineAlignment::evenly_spaced(
                text,
                idx,
                duration_ms * idx_u / count,
                duration_ms * (idx_u + 1) / count,
                0.0,
            )
        })
        .collect()
}
