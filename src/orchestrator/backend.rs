//! Seams to the collaborators that turn audio into something alignable.

use std::path::Path;

use crate::alignment::LogProbMatrix;
use crate::error::Result;
use crate::types::{AudioChunk, Language, TranscribedSegment};

/// Decodes a track and cuts it into model-sized chunks.
pub trait AudioPreprocessor: Send + Sync {
    fn model_id(&self) -> &str;

    /// Chunks in track order, each carrying its offset into the track.
    fn prepare(&self, audio_path: &Path) -> Result<Vec<AudioChunk>>;
}

/// Speech recogniser producing timed text for one chunk.
pub trait Transcriber: Send + Sync {
    fn model_id(&self) -> &str;

    /// Segments with timestamps relative to the chunk start.
    fn transcribe(&self, chunk: &AudioChunk, language: Language) -> Result<Vec<TranscribedSegment>>;
}

/// Per-frame phoneme posteriors for one chunk.
#[derive(Debug, Clone)]
pub struct Posteriors {
    pub matrix: LogProbMatrix,
    pub frame_duration_ms: f32,
}

/// Acoustic model emitting posteriors over the phoneme vocabulary.
pub trait AcousticModel: Send + Sync {
    fn model_id(&self) -> &str;

    fn posteriors(&self, chunk: &AudioChunk) -> Result<Posteriors>;
}
