//! Decoding and chunking of source tracks.

pub mod decoder;
pub mod resample;
pub mod slicer;

use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::AlignerConfig;
use crate::error::{AlignError, Result};
use crate::orchestrator::backend::AudioPreprocessor;
use crate::types::AudioChunk;

pub use decoder::decode_file;
pub use resample::{linear_resample, to_sample_rate};
pub use slicer::split_into_chunks;

/// Symphonia decode, mono downmix, linear resample, fixed-length chunks.
#[derive(Debug, Clone)]
pub struct SymphoniaPreprocessor {
    sample_rate_hz: u32,
    chunk_duration_ms: u64,
}

impl Default for SymphoniaPreprocessor {
    fn default() -> Self {
        Self::from_config(&AlignerConfig::default())
    }
}

impl SymphoniaPreprocessor {
    pub fn new(sample_rate_hz: u32, chunk_duration_ms: u64) -> Self {
        Self {
            sample_rate_hz,
            chunk_duration_ms,
        }
    }

    pub fn from_config(config: &AlignerConfig) -> Self {
        Self::new(config.sample_rate_hz, config.chunk_duration_ms)
    }

    fn load(&self, audio_path: &Path) -> anyhow::Result<Vec<AudioChunk>> {
        let decoded = decode_file(audio_path)?;
        let audio = to_sample_rate(decoded, self.sample_rate_hz)
            .with_context(|| format!("failed to resample {}", audio_path.display()))?;
        let chunks = split_into_chunks(&audio, self.chunk_duration_ms);
        info!(
            path = %audio_path.display(),
            duration_ms = audio.duration_ms(),
            chunks = chunks.len(),
            "audio prepared"
        );
        Ok(chunks)
    }
}

impl AudioPreprocessor for SymphoniaPreprocessor {
    fn model_id(&self) -> &str {
        "symphonia-linear"
    }

    fn prepare(&self, audio_path: &Path) -> Result<Vec<AudioChunk>> {
        self.load(audio_path)
            .map_err(|err| AlignError::audio("preparing audio", format!("{err:#}")))
    }
}
