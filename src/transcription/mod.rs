//! Whisper-backed [`Transcriber`].
//!
//! The model path comes from the caller or `WHISPER_MODEL_PATH`, falling back
//! to `./models/ggml-base.bin`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::{self, AlignError};
use crate::orchestrator::backend::Transcriber;
use crate::types::{AudioChunk, Language, TranscribedSegment};

pub const MODEL_PATH_ENV: &str = "WHISPER_MODEL_PATH";
const DEFAULT_MODEL_PATH: &str = "./models/ggml-base.bin";

pub struct WhisperTranscriber {
    context: WhisperContext,
    model_id: String,
}

impl WhisperTranscriber {
    pub fn load(model_path: Option<PathBuf>) -> Result<Self> {
        let path = model_path
            .or_else(|| std::env::var_os(MODEL_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let path_str = path
            .to_str()
            .with_context(|| format!("model path {} is not valid UTF-8", path.display()))?;
        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .with_context(|| format!("failed to load Whisper model from {}", path.display()))?;
        info!(model = %path.display(), "whisper model loaded");
        Ok(Self {
            context,
            model_id: model_id_for(&path),
        })
    }

    fn run(&self, chunk: &AudioChunk, language: Language) -> Result<Vec<TranscribedSegment>> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language_code(language)));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self
            .context
            .create_state()
            .context("failed to create Whisper state")?;
        state
            .full(params, &chunk.samples)
            .context("whisper inference failed")?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment
                .to_str()
                .context("whisper segment is not valid UTF-8")?
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            // Whisper reports centiseconds.
            let start_ms = segment.start_timestamp().max(0) as u64 * 10;
            let end_ms = segment.end_timestamp().max(0) as u64 * 10;
            segments.push(TranscribedSegment::new(text, start_ms, end_ms));
        }
        debug!(chunk = chunk.index, segments = segments.len(), "chunk transcribed");
        Ok(segments)
    }
}

impl Transcriber for WhisperTranscriber {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn transcribe(
        &self,
        chunk: &AudioChunk,
        language: Language,
    ) -> error::Result<Vec<TranscribedSegment>> {
        self.run(chunk, language)
            .map_err(|err| AlignError::inference("transcribing chunk", format!("{err:#}")))
    }
}

fn language_code(language: Language) -> &'static str {
    match language {
        Language::Korean => "ko",
        Language::English => "en",
        Language::Mixed => "auto",
    }
}

fn model_id_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("whisper");
    format!("whisper:{stem}")
}
