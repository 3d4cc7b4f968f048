use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

pub const CACHE_DIR_ENV: &str = "LYRICSYNC_CACHE_DIR";
const DEFAULT_CACHE_DIR: &str = ".lyricsync-cache";

/// Which strategy turns audio into line timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// ASR segments matched against lyric lines by edit distance.
    #[default]
    Transcription,
    /// Phoneme posteriors force-aligned against the G2P'd lyrics.
    Forced,
}

impl PipelineKind {
    pub fn tag(self) -> &'static str {
        match self {
            PipelineKind::Transcription => "transcription-v1",
            PipelineKind::Forced => "ctc-forced-v1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Most transcript segments a single line may absorb.
    pub max_lookahead: usize,
    /// Minimum similarity for a line to count as matched.
    pub accept_threshold: f32,
    /// Similarity above which a drop of `drop_tolerance` ends the search.
    pub good_match_threshold: f32,
    pub drop_tolerance: f32,
    /// Per-line duration for unmatched lines after the last match.
    pub trailing_line_ms: u64,
    /// Per-line duration when nothing matched at all.
    pub fallback_line_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_lookahead: 20,
            accept_threshold: 0.3,
            good_match_threshold: 0.8,
            drop_tolerance: 0.2,
            trailing_line_ms: 2_000,
            fallback_line_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Boundary gaps wider than this are split at their midpoint.
    pub max_gap_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self { max_gap_ms: 500 }
    }
}

/// Tunables for both alignment pipelines, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub pipeline: PipelineKind,
    pub matcher: MatcherConfig,
    pub connector: ConnectorConfig,
    /// Words below this confidence are re-timed from their neighbours.
    pub interpolation_threshold: f32,
    /// Fraction of blank frames above which a chunk is treated as instrumental.
    pub blank_heavy_threshold: f32,
    pub chunk_duration_ms: u64,
    pub sample_rate_hz: u32,
    /// Extra attempts after a failed run.
    pub max_retries: u32,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineKind::default(),
            matcher: MatcherConfig::default(),
            connector: ConnectorConfig::default(),
            interpolation_threshold: 0.3,
            blank_heavy_threshold: 0.8,
            chunk_duration_ms: 30_000,
            sample_rate_hz: 16_000,
            max_retries: 0,
        }
    }
}

impl AlignerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| AlignError::io("reading config", err))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|err| AlignError::json("parsing config", err))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let unit_fields = [
            ("matcher.accept_threshold", self.matcher.accept_threshold),
            ("matcher.good_match_threshold", self.matcher.good_match_threshold),
            ("matcher.drop_tolerance", self.matcher.drop_tolerance),
            ("interpolation_threshold", self.interpolation_threshold),
            ("blank_heavy_threshold", self.blank_heavy_threshold),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(AlignError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.matcher.max_lookahead == 0 {
            return Err(AlignError::config("matcher.max_lookahead must be positive"));
        }
        if self.chunk_duration_ms == 0 {
            return Err(AlignError::config("chunk_duration_ms must be positive"));
        }
        if self.sample_rate_hz == 0 {
            return Err(AlignError::config("sample_rate_hz must be positive"));
        }
        Ok(())
    }
}

/// Filesystem locations used by the CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cache_dir: PathBuf,
}

impl AppConfig {
    /// Explicit directory, then `LYRICSYNC_CACHE_DIR`, then `./.lyricsync-cache`.
    pub fn from_override(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let cache_dir = match path {
            Some(custom) => canonicalize_dir(&custom)?,
            None => std::env::var_os(CACHE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        };
        Ok(Self { cache_dir })
    }
}

fn canonicalize_dir(path: &Path) -> anyhow::Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve cache directory at {:?}", path))?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(anyhow!("cache path {:?} is not a directory", canonical))
    }
}
