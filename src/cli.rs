use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::alignment::PosteriorScale;
use crate::config::AlignerConfig;
use crate::postprocess::LrcGenerator;
use crate::types::{AlignmentResult, Language};

#[derive(Parser, Debug)]
#[command(
    name = "lyricsync",
    version,
    about = "Align song lyrics to audio and render synchronized LRC"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the phonemes produced for each word of TEXT.
    G2p(G2pArgs),
    /// Match ASR transcript segments (JSON) against lyric lines.
    Match(MatchArgs),
    /// Force-align lyric lines against a phoneme posterior matrix (JSON).
    ForceAlign(ForceAlignArgs),
    /// Align an audio file end to end, using the alignment cache.
    Align(AlignArgs),
    /// Parse an LRC file and print its lines as JSON.
    ParseLrc(ParseLrcArgs),
    /// Show or set the display offset stored for a song.
    Offset(OffsetArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `[mm:ss.xx] line` per line.
    Lrc,
    /// Line stamps plus `<mm:ss.xx>` before every word.
    WordLrc,
    /// The full alignment result.
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct LyricsArgs {
    /// Plain-text lyrics, one line per lyric line; blank lines are ignored.
    #[arg(long, value_name = "PATH")]
    pub lyrics: PathBuf,
    #[arg(long, value_enum, default_value_t = Language::Korean)]
    pub language: Language,
    /// Optional JSON file overriding alignment thresholds.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Lrc)]
    pub format: OutputFormat,
}

impl LyricsArgs {
    pub fn read_lyrics(&self) -> Result<Vec<String>> {
        read_lyrics(&self.lyrics)
    }

    pub fn aligner_config(&self) -> Result<AlignerConfig> {
        match &self.config {
            Some(path) => AlignerConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(AlignerConfig::default()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct G2pArgs {
    #[arg(long, value_enum, default_value_t = Language::Korean)]
    pub language: Language,
    #[arg(required = true, value_name = "TEXT")]
    pub text: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// JSON array of `{text, start_ms, end_ms}` segments in track time.
    #[arg(long, value_name = "PATH")]
    pub segments: PathBuf,
    #[command(flatten)]
    pub lyrics: LyricsArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ForceAlignArgs {
    /// JSON array of frames, each an array with one value per phoneme.
    #[arg(long, value_name = "PATH")]
    pub posteriors: PathBuf,
    /// Duration of one posterior frame.
    #[arg(long = "frame-ms", default_value_t = 20.0)]
    pub frame_ms: f32,
    #[arg(long, value_enum, default_value_t = PosteriorScale::Log)]
    pub scale: PosteriorScale,
    #[command(flatten)]
    pub lyrics: LyricsArgs,
}

impl ForceAlignArgs {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_ms > 0.0,
            "frame duration must be positive, got {}",
            self.frame_ms
        );
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Cache directory (defaults to $LYRICSYNC_CACHE_DIR or ./.lyricsync-cache).
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AlignArgs {
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,
    /// Cache key; defaults to the audio file name.
    #[arg(long = "song-id")]
    pub song_id: Option<String>,
    /// Whisper model file (falls back to $WHISPER_MODEL_PATH).
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,
    /// Apply the stored display offset to the output.
    #[arg(long = "apply-offset")]
    pub apply_offset: bool,
    #[command(flatten)]
    pub cache: CacheArgs,
    #[command(flatten)]
    pub lyrics: LyricsArgs,
}

impl AlignArgs {
    pub fn song_id(&self) -> String {
        self.song_id.clone().unwrap_or_else(|| {
            self.audio
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.audio.display().to_string())
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ParseLrcArgs {
    #[arg(value_name = "LRC")]
    pub input: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct OffsetArgs {
    #[arg(long = "song-id")]
    pub song_id: String,
    /// New offset in milliseconds; negative values shift lyrics earlier.
    #[arg(long, allow_hyphen_values = true)]
    pub set: Option<i64>,
    #[command(flatten)]
    pub cache: CacheArgs,
}

pub fn read_lyrics(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read lyrics from {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Renders a result in the requested format.
pub fn render(result: &AlignmentResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Lrc => result.enhanced_lrc.clone(),
        OutputFormat::WordLrc => LrcGenerator::generate_word_level(&result.lines),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("failed to encode alignment as JSON")?
        }
    })
}
