use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lyricsync::alignment::{LogProbMatrix, LyricsAligner, TranscriptionMatcher};
use lyricsync::cli::{
    render, AlignArgs, Cli, Command, ForceAlignArgs, G2pArgs, MatchArgs, OffsetArgs, ParseLrcArgs,
};
use lyricsync::config::AppConfig;
use lyricsync::g2p::G2p;
use lyricsync::orchestrator::cache::{AlignmentCache, FileCache};
use lyricsync::postprocess::LrcParser;
use lyricsync::types::TranscribedSegment;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = match cli.command {
        Command::G2p(args) => handle_g2p(&args),
        Command::Match(args) => handle_match(&args),
        Command::ForceAlign(args) => handle_force_align(&args),
        Command::Align(args) => handle_align(&args),
        Command::ParseLrc(args) => handle_parse_lrc(&args),
        Command::Offset(args) => handle_offset(&args),
    }?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").context("failed to write output")?;
    Ok(())
}

fn handle_g2p(args: &G2pArgs) -> Result<String> {
    let g2p = G2p::new();
    Ok(args
        .text
        .iter()
        .flat_map(|text| text.split_whitespace())
        .map(|word| format!("{word}\t{}", g2p.convert(word, args.language).join(" ")))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn handle_match(args: &MatchArgs) -> Result<String> {
    let config = args.lyrics.aligner_config()?;
    let lyrics = args.lyrics.read_lyrics()?;
    let raw = fs::read_to_string(&args.segments)
        .with_context(|| format!("failed to read segments from {}", args.segments.display()))?;
    let segments: Vec<TranscribedSegment> = serde_json::from_str(&raw)
        .context("segments must be a JSON array of {text, start_ms, end_ms}")?;

    let result = TranscriptionMatcher::new(config.matcher).match_segments(
        &segments,
        &lyrics,
        args.lyrics.language,
    );
    info!(
        lines = result.lines.len(),
        confidence = result.overall_confidence,
        "matched transcript"
    );
    render(&result, args.lyrics.format)
}

fn handle_force_align(args: &ForceAlignArgs) -> Result<String> {
    args.validate()?;
    let config = args.lyrics.aligner_config()?;
    let lyrics = args.lyrics.read_lyrics()?;
    let raw = fs::read_to_string(&args.posteriors).with_context(|| {
        format!("failed to read posteriors from {}", args.posteriors.display())
    })?;
    let rows: Vec<Vec<f32>> =
        serde_json::from_str(&raw).context("posteriors must be a JSON array of frames")?;
    let matrix = LogProbMatrix::from_rows(&rows, args.scale)?;

    let result = LyricsAligner::new(&config).align(
        &lyrics,
        &matrix,
        args.frame_ms,
        args.lyrics.language,
    );
    info!(
        frames = matrix.num_frames(),
        lines = result.lines.len(),
        confidence = result.overall_confidence,
        "forced alignment finished"
    );
    render(&result, args.lyrics.format)
}

#[cfg(feature = "whisper")]
fn handle_align(args: &AlignArgs) -> Result<String> {
    use std::sync::atomic::AtomicBool;

    use lyricsync::audio::SymphoniaPreprocessor;
    use lyricsync::config::PipelineKind;
    use lyricsync::orchestrator::{AlignmentOrchestrator, AlignmentProgress, AlignmentRequest};
    use lyricsync::transcription::WhisperTranscriber;

    let mut config = args.lyrics.aligner_config()?;
    config.pipeline = PipelineKind::Transcription;
    let cache = open_cache(&args.cache)?;
    let transcriber = WhisperTranscriber::load(args.model.clone())?;
    let orchestrator = AlignmentOrchestrator::new(
        config.clone(),
        Arc::new(SymphoniaPreprocessor::from_config(&config)),
        cache,
    )
    .with_transcriber(Arc::new(transcriber));

    let request = AlignmentRequest {
        song_id: args.song_id(),
        audio_path: args.audio.clone(),
        lyrics: args.lyrics.read_lyrics()?,
        language: args.lyrics.language,
    };
    let cancelled = AtomicBool::new(false);
    let result = orchestrator.run(&request, &cancelled, |event| match event {
        AlignmentProgress::Processing {
            chunk_index,
            total_chunks,
        } => info!(chunk = chunk_index + 1, total = total_chunks, "processing chunk"),
        AlignmentProgress::Failed {
            error,
            retries_left,
        } => tracing::warn!(%error, retries_left, "alignment attempt failed"),
        _ => {}
    })?;

    let result = if args.apply_offset {
        result.with_offset(orchestrator.user_offset(&request.song_id)?)
    } else {
        result
    };
    render(&result, args.lyrics.format)
}

#[cfg(not(feature = "whisper"))]
fn handle_align(_args: &AlignArgs) -> Result<String> {
    anyhow::bail!("the align command needs a transcriber; rebuild with `--features whisper`")
}

fn handle_parse_lrc(args: &ParseLrcArgs) -> Result<String> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let lines = LrcParser::parse(&raw);
    serde_json::to_string_pretty(&lines).context("failed to encode lines as JSON")
}

fn handle_offset(args: &OffsetArgs) -> Result<String> {
    let cache = open_cache(&args.cache)?;
    if let Some(offset) = args.set {
        cache.set_user_offset(&args.song_id, offset)?;
        info!(song_id = %args.song_id, offset, "display offset stored");
    }
    Ok(cache.user_offset(&args.song_id)?.to_string())
}

fn open_cache(args: &lyricsync::cli::CacheArgs) -> Result<Arc<FileCache>> {
    let dir = match &args.cache_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create cache directory {}", dir.display()))?;
            Some(dir.clone())
        }
        None => None,
    };
    let app = AppConfig::from_override(dir)?;
    Ok(Arc::new(FileCache::open(app.cache_dir)?))
}
