use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use lyricsync::alignment::{LogProbMatrix, LyricsAligner, PhonemeVocabulary};
use lyricsync::config::{AlignerConfig, PipelineKind};
use lyricsync::orchestrator::backend::{AcousticModel, AudioPreprocessor, Posteriors, Transcriber};
use lyricsync::orchestrator::cache::{AlignmentCache, CachedAlignment, FileCache, MemoryCache};
use lyricsync::orchestrator::{AlignmentOrchestrator, AlignmentProgress, AlignmentRequest};
use lyricsync::types::AudioChunk;
use lyricsync::{AlignError, AlignmentResult, Language, LineAlignment, TranscribedSegment};
use ndarray::Array2;

const CHUNK_MS: u64 = 30_000;

struct FakePreprocessor {
    chunks: usize,
    chunk_ms: u64,
}

impl AudioPreprocessor for FakePreprocessor {
    fn model_id(&self) -> &str {
        "fake-pre"
    }

    fn prepare(&self, _audio_path: &Path) -> lyricsync::Result<Vec<AudioChunk>> {
        Ok((0..self.chunks)
            .map(|index| AudioChunk {
                index,
                samples: vec![0.0; (self.chunk_ms * 16) as usize],
                sample_rate: 16_000,
                offset_ms: index as u64 * self.chunk_ms,
            })
            .collect())
    }
}

/// Returns canned chunk-local segments, failing the first `failures` calls.
struct FakeTranscriber {
    per_chunk: Vec<Vec<TranscribedSegment>>,
    failures: AtomicUsize,
    calls: AtomicUsize,
    cancel_on_first_call: Option<Arc<AtomicBool>>,
}

impl FakeTranscriber {
    fn new(per_chunk: Vec<Vec<TranscribedSegment>>) -> Self {
        Self {
            per_chunk,
            failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            cancel_on_first_call: None,
        }
    }

    fn failing(mut self, times: usize) -> Self {
        self.failures = AtomicUsize::new(times);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcriber for FakeTranscriber {
    fn model_id(&self) -> &str {
        "fake-asr"
    }

    fn transcribe(
        &self,
        chunk: &AudioChunk,
        _language: Language,
    ) -> lyricsync::Result<Vec<TranscribedSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.cancel_on_first_call {
            flag.store(true, Ordering::SeqCst);
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AlignError::inference("transcribing", "model crashed"));
        }
        Ok(self.per_chunk.get(chunk.index).cloned().unwrap_or_default())
    }
}

fn two_chunk_transcript() -> Vec<Vec<TranscribedSegment>> {
    vec![
        vec![TranscribedSegment::new("hello world", 1_000, 3_000)],
        vec![TranscribedSegment::new("goodbye", 2_000, 4_000)],
    ]
}

fn request(song_id: &str) -> AlignmentRequest {
    AlignmentRequest {
        song_id: song_id.to_string(),
        audio_path: PathBuf::from("song.flac"),
        lyrics: vec!["hello world".to_string(), "goodbye".to_string()],
        language: Language::English,
    }
}

fn orchestrator(
    config: AlignerConfig,
    transcriber: Arc<FakeTranscriber>,
    cache: Arc<dyn AlignmentCache>,
) -> AlignmentOrchestrator {
    let preprocessor = Arc::new(FakePreprocessor {
        chunks: 2,
        chunk_ms: CHUNK_MS,
    });
    AlignmentOrchestrator::new(config, preprocessor, cache).with_transcriber(transcriber)
}

fn run_collecting(
    orchestrator: &AlignmentOrchestrator,
    request: &AlignmentRequest,
) -> (lyricsync::Result<AlignmentResult>, Vec<AlignmentProgress>) {
    let mut events = Vec::new();
    let cancelled = AtomicBool::new(false);
    let outcome = orchestrator.run(request, &cancelled, |event| events.push(event));
    (outcome, events)
}

fn kind(event: &AlignmentProgress) -> String {
    match event {
        AlignmentProgress::Processing { chunk_index, .. } => format!("processing {chunk_index}"),
        AlignmentProgress::PartialResult { lines } => format!("partial {}", lines.len()),
        AlignmentProgress::Complete(_) => "complete".to_string(),
        AlignmentProgress::Failed { retries_left, .. } => format!("failed {retries_left}"),
    }
}

#[test]
fn transcription_run_reports_progress_and_fills_the_cache() {
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()));
    let cache = Arc::new(MemoryCache::new());
    let orchestrator = orchestrator(AlignerConfig::default(), transcriber.clone(), cache.clone());
    assert_eq!(
        orchestrator.pipeline_version(),
        "fake-pre|fake-asr|transcription-v1"
    );

    let (outcome, events) = run_collecting(&orchestrator, &request("song"));
    let result = outcome.unwrap();
    let kinds: Vec<String> = events.iter().map(kind).collect();
    assert_eq!(
        kinds,
        ["processing 0", "partial 1", "processing 1", "partial 2", "complete"]
    );
    assert_eq!((result.lines[0].start_ms, result.lines[0].end_ms), (1_000, 3_000));
    assert_eq!((result.lines[1].start_ms, result.lines[1].end_ms), (32_000, 34_000));

    let stored = cache.get("song").unwrap().unwrap();
    assert_eq!(stored.pipeline_version, orchestrator.pipeline_version());
    assert_eq!(stored.result, result);

    let (again, events) = run_collecting(&orchestrator, &request("song"));
    assert_eq!(again.unwrap(), result);
    assert_eq!(events.iter().map(kind).collect::<Vec<_>>(), ["complete"]);
    assert_eq!(transcriber.calls(), 2);
}

#[test]
fn stale_entries_are_dropped_and_recomputed() {
    let cache = Arc::new(MemoryCache::new());
    let stale = CachedAlignment {
        pipeline_version: "old-pre|old-asr|transcription-v0".to_string(),
        result: AlignmentResult::from_lines(
            vec![LineAlignment::evenly_spaced("hello world", 0, 0, 10, 1.0)],
            1.0,
        ),
    };
    cache.put("song", &stale).unwrap();

    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()));
    let orchestrator = orchestrator(AlignerConfig::default(), transcriber.clone(), cache.clone());
    assert!(orchestrator.cached_alignment("song").unwrap().is_none());
    assert!(cache.get("song").unwrap().is_none());

    let result = orchestrator.run(&request("song"), &AtomicBool::new(false), |_| {}).unwrap();
    assert_eq!(result.lines.len(), 2);
    assert_eq!(transcriber.calls(), 2);
}

#[test]
fn failed_attempts_are_retried() {
    let mut config = AlignerConfig::default();
    config.max_retries = 2;
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()).failing(1));
    let orchestrator = orchestrator(config, transcriber.clone(), Arc::new(MemoryCache::new()));

    let (outcome, events) = run_collecting(&orchestrator, &request("song"));
    assert!(outcome.is_ok());
    let kinds: Vec<String> = events.iter().map(kind).collect();
    assert_eq!(kinds[..2], ["processing 0", "failed 2"]);
    assert_eq!(kinds.last().map(String::as_str), Some("complete"));
    assert_eq!(transcriber.calls(), 3);
}

#[test]
fn exhausted_retries_end_with_a_terminal_failure() {
    let mut config = AlignerConfig::default();
    config.max_retries = 1;
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()).failing(10));
    let cache = Arc::new(MemoryCache::new());
    let orchestrator = orchestrator(config, transcriber, cache.clone());

    let (outcome, events) = run_collecting(&orchestrator, &request("song"));
    assert!(matches!(outcome, Err(AlignError::Inference { .. })));
    let failures: Vec<String> = events
        .iter()
        .filter(|event| matches!(event, AlignmentProgress::Failed { .. }))
        .map(kind)
        .collect();
    assert_eq!(failures, ["failed 1", "failed 0"]);
    assert!(events.last().unwrap().is_terminal());
    assert!(cache.get("song").unwrap().is_none());
}

#[test]
fn cancellation_stops_before_the_next_chunk_and_caches_nothing() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut fake = FakeTranscriber::new(two_chunk_transcript());
    fake.cancel_on_first_call = Some(Arc::clone(&flag));
    let transcriber = Arc::new(fake);
    let cache = Arc::new(MemoryCache::new());
    let orchestrator = orchestrator(AlignerConfig::default(), transcriber.clone(), cache.clone());

    let outcome = orchestrator.run(&request("song"), &flag, |_| {});
    let err = outcome.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(transcriber.calls(), 1);
    assert!(cache.get("song").unwrap().is_none());
}

#[test]
fn empty_lyrics_complete_immediately() {
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()));
    let orchestrator = orchestrator(
        AlignerConfig::default(),
        transcriber.clone(),
        Arc::new(MemoryCache::new()),
    );
    let mut empty = request("song");
    empty.lyrics.clear();
    let (outcome, events) = run_collecting(&orchestrator, &empty);
    assert!(outcome.unwrap().is_empty());
    assert_eq!(events.iter().map(kind).collect::<Vec<_>>(), ["complete"]);
    assert_eq!(transcriber.calls(), 0);
}

#[test]
fn spawned_job_streams_events_and_returns_the_result() {
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()));
    let orchestrator = orchestrator(
        AlignerConfig::default(),
        transcriber,
        Arc::new(MemoryCache::new()),
    );
    let job = orchestrator.spawn(request("song")).unwrap();
    let events: Vec<AlignmentProgress> = job.events().iter().collect();
    assert!(matches!(events.last(), Some(AlignmentProgress::Complete(_))));
    assert_eq!(job.wait().unwrap().lines.len(), 2);
}

#[test]
fn file_cache_persists_results_and_display_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let transcriber = Arc::new(FakeTranscriber::new(two_chunk_transcript()));
    let first = orchestrator(
        AlignerConfig::default(),
        transcriber,
        Arc::new(FileCache::open(dir.path()).unwrap()),
    );
    let result = first.run(&request("album/track 1"), &AtomicBool::new(false), |_| {}).unwrap();
    first.set_user_offset("album/track 1", -500).unwrap();

    let fresh = Arc::new(FakeTranscriber::new(Vec::new()));
    let second = orchestrator(
        AlignerConfig::default(),
        fresh.clone(),
        Arc::new(FileCache::open(dir.path()).unwrap()),
    );
    assert_eq!(second.cached_alignment("album/track 1").unwrap(), Some(result.clone()));
    assert_eq!(second.user_offset("album/track 1").unwrap(), -500);

    let shown = second.display_alignment("album/track 1").unwrap().unwrap();
    assert_eq!(shown.lines[0].start_ms, result.lines[0].start_ms - 500);
    assert_eq!(shown.lines[1].start_ms, result.lines[1].start_ms - 500);
    assert_eq!(second.cached_alignment("album/track 1").unwrap(), Some(result));
    assert_eq!(fresh.calls(), 0);
}

/// Posteriors with sharp peaks for the given phoneme spans, blank elsewhere.
struct FakeAcousticModel {
    per_chunk: Vec<Vec<(usize, std::ops::Range<usize>)>>,
    frames: usize,
}

impl AcousticModel for FakeAcousticModel {
    fn model_id(&self) -> &str {
        "fake-am"
    }

    fn posteriors(&self, chunk: &AudioChunk) -> lyricsync::Result<Posteriors> {
        let vocab = PhonemeVocabulary::shared().len();
        let peak = 0.9;
        let floor = (1.0 - peak) / (vocab - 1) as f32;
        let mut data = Array2::from_elem((self.frames, vocab), floor);
        let spans = self.per_chunk.get(chunk.index).cloned().unwrap_or_default();
        for t in 0..self.frames {
            let class = spans
                .iter()
                .find(|(_, range)| range.contains(&t))
                .map_or(0, |(class, _)| *class);
            data[[t, class]] = peak;
        }
        Ok(Posteriors {
            matrix: LogProbMatrix::from_probabilities(data),
            frame_duration_ms: 20.0,
        })
    }
}

#[test]
fn forced_pipeline_places_lines_in_their_chunks() {
    let aligner = LyricsAligner::default();
    let love = aligner.encode_word("love", Language::English);
    let me = aligner.encode_word("me", Language::English);
    assert_eq!((love.len(), me.len()), (3, 2));

    // 100 frames of 20ms per chunk; "love" early in chunk 0, "me" early in chunk 1.
    let model = FakeAcousticModel {
        per_chunk: vec![
            vec![(love[0], 10..20), (love[1], 20..30), (love[2], 30..40)],
            vec![(me[0], 10..25), (me[1], 25..40)],
        ],
        frames: 100,
    };
    let mut config = AlignerConfig::default();
    config.pipeline = PipelineKind::Forced;
    let preprocessor = Arc::new(FakePreprocessor {
        chunks: 2,
        chunk_ms: 2_000,
    });
    let orchestrator =
        AlignmentOrchestrator::new(config, preprocessor, Arc::new(MemoryCache::new()))
            .with_acoustic_model(Arc::new(model));
    assert_eq!(orchestrator.pipeline_version(), "fake-pre|fake-am|ctc-forced-v1");

    let mut request = request("forced");
    request.lyrics = vec!["love".to_string(), "me".to_string()];
    let (outcome, events) = run_collecting(&orchestrator, &request);
    let result = outcome.unwrap();

    assert_eq!(result.lines.len(), 2);
    assert!(result.lines[0].start_ms.abs_diff(200) <= 40);
    assert!(result.lines[1].start_ms > result.lines[0].end_ms.saturating_sub(1));
    assert!((1_400..=2_240).contains(&result.lines[1].start_ms));
    assert!(result.overall_confidence > 0.5);
    let kinds: Vec<String> = events.iter().map(kind).collect();
    assert_eq!(
        kinds,
        ["processing 0", "processing 1", "partial 1", "partial 2", "complete"]
    );
}
