//! Lyrics-to-audio alignment.
//!
//! Lyrics are aligned either by matching ASR transcript segments to lines
//! ([`alignment::TranscriptionMatcher`]) or by CTC forced alignment of their
//! G2P phonemes against acoustic posteriors ([`alignment::LyricsAligner`]).
//! [`orchestrator::AlignmentOrchestrator`] runs either one over a whole track
//! with caching and progress events.

pub mod alignment;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod g2p;
pub mod orchestrator;
pub mod postprocess;
#[cfg(feature = "whisper")]
pub mod transcription;
pub mod types;

pub use alignment::{LyricsAligner, TranscriptionMatcher};
pub use error::{AlignError, Result};
pub use types::{AlignmentResult, Language, LineAlignment, TranscribedSegment, WordAlignment};
