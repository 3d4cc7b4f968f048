//! Splits mixed Korean/English text into single-language runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentLanguage {
    Korean,
    English,
    Other,
}

/// A run of text in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub language: SegmentLanguage,
}

pub fn classify_char(ch: char) -> SegmentLanguage {
    match ch as u32 {
        0xAC00..=0xD7A3 | 0x1100..=0x11FF | 0x3130..=0x318F => SegmentLanguage::Korean,
        _ if ch.is_ascii_alphabetic() => SegmentLanguage::English,
        _ => SegmentLanguage::Other,
    }
}

/// Groups consecutive characters by language. Digits, punctuation and
/// whitespace never open a run of their own; they stay with the run in
/// progress (leading ones join the first run). Segments are trimmed.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<SegmentLanguage> = None;
    let mut buffer = String::new();

    for ch in text.chars() {
        let language = classify_char(ch);
        if language != SegmentLanguage::Other && Some(language) != current {
            if let Some(previous) = current {
                push_segment(&mut segments, &buffer, previous);
                buffer.clear();
            }
            current = Some(language);
        }
        buffer.push(ch);
    }

    if let Some(language) = current {
        push_segment(&mut segments, &buffer, language);
    }
    segments
}

fn push_segment(segments: &mut Vec<Segment>, text: &str, language: SegmentLanguage) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        segments.push(Segment {
            text: trimmed.to_string(),
            language,
        });
    }
}

/// Language with the most letters; ties with any Korean go to Korean.
pub fn dominant_language(text: &str) -> SegmentLanguage {
    let (mut korean, mut english) = (0usize, 0usize);
    for ch in text.chars() {
        match classify_char(ch) {
            SegmentLanguage::Korean => korean += 1,
            SegmentLanguage::English => english += 1,
            SegmentLanguage::Other => {}
        }
    }
    if english > korean {
        SegmentLanguage::English
    } else if korean > 0 {
        SegmentLanguage::Korean
    } else {
        SegmentLanguage::Other
    }
}
