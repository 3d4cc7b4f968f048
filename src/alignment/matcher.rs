//! Coarse alignment from ASR transcript segments.
//!
//! Each lyric line greedily claims the run of upcoming segments whose joined
//! text is most similar to it. Lines that claim nothing are then placed
//! between their matched neighbours.

use std::ops::Range;

use tracing::debug;

use crate::config::MatcherConfig;
use crate::types::{AlignmentResult, Language, LineAlignment, TranscribedSegment};

/// Segments claimed by one lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatch {
    pub segments: Range<usize>,
    pub similarity: f32,
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptionMatcher {
    config: MatcherConfig,
}

impl TranscriptionMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Full alignment: every lyric line gets a span, matched or interpolated.
    pub fn match_segments(
        &self,
        segments: &[TranscribedSegment],
        lyrics: &[String],
        language: Language,
    ) -> AlignmentResult {
        if lyrics.is_empty() {
            return AlignmentResult::empty();
        }
        let matches = self.assign(segments, lyrics, language);
        let spans = self.interpolate_gaps(&matches);

        let lines = lyrics
            .iter()
            .zip(matches.iter().zip(spans))
            .enumerate()
            .map(|(idx, (text, (found, (start_ms, end_ms))))| {
                let confidence = found.as_ref().map_or(0.0, |m| m.similarity);
                LineAlignment::evenly_spaced(text, idx, start_ms, end_ms, confidence)
            })
            .collect();

        let matched: Vec<f32> = matches.iter().flatten().map(|m| m.similarity).collect();
        let overall = if matched.is_empty() {
            0.0
        } else {
            matched.iter().sum::<f32>() / matched.len() as f32
        };
        debug!(
            lines = lyrics.len(),
            matched = matched.len(),
            overall,
            "transcript matching complete"
        );
        AlignmentResult::from_lines(lines, overall)
    }

    /// Monotonic greedy assignment of segments to lines. Segments are never
    /// shared and the cursor only moves forward.
    pub fn assign(
        &self,
        segments: &[TranscribedSegment],
        lyrics: &[String],
        language: Language,
    ) -> Vec<Option<LineMatch>> {
        let mut matches = vec![None; lyrics.len()];
        let mut cursor = 0;
        for (idx, line) in lyrics.iter().enumerate() {
            if cursor >= segments.len() {
                break;
            }
            let target = normalize(line, language);
            if target.is_empty() {
                continue;
            }
            let Some((count, similarity)) = self.best_window(&segments[cursor..], &target, language)
            else {
                continue;
            };
            if similarity < self.config.accept_threshold {
                continue;
            }
            let claimed = cursor..cursor + count;
            matches[idx] = Some(LineMatch {
                start_ms: segments[claimed.start].start_ms,
                end_ms: segments[claimed.end - 1].end_ms,
                segments: claimed,
                similarity,
            });
            cursor += count;
        }
        matches
    }

    /// Best number of leading segments to join, and its similarity.
    fn best_window(
        &self,
        upcoming: &[TranscribedSegment],
        target: &str,
        language: Language,
    ) -> Option<(usize, f32)> {
        let lookahead = upcoming.len().min(self.config.max_lookahead);
        let mut joined = String::new();
        let mut best: Option<(usize, f32)> = None;
        for (offset, segment) in upcoming[..lookahead].iter().enumerate() {
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(segment.text.trim());
            let similarity = levenshtein_similarity(&normalize(&joined, language), target);
            let best_so_far = match best {
                Some((_, score)) if score >= similarity => score,
                _ => {
                    best = Some((offset + 1, similarity));
                    similarity
                }
            };
            if similarity >= 1.0 {
                break;
            }
            if best_so_far > self.config.good_match_threshold
                && similarity < best_so_far - self.config.drop_tolerance
            {
                break;
            }
        }
        best
    }

    /// Start and end for every line. Matched lines keep their span; runs of
    /// unmatched lines are spread across the room their neighbours leave.
    fn interpolate_gaps(&self, matches: &[Option<LineMatch>]) -> Vec<(u64, u64)> {
        let mut spans: Vec<Option<(u64, u64)>> = matches
            .iter()
            .map(|m| m.as_ref().map(|m| (m.start_ms, m.end_ms)))
            .collect();
        let anchors: Vec<usize> = (0..spans.len()).filter(|&i| spans[i].is_some()).collect();

        let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
            let step = self.config.fallback_line_ms;
            return (0..matches.len() as u64)
                .map(|i| (i * step, (i + 1) * step))
                .collect();
        };

        if first > 0 {
            let anchor_start = spans[first].map_or(0, |(start, _)| start);
            let step = anchor_start / first as u64;
            for (i, span) in spans[..first].iter_mut().enumerate() {
                let i = i as u64;
                *span = Some((i * step, (i + 1) * step));
            }
        }

        let anchor_end = spans[last].map_or(0, |(_, end)| end);
        let step = self.config.trailing_line_ms;
        for (offset, span) in spans[last + 1..].iter_mut().enumerate() {
            let offset = offset as u64;
            *span = Some((anchor_end + offset * step, anchor_end + (offset + 1) * step));
        }

        for pair in anchors.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let gap_lines = right - left - 1;
            if gap_lines == 0 {
                continue;
            }
            let left_end = spans[left].map_or(0, |(_, end)| end);
            let right_start = spans[right].map_or(left_end, |(start, _)| start);
            let per_line = right_start.saturating_sub(left_end) / gap_lines as u64;
            for g in 0..gap_lines as u64 {
                spans[left + 1 + g as usize] =
                    Some((left_end + g * per_line, left_end + (g + 1) * per_line));
            }
        }

        spans.into_iter().map(|span| span.unwrap_or((0, 0))).collect()
    }
}

/// Strips everything but letters, digits and whitespace. Korean drops all
/// whitespace, English lowercases, mixed does both.
pub fn normalize(text: &str, language: Language) -> String {
    let stripped: String = text
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect();
    let stripped = stripped.trim();
    match language {
        Language::Korean => stripped.chars().filter(|ch| !ch.is_whitespace()).collect(),
        Language::English => stripped.to_lowercase(),
        Language::Mixed => stripped
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_lowercase(),
    }
}

/// `1 - distance / longer length`, over characters.
pub fn levenshtein_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f32 / longest as f32
}

fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lyrics(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn similarity_edge_cases() {
        assert_eq!(levenshtein_similarity("", ""), 1.0);
        assert_eq!(levenshtein_similarity("abc", "abc"), 1.0);
        assert_eq!(levenshtein_similarity("abc", ""), 0.0);
        assert!((levenshtein_similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-6);
    }

    #[test]
    fn normalizes_per_language() {
        assert_eq!(normalize("사랑 해요!", Language::Korean), "사랑해요");
        assert_eq!(normalize("Hello, World", Language::English), "hello world");
        assert_eq!(normalize("Hi 사랑!", Language::Mixed), "hi사랑");
    }

    #[test]
    fn joins_split_segments_for_one_line() {
        let segments = vec![
            TranscribedSegment::new("hello", 1_000, 1_500),
            TranscribedSegment::new("world", 1_500, 2_000),
            TranscribedSegment::new("goodbye moon", 3_000, 4_000),
        ];
        let matches = TranscriptionMatcher::default().assign(
            &segments,
            &lyrics(&["hello world", "goodbye moon"]),
            Language::English,
        );
        let first = matches[0].as_ref().unwrap();
        assert_eq!(first.segments, 0..2);
        assert_eq!((first.start_ms, first.end_ms), (1_000, 2_000));
        assert_eq!(matches[1].as_ref().unwrap().segments, 2..3);
    }

    #[test]
    fn nothing_matched_spreads_fixed_steps() {
        let result = TranscriptionMatcher::default().match_segments(
            &[],
            &lyrics(&["a", "b", "c"]),
            Language::English,
        );
        let starts: Vec<_> = result.lines.iter().map(|l| l.start_ms).collect();
        assert_eq!(starts, [0, 2_000, 4_000]);
        assert_eq!(result.overall_confidence, 0.0);
    }

    #[test]
    fn lines_before_first_anchor_share_its_lead_in() {
        let segments = vec![TranscribedSegment::new("third line", 9_000, 10_000)];
        let result = TranscriptionMatcher::default().match_segments(
            &segments,
            &lyrics(&["zzz", "qqq", "third line"]),
            Language::English,
        );
        let spans: Vec<_> = result.lines.iter().map(|l| (l.start_ms, l.end_ms)).collect();
        assert_eq!(spans, [(0, 4_500), (4_500, 9_000), (9_000, 10_000)]);
    }
}
