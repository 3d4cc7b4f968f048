//! Stitching of per-chunk alignments into one track timeline.

use tracing::trace;

use crate::config::ConnectorConfig;
use crate::types::{LineAlignment, WordAlignment};

/// Lines aligned against one chunk, timestamps relative to the chunk start.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAlignment {
    pub lines: Vec<LineAlignment>,
    pub offset_ms: u64,
}

impl ChunkAlignment {
    pub fn new(lines: Vec<LineAlignment>, offset_ms: u64) -> Self {
        Self { lines, offset_ms }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkBoundaryConnector {
    config: ConnectorConfig,
}

impl ChunkBoundaryConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    /// Shifts every chunk onto the track timeline, renumbers line indices and
    /// closes the gap at each boundary. A lone chunk is returned untouched.
    pub fn connect(&self, chunks: Vec<ChunkAlignment>) -> Vec<LineAlignment> {
        if chunks.len() <= 1 {
            return chunks.into_iter().flat_map(|chunk| chunk.lines).collect();
        }

        let mut stitched: Vec<LineAlignment> = Vec::new();
        for chunk in chunks {
            let line_base = stitched.len();
            let mut incoming: Vec<LineAlignment> = chunk
                .lines
                .into_iter()
                .map(|line| shift_line(line, chunk.offset_ms, line_base))
                .collect();
            if !stitched.is_empty() && !incoming.is_empty() {
                self.join_words(&mut stitched, &mut incoming);
                self.join_lines(&mut stitched, &mut incoming);
            }
            stitched.append(&mut incoming);
        }
        stitched
    }

    fn join_words(&self, before: &mut [LineAlignment], after: &mut [LineAlignment]) {
        let prev = before.iter_mut().rev().find_map(|line| line.words.last_mut());
        let next = after.iter_mut().find_map(|line| line.words.first_mut());
        if let (Some(prev), Some(next)) = (prev, next) {
            let (end, start) = self.close_gap(prev.end_ms, next.start_ms);
            prev.end_ms = end;
            next.start_ms = start.min(next.end_ms);
        }
    }

    fn join_lines(&self, before: &mut [LineAlignment], after: &mut [LineAlignment]) {
        let (Some(prev), Some(next)) = (before.last_mut(), after.first_mut()) else {
            return;
        };
        let (end, start) = self.close_gap(prev.end_ms, next.start_ms);
        prev.end_ms = end;
        next.start_ms = start.min(next.end_ms);
        if let Some(first) = next.words.first() {
            next.start_ms = next.start_ms.min(first.start_ms);
        }
    }

    /// Wide gaps meet at their midpoint; narrow ones are absorbed by the
    /// earlier span. Overlaps are left alone.
    fn close_gap(&self, prev_end: u64, next_start: u64) -> (u64, u64) {
        if next_start <= prev_end {
            return (prev_end, next_start);
        }
        let gap = next_start - prev_end;
        if gap > self.config.max_gap_ms {
            let mid = prev_end + gap / 2;
            trace!(gap, mid, "splitting chunk boundary gap");
            (mid, mid)
        } else {
            (next_start, next_start)
        }
    }
}

fn shift_line(line: LineAlignment, offset_ms: u64, line_base: usize) -> LineAlignment {
    LineAlignment {
        start_ms: line.start_ms + offset_ms,
        end_ms: line.end_ms + offset_ms,
        words: line
            .words
            .into_iter()
            .map(|word| WordAlignment {
                start_ms: word.start_ms + offset_ms,
                end_ms: word.end_ms + offset_ms,
                line_index: word.line_index + line_base,
                ..word
            })
            .collect(),
        ..line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, start_ms: u64, end_ms: u64, offset_ms: u64) -> ChunkAlignment {
        ChunkAlignment::new(
            vec![LineAlignment::evenly_spaced(text, 0, start_ms, end_ms, 0.9)],
            offset_ms,
        )
    }

    #[test]
    fn single_chunk_passes_through() {
        let only = chunk("one two", 100, 900, 5_000);
        let out = ChunkBoundaryConnector::default().connect(vec![only.clone()]);
        assert_eq!(out, only.lines);
    }

    #[test]
    fn empty_input_gives_nothing() {
        assert!(ChunkBoundaryConnector::default().connect(Vec::new()).is_empty());
    }

    #[test]
    fn wide_gap_meets_in_the_middle() {
        let out = ChunkBoundaryConnector::default().connect(vec![
            chunk("a b", 0, 26_000, 0),
            chunk("c d", 0, 4_000, 30_000),
        ]);
        let first_end = out[0].words[1].end_ms;
        let second_start = out[1].words[0].start_ms;
        assert_eq!(first_end, 28_000);
        assert_eq!(second_start, 28_000);
        assert_eq!(out[1].words[0].line_index, 1);
        assert_eq!(out[1].start_ms, 28_000);
    }

    #[test]
    fn narrow_gap_extends_previous_word() {
        let out = ChunkBoundaryConnector::default().connect(vec![
            chunk("a", 0, 29_800, 0),
            chunk("b", 0, 1_000, 30_000),
        ]);
        assert_eq!(out[0].words[0].end_ms, 30_000);
        assert_eq!(out[1].words[0].start_ms, 30_000);
    }
}
