use lyricsync::alignment::{ChunkAlignment, ChunkBoundaryConnector};
use lyricsync::LineAlignment;

fn chunk(lines: &[(&str, u64, u64)], offset_ms: u64) -> ChunkAlignment {
    let lines = lines
        .iter()
        .enumerate()
        .map(|(idx, (text, start, end))| LineAlignment::evenly_spaced(text, idx, *start, *end, 0.8))
        .collect();
    ChunkAlignment::new(lines, offset_ms)
}

fn assert_monotonic(lines: &[LineAlignment]) {
    for pair in lines.windows(2) {
        assert!(pair[0].start_ms <= pair[1].start_ms);
    }
    let words: Vec<_> = lines.iter().flat_map(|line| &line.words).collect();
    for pair in words.windows(2) {
        assert!(pair[0].start_ms <= pair[1].start_ms);
        assert!(pair[0].end_ms <= pair[1].end_ms);
    }
}

#[test]
fn wide_boundary_gap_is_closed() {
    let out = ChunkBoundaryConnector::default().connect(vec![
        chunk(&[("first verse", 2_000, 26_000)], 0),
        chunk(&[("second verse", 0, 4_000)], 30_000),
    ]);
    assert_eq!(out.len(), 2);
    let gap = out[1].start_ms.saturating_sub(out[0].end_ms);
    assert!(gap <= 500, "gap of {gap}ms left at the boundary");
    assert_eq!(out[1].words[0].line_index, 1);
    assert_monotonic(&out);
}

#[test]
fn lone_chunk_is_not_shifted() {
    let only = chunk(&[("a b", 100, 900), ("c", 1_000, 1_400)], 60_000);
    let out = ChunkBoundaryConnector::default().connect(vec![only.clone()]);
    assert_eq!(out, only.lines);
}

#[test]
fn empty_chunks_still_contribute_offsets() {
    let out = ChunkBoundaryConnector::default().connect(vec![
        chunk(&[], 0),
        chunk(&[("only line", 1_000, 3_000)], 30_000),
    ]);
    assert_eq!((out[0].start_ms, out[0].end_ms), (31_000, 33_000));
    assert_eq!(out[0].words[0].line_index, 0);
}

#[test]
fn stitches_across_an_instrumental_chunk() {
    let out = ChunkBoundaryConnector::default().connect(vec![
        chunk(&[("one", 0, 4_000), ("two", 5_000, 10_000)], 0),
        chunk(&[], 10_000),
        chunk(&[("three four", 0, 5_000)], 20_000),
    ]);
    let indices: Vec<usize> = out.iter().map(|line| line.words[0].line_index).collect();
    assert_eq!(indices, [0, 1, 2]);
    assert_eq!(out[1].end_ms, 15_000);
    assert_eq!(out[2].start_ms, 15_000);
    assert_monotonic(&out);
}
