use lyricsync::postprocess::{LrcGenerator, LrcParser};
use lyricsync::{AlignmentResult, LineAlignment};

#[test]
fn generated_lrc_parses_back() {
    let lines = vec![
        LineAlignment::evenly_spaced("첫 번째 줄", 0, 1_234, 4_000, 0.9),
        LineAlignment::evenly_spaced("second line", 1, 4_006, 9_870, 0.9),
        LineAlignment::evenly_spaced("마지막 last", 2, 65_432, 70_000, 0.9),
    ];
    let result = AlignmentResult::from_lines(lines.clone(), 0.9);
    let parsed = LrcParser::parse(&result.enhanced_lrc);

    assert_eq!(parsed.len(), lines.len());
    for (original, back) in lines.iter().zip(&parsed) {
        assert_eq!(original.text, back.text);
        assert!(original.start_ms.abs_diff(back.start_ms) <= 10);
    }
}

#[test]
fn word_level_lrc_keeps_word_starts() {
    let lines = vec![
        LineAlignment::evenly_spaced("hold me close", 0, 2_000, 5_000, 0.7),
        LineAlignment::evenly_spaced("tonight", 1, 6_000, 7_000, 0.7),
    ];
    let rendered = LrcGenerator::generate_word_level(&lines);
    assert!(rendered.starts_with("[00:02.00] <00:02.00>hold <00:03.00>me"));

    let parsed = LrcParser::parse(&rendered);
    assert_eq!(parsed[0].text, "hold me close");
    let starts: Vec<u64> = parsed[0].words.iter().map(|w| w.start_ms).collect();
    assert_eq!(starts, [2_000, 3_000, 4_000]);
    assert_eq!(parsed[0].words[2].end_ms, 6_000);
}
