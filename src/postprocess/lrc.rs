//! LRC rendering and best-effort parsing.
//!
//! Line format is `[mm:ss.xx] text`; the word-level variant adds inline
//! `<mm:ss.xx>word` tokens after the line stamp.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{LineAlignment, WordAlignment};

/// Duration given to the last parsed line, which has no successor.
pub const DEFAULT_LAST_LINE_MS: u64 = 5_000;
/// Confidence assigned to words reconstructed from plain LRC.
pub const PARSED_WORD_CONFIDENCE: f32 = 0.5;

static LINE_STAMPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\[\d{1,3}:\d{2}(?:[.:]\d{1,3})?\]\s*)+)(.*)$")
        .unwrap_or_else(|err| panic!("invalid LRC line pattern: {err}"))
});

static STAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}):(\d{2})(?:[.:](\d{1,3}))?")
        .unwrap_or_else(|err| panic!("invalid LRC stamp pattern: {err}"))
});

static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(\d{1,3}:\d{2}(?:[.:]\d{1,3})?)>\s*([^<]*)")
        .unwrap_or_else(|err| panic!("invalid LRC word pattern: {err}"))
});

pub struct LrcGenerator;

impl LrcGenerator {
    /// One `[mm:ss.xx] text` line per lyric line.
    pub fn generate(lines: &[LineAlignment]) -> String {
        lines
            .iter()
            .map(|line| format!("[{}] {}", format_timestamp(line.start_ms), line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Line stamps followed by a `<mm:ss.xx>` token before every word.
    pub fn generate_word_level(lines: &[LineAlignment]) -> String {
        lines
            .iter()
            .map(|line| {
                let mut rendered = format!("[{}]", format_timestamp(line.start_ms));
                for word in &line.words {
                    rendered.push_str(&format!(
                        " <{}>{}",
                        format_timestamp(word.start_ms),
                        word.word
                    ));
                }
                rendered
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `mm:ss.xx`, rounded to the nearest hundredth of a second.
pub fn format_timestamp(ms: u64) -> String {
    let centis = (ms + 5) / 10;
    let minutes = centis / 6_000;
    let seconds = (centis / 100) % 60;
    let hundredths = centis % 100;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// Parses `mm:ss`, `mm:ss.xx` or `mm:ss.xxx` into milliseconds.
pub fn parse_timestamp(stamp: &str) -> Option<u64> {
    let caps = STAMP.captures(stamp)?;
    let minutes: u64 = caps.get(1)?.as_str().parse().ok()?;
    let seconds: u64 = caps.get(2)?.as_str().parse().ok()?;
    let fraction = match caps.get(3) {
        Some(digits) => {
            let value: u64 = digits.as_str().parse().ok()?;
            match digits.as_str().len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            }
        }
        None => 0,
    };
    Some(minutes * 60_000 + seconds * 1_000 + fraction)
}

pub struct LrcParser;

struct ParsedLine {
    start_ms: u64,
    text: String,
    words: Vec<(u64, String)>,
}

impl LrcParser {
    /// Reconstructs lines from LRC text. Lines without a leading time stamp
    /// (including `[ar:...]` style tags) are skipped. A line carrying several
    /// stamps is repeated at each of them. Each line ends where the next one
    /// starts; the last gets [`DEFAULT_LAST_LINE_MS`]. Without inline word
    /// stamps, words split the line evenly.
    pub fn parse(lrc: &str) -> Vec<LineAlignment> {
        let mut parsed: Vec<ParsedLine> = Vec::new();
        for raw in lrc.lines() {
            let Some(caps) = LINE_STAMPS.captures(raw.trim()) else {
                continue;
            };
            let (Some(stamps), Some(body)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let (text, words) = parse_body(body.as_str());
            for stamp in stamps.as_str().split(']') {
                let Some(start_ms) = parse_timestamp(stamp) else {
                    continue;
                };
                parsed.push(ParsedLine {
                    start_ms,
                    text: text.clone(),
                    words: words.clone(),
                });
            }
        }
        parsed.sort_by_key(|line| line.start_ms);

        let mut lines = Vec::new();
        for (idx, line) in parsed.iter().enumerate() {
            if line.text.is_empty() {
                continue;
            }
            let end_ms = parsed
                .get(idx + 1)
                .map_or(line.start_ms + DEFAULT_LAST_LINE_MS, |next| next.start_ms)
                .max(line.start_ms);
            let line_index = lines.len();
            lines.push(if line.words.is_empty() {
                LineAlignment::evenly_spaced(
                    &line.text,
                    line_index,
                    line.start_ms,
                    end_ms,
                    PARSED_WORD_CONFIDENCE,
                )
            } else {
                stamped_line(line, line_index, end_ms)
            });
        }
        lines
    }
}

/// Splits a line body into its text and any inline word stamps.
fn parse_body(body: &str) -> (String, Vec<(u64, String)>) {
    let words: Vec<(u64, String)> = WORD_TOKEN
        .captures_iter(body)
        .filter_map(|caps| {
            let start = parse_timestamp(caps.get(1)?.as_str())?;
            let word = caps.get(2)?.as_str().trim();
            (!word.is_empty()).then(|| (start, word.to_string()))
        })
        .collect();
    if words.is_empty() {
        return (body.trim().to_string(), words);
    }
    let text = words
        .iter()
        .map(|(_, word)| word.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    (text, words)
}

fn stamped_line(line: &ParsedLine, line_index: usize, end_ms: u64) -> LineAlignment {
    let words = line
        .words
        .iter()
        .enumerate()
        .map(|(idx, (start, word))| {
            let start_ms = (*start).clamp(line.start_ms, end_ms);
            let next = line.words.get(idx + 1).map_or(end_ms, |(next, _)| *next);
            WordAlignment {
                word: word.clone(),
                start_ms,
                end_ms: next.clamp(start_ms, end_ms),
                confidence: PARSED_WORD_CONFIDENCE,
                line_index,
            }
        })
        .collect();
    LineAlignment {
        text: line.text.clone(),
        start_ms: line.start_ms,
        end_ms,
        words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_rounding() {
        assert_eq!(format_timestamp(0), "00:00.00");
        assert_eq!(format_timestamp(61_234), "01:01.23");
        assert_eq!(format_timestamp(61_235), "01:01.24");
        assert_eq!(format_timestamp(59_996), "01:00.00");
    }

    #[test]
    fn parses_fraction_widths() {
        assert_eq!(parse_timestamp("01:02.5"), Some(62_500));
        assert_eq!(parse_timestamp("01:02.50"), Some(62_500));
        assert_eq!(parse_timestamp("01:02.505"), Some(62_505));
        assert_eq!(parse_timestamp("01:02"), Some(62_000));
    }

    #[test]
    fn parse_skips_tags_and_malformed_lines() {
        let lines = LrcParser::parse("[ar:Someone]\nno stamp here\n[00:01.00] first\n[00:03.50] second");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[0].end_ms, 3_500);
        assert_eq!(lines[1].end_ms, 3_500 + DEFAULT_LAST_LINE_MS);
    }

    #[test]
    fn repeated_stamps_expand_in_time_order() {
        let lines = LrcParser::parse("[00:10.00][00:30.00] chorus\n[00:20.00] verse");
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["chorus", "verse", "chorus"]);
        assert_eq!(lines[2].words[0].line_index, 2);
    }

    #[test]
    fn empty_stamped_line_ends_previous_line() {
        let lines = LrcParser::parse("[00:01.00] sing\n[00:02.00]\n[00:09.00] again");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].end_ms, 2_000);
    }

    #[test]
    fn reads_word_level_tokens() {
        let lines = LrcParser::parse("[00:01.00] <00:01.00>hello <00:01.60>there\n[00:03.00] next");
        let words = &lines[0].words;
        assert_eq!(lines[0].text, "hello there");
        assert_eq!((words[0].start_ms, words[0].end_ms), (1_000, 1_600));
        assert_eq!((words[1].start_ms, words[1].end_ms), (1_600, 3_000));
    }
}
