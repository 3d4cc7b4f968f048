use std::fs;
use std::path::Path;

use assert_cmd::Command;
use lyricsync::alignment::PhonemeVocabulary;
use predicates::prelude::*;

fn lyricsync() -> Command {
    Command::cargo_bin("lyricsync").unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.display().to_string()
}

#[test]
fn g2p_prints_one_word_per_line() {
    lyricsync()
        .args(["g2p", "--language", "english", "love me"])
        .assert()
        .success()
        .stdout(predicate::str::contains("love\tL AH V"))
        .stdout(predicate::str::contains("me\tM IY"));
}

#[test]
fn match_renders_lrc_from_segments() {
    let dir = tempfile::tempdir().unwrap();
    let segments = write(
        dir.path(),
        "segments.json",
        r#"[{"text": "hello world", "start_ms": 1000, "end_ms": 3000},
            {"text": "goodbye", "start_ms": 4000, "end_ms": 5000}]"#,
    );
    let lyrics = write(dir.path(), "lyrics.txt", "hello world\n\ngoodbye\n");
    lyricsync()
        .args(["match", "--segments", &segments, "--lyrics", &lyrics])
        .args(["--language", "english"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[00:01.00] hello world"))
        .stdout(predicate::str::contains("[00:04.00] goodbye"));
}

#[test]
fn force_align_reads_linear_posteriors() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = PhonemeVocabulary::shared();
    let spans = [("L", 10..20), ("AH", 20..30), ("V", 30..40)];
    let frames: Vec<Vec<f32>> = (0..60)
        .map(|t| {
            let class = spans
                .iter()
                .find(|(_, range)| range.contains(&t))
                .and_then(|(symbol, _)| vocab.index_of(symbol))
                .unwrap_or(0);
            let mut row = vec![0.001; vocab.len()];
            row[class] = 0.9;
            row
        })
        .collect();
    let posteriors = write(
        dir.path(),
        "posteriors.json",
        &serde_json::to_string(&frames).unwrap(),
    );
    let lyrics = write(dir.path(), "lyrics.txt", "love\n");
    lyricsync()
        .args(["force-align", "--posteriors", &posteriors, "--scale", "linear"])
        .args(["--lyrics", &lyrics, "--language", "english", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"word\": \"love\""))
        .stdout(predicate::str::contains("\"start_ms\": 200"));
}

#[test]
fn force_align_rejects_non_positive_frames() {
    let dir = tempfile::tempdir().unwrap();
    let posteriors = write(dir.path(), "posteriors.json", "[]");
    let lyrics = write(dir.path(), "lyrics.txt", "love\n");
    lyricsync()
        .args(["force-align", "--posteriors", &posteriors, "--lyrics", &lyrics])
        .args(["--frame-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame duration must be positive"));
}

#[test]
fn parse_lrc_prints_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let lrc = write(
        dir.path(),
        "song.lrc",
        "[ti:Title]\n[00:01.00] first line\n[00:04.50] second line\n",
    );
    lyricsync()
        .args(["parse-lrc", &lrc])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"text\": \"first line\""))
        .stdout(predicate::str::contains("\"start_ms\": 4500"))
        .stdout(predicate::str::contains("Title").not());
}

#[test]
fn offsets_persist_in_the_cache_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache").display().to_string();
    lyricsync()
        .args(["offset", "--song-id", "track", "--cache-dir", &cache])
        .assert()
        .success()
        .stdout("0\n");
    lyricsync()
        .args(["offset", "--song-id", "track", "--set", "-300", "--cache-dir", &cache])
        .assert()
        .success()
        .stdout("-300\n");
    lyricsync()
        .args(["offset", "--song-id", "track", "--cache-dir", &cache])
        .assert()
        .success()
        .stdout("-300\n");
}
