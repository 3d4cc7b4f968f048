use lyricsync::alignment::PhonemeVocabulary;
use lyricsync::g2p::{dominant_language, G2p, KoreanG2p, SegmentLanguage};
use lyricsync::Language;

fn korean(text: &str) -> String {
    KoreanG2p::new().convert_to_string(text)
}

#[test]
fn tensification_after_obstruent_coda() {
    let phones = korean("학교");
    assert!(phones.contains('ㄲ'));
    assert_eq!(phones, "ㅎㅏㄱㄲㅛ");
}

#[test]
fn liaison_moves_coda_into_next_onset() {
    assert_eq!(korean("음악"), "ㅇㅡㅁㅏㄱ");
}

#[test]
fn h_is_dropped_before_vowel() {
    let phones = korean("좋은");
    assert!(!phones.contains('ㅎ'));
    assert_eq!(phones, "ㅈㅗㅇㅡㄴ");
}

#[test]
fn sentence_level_rules() {
    assert_eq!(korean("국물"), "ㄱㅜㅇㅁㅜㄹ");
    assert_eq!(korean("신라"), "ㅅㅣㄹㄹㅏ");
    assert_eq!(korean("같이"), "ㄱㅏㅊㅣ");
}

#[test]
fn english_dictionary_and_rules() {
    let g2p = G2p::new();
    assert_eq!(g2p.convert("love", Language::English), ["L", "AH", "V"]);
    let oov = g2p.convert("thrumbulous", Language::English);
    assert_eq!(oov.first().map(String::as_str), Some("TH"));
}

#[test]
fn every_symbol_is_in_the_vocabulary() {
    let vocab = PhonemeVocabulary::shared();
    let g2p = G2p::new();
    let samples = [
        ("사랑해요", Language::Korean),
        ("읽어 봤어", Language::Korean),
        ("shining through the night", Language::English),
        ("baby 내 마음", Language::Mixed),
    ];
    for (text, language) in samples {
        for word in text.split_whitespace() {
            let symbols = g2p.convert(word, language);
            assert!(!symbols.is_empty(), "{word} produced nothing");
            assert_eq!(vocab.encode(&symbols).len(), symbols.len(), "{word}: {symbols:?}");
        }
    }
}

#[test]
fn mixed_text_routes_each_run() {
    let phones = G2p::new().convert("love사랑", Language::Mixed);
    assert_eq!(&phones[..3], ["L", "AH", "V"]);
    assert_eq!(phones[3], "ㅅ");
    assert_eq!(dominant_language("oh 사랑해 사랑해"), SegmentLanguage::Korean);
}
