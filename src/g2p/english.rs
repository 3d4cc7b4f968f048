//! English grapheme-to-phoneme conversion: dictionary first, letter rules
//! for everything else.

use super::dictionary::{normalize_token, PronunciationDictionary};
use crate::alignment::vocabulary::SPACE_SYMBOL;

/// Multi-letter spellings, longest first so the first hit is the longest match.
const GRAPHEME_RULES: &[(&str, &[&str])] = &[
    ("tion", &["SH", "AH", "N"]),
    ("sion", &["ZH", "AH", "N"]),
    ("ght", &["T"]),
    ("igh", &["AY"]),
    ("ous", &["AH", "S"]),
    ("th", &["TH"]),
    ("sh", &["SH"]),
    ("ch", &["CH"]),
    ("ph", &["F"]),
    ("wh", &["W"]),
    ("ck", &["K"]),
    ("ng", &["NG"]),
    ("ee", &["IY"]),
    ("ea", &["IY"]),
    ("oo", &["UW"]),
    ("ou", &["AW"]),
    ("ow", &["OW"]),
    ("ai", &["EY"]),
    ("ay", &["EY"]),
    ("oi", &["OY"]),
    ("oy", &["OY"]),
];

#[derive(Debug, Clone, Copy)]
pub struct EnglishG2p {
    dictionary: &'static PronunciationDictionary,
}

impl Default for EnglishG2p {
    fn default() -> Self {
        Self::new()
    }
}

impl EnglishG2p {
    pub fn new() -> Self {
        Self::with_dictionary(PronunciationDictionary::shared())
    }

    pub fn with_dictionary(dictionary: &'static PronunciationDictionary) -> Self {
        Self { dictionary }
    }

    /// Converts one word into ARPAbet phones.
    pub fn convert(&self, word: &str) -> Vec<String> {
        let Some(normalized) = normalize_token(word) else {
            return Vec::new();
        };
        if let Some(phones) = self.dictionary.primary(&normalized) {
            return phones.iter().map(|phone| (*phone).to_string()).collect();
        }
        spell_out(&normalized.to_ascii_lowercase())
    }

    /// Converts a sentence, separating words with the space symbol.
    pub fn convert_sentence(&self, sentence: &str) -> Vec<String> {
        let mut phones = Vec::new();
        for word in sentence.split_whitespace() {
            let converted = self.convert(word);
            if converted.is_empty() {
                continue;
            }
            if !phones.is_empty() {
                phones.push(SPACE_SYMBOL.to_string());
            }
            phones.extend(converted);
        }
        phones
    }
}

/// Letter-to-sound fallback for words missing from the dictionary. Expects
/// lowercase ASCII letters and apostrophes.
fn spell_out(word: &str) -> Vec<String> {
    let bytes = word.as_bytes();
    let mut phones = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let remaining = &word[pos..];
        if let Some((pattern, mapped)) = GRAPHEME_RULES
            .iter()
            .find(|(pattern, _)| remaining.starts_with(pattern))
        {
            phones.extend(mapped.iter().map(|phone| (*phone).to_string()));
            pos += pattern.len();
            continue;
        }
        let next = bytes.get(pos + 1).copied();
        phones.extend(
            letter_phones(bytes[pos], next, pos)
                .iter()
                .map(|phone| (*phone).to_string()),
        );
        pos += 1;
    }
    phones
}

fn letter_phones(letter: u8, next: Option<u8>, pos: usize) -> &'static [&'static str] {
    let softens = matches!(next, Some(b'e' | b'i' | b'y'));
    match letter {
        // Terminal e is silent unless it is the whole word.
        b'e' if next.is_none() && pos > 0 => &[],
        b'a' => &["AE"],
        b'b' => &["B"],
        b'c' if softens => &["S"],
        b'c' => &["K"],
        b'd' => &["D"],
        b'e' => &["EH"],
        b'f' => &["F"],
        b'g' if softens => &["JH"],
        b'g' => &["G"],
        b'h' => &["HH"],
        b'i' => &["IH"],
        b'j' => &["JH"],
        b'k' => &["K"],
        b'l' => &["L"],
        b'm' => &["M"],
        b'n' => &["N"],
        b'o' => &["AA"],
        b'p' => &["P"],
        b'q' => &["K"],
        b'r' => &["R"],
        b's' => &["S"],
        b't' => &["T"],
        b'u' => &["AH"],
        b'v' => &["V"],
        b'w' => &["W"],
        b'x' => &["K", "S"],
        b'y' if pos == 0 => &["Y"],
        b'y' => &["IY"],
        b'z' => &["Z"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones(word: &str) -> Vec<String> {
        EnglishG2p::new().convert(word)
    }

    #[test]
    fn dictionary_hits_win() {
        assert_eq!(phones("love"), ["L", "AH", "V"]);
        assert_eq!(phones("Heart"), ["HH", "AA", "R", "T"]);
        assert_eq!(phones("know"), ["N", "OW"]);
    }

    #[test]
    fn fallback_uses_digraphs_first() {
        assert_eq!(phones("thud")[0], "TH");
        assert_eq!(phones("shout"), ["SH", "AW", "T"]);
        assert_eq!(phones("nation"), ["N", "AE", "SH", "AH", "N"]);
    }

    #[test]
    fn soft_c_and_g_before_front_vowels() {
        assert_eq!(phones("cat"), ["K", "AE", "T"]);
        assert_eq!(phones("cit"), ["S", "IH", "T"]);
        assert_eq!(phones("gem"), ["JH", "EH", "M"]);
    }

    #[test]
    fn terminal_e_is_silent() {
        assert_eq!(phones("mate"), ["M", "AE", "T"]);
        assert_eq!(phones("e"), ["EH"]);
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        assert_eq!(phones("LOVE!"), phones("love"));
        assert!(phones("...").is_empty());
    }

    #[test]
    fn sentence_inserts_space_between_words() {
        let phones = EnglishG2p::new().convert_sentence("I love you");
        assert_eq!(
            phones,
            ["AY", SPACE_SYMBOL, "L", "AH", "V", SPACE_SYMBOL, "Y", "UW"]
        );
    }
}
