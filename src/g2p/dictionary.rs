use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{AlignError, Result};

const RAW_LEXICON: &str = include_str!("../../assets/phonemes/lexicon.txt");

/// Shared dictionary instance backed by the bundled CMU-style lexicon.
pub static DEFAULT_DICTIONARY: Lazy<PronunciationDictionary> = Lazy::new(|| {
    PronunciationDictionary::from_lexicon(RAW_LEXICON)
        .unwrap_or_else(|err| panic!("failed to initialize pronunciation dictionary: {err}"))
});

/// English pronunciations keyed by normalized word.
#[derive(Debug, Clone)]
pub struct PronunciationDictionary {
    entries: HashMap<String, Vec<Box<[&'static str]>>>,
}

/// Convenience alias for the pronunciation variants returned by lookups.
pub type PronunciationVariants<'dict> = Vec<&'dict [&'static str]>;

impl PronunciationDictionary {
    /// Creates a dictionary from raw CMU-style lexicon data. Stress digits
    /// are stripped so phones match the vocabulary's ARPAbet symbols.
    pub fn from_lexicon(data: &'static str) -> Result<Self> {
        let mut entries: HashMap<String, Vec<Box<[&'static str]>>> = HashMap::new();

        for (idx, line) in data.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            let mut parts = trimmed.split_whitespace();
            let raw_word = parts.next().ok_or_else(|| {
                AlignError::config(format!("lexicon line {idx} missing word column: {trimmed}"))
            })?;

            let normalized_key = normalize_token(trim_variant(raw_word)).ok_or_else(|| {
                AlignError::config(format!(
                    "lexicon line {idx} produced empty normalization: {raw_word}"
                ))
            })?;

            let phonemes: Vec<&'static str> = parts.map(strip_stress).collect();
            if phonemes.is_empty() {
                return Err(AlignError::config(format!(
                    "lexicon line {idx} missing phoneme sequence for {raw_word}"
                )));
            }

            entries
                .entry(normalized_key)
                .or_default()
                .push(phonemes.into_boxed_slice());
        }

        if entries.is_empty() {
            return Err(AlignError::config(
                "bundled pronunciation dictionary contained no entries",
            ));
        }

        Ok(Self { entries })
    }

    /// Returns a handle to the globally shared dictionary.
    pub fn shared() -> &'static Self {
        &DEFAULT_DICTIONARY
    }

    /// All known variants for a word, in lexicon order.
    pub fn lookup<'dict>(&'dict self, token: &str) -> Option<PronunciationVariants<'dict>> {
        let normalized = normalize_token(token)?;
        self.entries
            .get(&normalized)
            .map(|variants| variants.iter().map(|seq| seq.as_ref()).collect())
    }

    /// The first listed pronunciation of a word.
    pub fn primary(&self, token: &str) -> Option<&[&'static str]> {
        let normalized = normalize_token(token)?;
        self.entries
            .get(&normalized)
            .and_then(|variants| variants.first())
            .map(|seq| seq.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalizes a word to uppercase ASCII letters and apostrophes.
pub fn normalize_token(token: &str) -> Option<String> {
    let mut normalized = String::with_capacity(token.len());
    for ch in token.chars() {
        match ch {
            'A'..='Z' | '\'' => normalized.push(ch),
            'a'..='z' => normalized.push(ch.to_ascii_uppercase()),
            _ => continue,
        }
    }
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn trim_variant(raw_word: &str) -> &str {
    raw_word
        .split_once('(')
        .map(|(base, _)| base)
        .unwrap_or(raw_word)
}

fn strip_stress(phone: &'static str) -> &'static str {
    phone.trim_end_matches(|ch: char| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stress_and_keeps_variants() {
        let dict = PronunciationDictionary::from_lexicon("THE  DH AH0\nTHE(2)  DH IY0\n").unwrap();
        let variants = dict.lookup("the").unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0], &["DH", "AH"]);
        assert_eq!(dict.primary("The").unwrap(), &["DH", "AH"]);
    }

    #[test]
    fn rejects_entries_without_phones() {
        let err = PronunciationDictionary::from_lexicon("LONELY\n").unwrap_err();
        assert!(err.to_string().contains("missing phoneme sequence"));
    }

    #[test]
    fn shared_dictionary_covers_common_words() {
        let dict = PronunciationDictionary::shared();
        assert!(!dict.is_empty());
        assert_eq!(dict.primary("love").unwrap(), &["L", "AH", "V"]);
        assert_eq!(dict.primary("Don't").unwrap(), &["D", "OW", "N", "T"]);
    }
}
