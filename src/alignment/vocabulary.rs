use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{AlignError, Result};
use crate::g2p::jamo::{Initial, Vowel};

pub const BLANK_SYMBOL: &str = "<blank>";
pub const SPACE_SYMBOL: &str = " ";
pub const BLANK_INDEX: usize = 0;

/// English phones in the order the acoustic model emits them.
pub const ARPABET: [&str; 39] = [
    "AA", "AE", "AH", "AO", "AW", "AY", "B", "CH", "D", "DH", "EH", "ER", "EY", "F", "G", "HH",
    "IH", "IY", "JH", "K", "L", "M", "N", "NG", "OW", "OY", "P", "R", "S", "SH", "T", "TH", "UH",
    "UW", "V", "W", "Y", "Z", "ZH",
];

/// Blank, 19 onsets, 21 vowels, 39 phones and the word separator.
pub const VOCABULARY_SIZE: usize = 1 + 19 + 21 + ARPABET.len() + 1;

static SHARED_VOCABULARY: Lazy<PhonemeVocabulary> = Lazy::new(PhonemeVocabulary::build);

/// Fixed symbol table shared by the G2P output and the posterior matrix
/// columns. Index 0 is the CTC blank.
#[derive(Debug, Clone)]
pub struct PhonemeVocabulary {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl PhonemeVocabulary {
    fn build() -> Self {
        let mut symbols = Vec::with_capacity(VOCABULARY_SIZE);
        symbols.push(BLANK_SYMBOL.to_string());
        symbols.extend(Initial::ALL.iter().map(|c| c.symbol().to_string()));
        symbols.extend(Vowel::ALL.iter().map(|v| v.symbol().to_string()));
        symbols.extend(ARPABET.iter().map(|phone| (*phone).to_string()));
        symbols.push(SPACE_SYMBOL.to_string());

        let index = symbols
            .iter()
            .enumerate()
            .map(|(idx, symbol)| (symbol.clone(), idx))
            .collect();
        Self { symbols, index }
    }

    pub fn shared() -> &'static Self {
        &SHARED_VOCABULARY
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    /// Maps symbols to indices, skipping any the vocabulary does not know.
    pub fn encode<I>(&self, symbols: I) -> Vec<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        symbols
            .into_iter()
            .filter_map(|symbol| self.index_of(symbol.as_ref()))
            .collect()
    }

    /// Fails when a posterior matrix was produced for a different vocabulary.
    pub fn ensure_matches(&self, vocab_size: usize) -> Result<()> {
        if vocab_size != self.len() {
            return Err(AlignError::VocabularyMismatch {
                expected: self.len(),
                actual: vocab_size,
            });
        }
        Ok(())
    }
}
