//! Grapheme-to-phoneme conversion for Korean, English and mixed lyrics.

pub mod code_switch;
pub mod dictionary;
pub mod english;
pub mod jamo;
pub mod korean;

use crate::types::Language;

pub use code_switch::{dominant_language, Segment, SegmentLanguage};
pub use english::EnglishG2p;
pub use korean::KoreanG2p;

/// Routes words to the converter for their language.
#[derive(Debug, Clone, Copy, Default)]
pub struct G2p {
    korean: KoreanG2p,
    english: EnglishG2p,
}

impl G2p {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phoneme symbols for a single word. In mixed mode each code-switch
    /// segment goes to its own converter; segments in neither language
    /// contribute nothing.
    pub fn convert(&self, word: &str, language: Language) -> Vec<String> {
        match language {
            Language::Korean => self.korean_symbols(word),
            Language::English => self.english.convert(word),
            Language::Mixed => code_switch::segment(word)
                .into_iter()
                .flat_map(|segment| match segment.language {
                    SegmentLanguage::Korean => self.korean_symbols(&segment.text),
                    SegmentLanguage::English => self.english.convert(&segment.text),
                    SegmentLanguage::Other => Vec::new(),
                })
                .collect(),
        }
    }

    fn korean_symbols(&self, text: &str) -> Vec<String> {
        self.korean
            .convert(text)
            .into_iter()
            .map(String::from)
            .collect()
    }
}
