//! Hangul syllable arithmetic and jamo classes.
//!
//! Precomposed syllables live in `U+AC00..=U+D7A3` and are laid out as
//! `base + (initial * 21 + vowel) * 28 + final`, with final index 0 meaning no
//! coda. Jamo are rendered with their Hangul Compatibility Jamo code points,
//! which is also how the phoneme vocabulary spells them.

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
const VOWEL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;
const COMPAT_VOWEL_BASE: u32 = 0x314F;

/// Leading consonant (choseong), in Unicode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Initial {
    Giyeok,
    SsangGiyeok,
    Nieun,
    Digeut,
    SsangDigeut,
    Rieul,
    Mieum,
    Bieup,
    SsangBieup,
    Siot,
    SsangSiot,
    Ieung,
    Jieut,
    SsangJieut,
    Chieut,
    Kieuk,
    Tieut,
    Pieup,
    Hieut,
}

impl Initial {
    pub const ALL: [Initial; 19] = [
        Initial::Giyeok,
        Initial::SsangGiyeok,
        Initial::Nieun,
        Initial::Digeut,
        Initial::SsangDigeut,
        Initial::Rieul,
        Initial::Mieum,
        Initial::Bieup,
        Initial::SsangBieup,
        Initial::Siot,
        Initial::SsangSiot,
        Initial::Ieung,
        Initial::Jieut,
        Initial::SsangJieut,
        Initial::Chieut,
        Initial::Kieuk,
        Initial::Tieut,
        Initial::Pieup,
        Initial::Hieut,
    ];

    const SYMBOLS: [char; 19] = [
        'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
        'ㅌ', 'ㅍ', 'ㅎ',
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn symbol(self) -> char {
        Self::SYMBOLS[self.index()]
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::SYMBOLS
            .iter()
            .position(|&candidate| candidate == symbol)
            .and_then(Self::from_index)
    }

    /// Tense counterpart used by fortition.
    pub fn tensed(self) -> Option<Self> {
        match self {
            Initial::Giyeok => Some(Initial::SsangGiyeok),
            Initial::Digeut => Some(Initial::SsangDigeut),
            Initial::Bieup => Some(Initial::SsangBieup),
            Initial::Siot => Some(Initial::SsangSiot),
            Initial::Jieut => Some(Initial::SsangJieut),
            _ => None,
        }
    }

    /// Aspirated counterpart used when a ㅎ merges with a lax stop.
    pub fn aspirated(self) -> Option<Self> {
        match self {
            Initial::Giyeok => Some(Initial::Kieuk),
            Initial::Digeut => Some(Initial::Tieut),
            Initial::Bieup => Some(Initial::Pieup),
            Initial::Jieut => Some(Initial::Chieut),
            _ => None,
        }
    }
}

/// Medial vowel (jungseong), in Unicode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vowel {
    A,
    Ae,
    Ya,
    Yae,
    Eo,
    E,
    Yeo,
    Ye,
    O,
    Wa,
    Wae,
    Oe,
    Yo,
    U,
    Wo,
    We,
    Wi,
    Yu,
    Eu,
    Ui,
    I,
}

impl Vowel {
    pub const ALL: [Vowel; 21] = [
        Vowel::A,
        Vowel::Ae,
        Vowel::Ya,
        Vowel::Yae,
        Vowel::Eo,
        Vowel::E,
        Vowel::Yeo,
        Vowel::Ye,
        Vowel::O,
        Vowel::Wa,
        Vowel::Wae,
        Vowel::Oe,
        Vowel::Yo,
        Vowel::U,
        Vowel::Wo,
        Vowel::We,
        Vowel::Wi,
        Vowel::Yu,
        Vowel::Eu,
        Vowel::Ui,
        Vowel::I,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn symbol(self) -> char {
        // Compatibility vowels U+314F..=U+3163 are contiguous.
        char::from_u32(COMPAT_VOWEL_BASE + self.index() as u32).unwrap_or('ㅏ')
    }
}

/// Trailing consonant (jongseong). Index 0 of the Unicode table is "no
/// final", which is modelled as `Option<Final>` on [`Syllable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Final {
    Giyeok,
    SsangGiyeok,
    GiyeokSiot,
    Nieun,
    NieunJieut,
    NieunHieut,
    Digeut,
    Rieul,
    RieulGiyeok,
    RieulMieum,
    RieulBieup,
    RieulSiot,
    RieulTieut,
    RieulPieup,
    RieulHieut,
    Mieum,
    Bieup,
    BieupSiot,
    Siot,
    SsangSiot,
    Ieung,
    Jieut,
    Chieut,
    Kieuk,
    Tieut,
    Pieup,
    Hieut,
}

impl Final {
    pub const ALL: [Final; 27] = [
        Final::Giyeok,
        Final::SsangGiyeok,
        Final::GiyeokSiot,
        Final::Nieun,
        Final::NieunJieut,
        Final::NieunHieut,
        Final::Digeut,
        Final::Rieul,
        Final::RieulGiyeok,
        Final::RieulMieum,
        Final::RieulBieup,
        Final::RieulSiot,
        Final::RieulTieut,
        Final::RieulPieup,
        Final::RieulHieut,
        Final::Mieum,
        Final::Bieup,
        Final::BieupSiot,
        Final::Siot,
        Final::SsangSiot,
        Final::Ieung,
        Final::Jieut,
        Final::Chieut,
        Final::Kieuk,
        Final::Tieut,
        Final::Pieup,
        Final::Hieut,
    ];

    const SYMBOLS: [char; 27] = [
        'ㄱ', 'ㄲ', 'ㄳ', 'ㄴ', 'ㄵ', 'ㄶ', 'ㄷ', 'ㄹ', 'ㄺ', 'ㄻ', 'ㄼ', 'ㄽ', 'ㄾ', 'ㄿ', 'ㅀ', 'ㅁ',
        'ㅂ', 'ㅄ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅊ', 'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
    ];

    /// Position in the Unicode final table (1-based, 0 is "no final").
    pub fn code(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_code(code: u32) -> Option<Self> {
        code.checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx as usize).copied())
    }

    pub fn symbol(self) -> char {
        Self::SYMBOLS[self as usize]
    }

    /// Components of a double final, in reading order.
    pub fn split(self) -> Option<(Final, Final)> {
        let pair = match self {
            Final::GiyeokSiot => (Final::Giyeok, Final::Siot),
            Final::NieunJieut => (Final::Nieun, Final::Jieut),
            Final::NieunHieut => (Final::Nieun, Final::Hieut),
            Final::RieulGiyeok => (Final::Rieul, Final::Giyeok),
            Final::RieulMieum => (Final::Rieul, Final::Mieum),
            Final::RieulBieup => (Final::Rieul, Final::Bieup),
            Final::RieulSiot => (Final::Rieul, Final::Siot),
            Final::RieulTieut => (Final::Rieul, Final::Tieut),
            Final::RieulPieup => (Final::Rieul, Final::Pieup),
            Final::RieulHieut => (Final::Rieul, Final::Hieut),
            Final::BieupSiot => (Final::Bieup, Final::Siot),
            _ => return None,
        };
        Some(pair)
    }

    /// Onset consonant a single final becomes when it links to the next
    /// syllable. Double finals and ㅇ have no onset form.
    pub fn as_initial(self) -> Option<Initial> {
        let initial = match self {
            Final::Giyeok => Initial::Giyeok,
            Final::SsangGiyeok => Initial::SsangGiyeok,
            Final::Nieun => Initial::Nieun,
            Final::Digeut => Initial::Digeut,
            Final::Rieul => Initial::Rieul,
            Final::Mieum => Initial::Mieum,
            Final::Bieup => Initial::Bieup,
            Final::Siot => Initial::Siot,
            Final::SsangSiot => Initial::SsangSiot,
            Final::Jieut => Initial::Jieut,
            Final::Chieut => Initial::Chieut,
            Final::Kieuk => Initial::Kieuk,
            Final::Tieut => Initial::Tieut,
            Final::Pieup => Initial::Pieup,
            Final::Hieut => Initial::Hieut,
            _ => return None,
        };
        Some(initial)
    }

    /// Seven-way reduction of an unreleased final to its representative.
    pub fn neutralized(self) -> Final {
        match self {
            Final::Giyeok | Final::SsangGiyeok | Final::GiyeokSiot | Final::Kieuk => Final::Giyeok,
            Final::RieulGiyeok => Final::Giyeok,
            Final::Nieun | Final::NieunJieut | Final::NieunHieut => Final::Nieun,
            Final::Digeut
            | Final::Siot
            | Final::SsangSiot
            | Final::Jieut
            | Final::Chieut
            | Final::Tieut
            | Final::Hieut => Final::Digeut,
            Final::RieulMieum | Final::Mieum => Final::Mieum,
            Final::Rieul
            | Final::RieulBieup
            | Final::RieulSiot
            | Final::RieulTieut
            | Final::RieulPieup
            | Final::RieulHieut => Final::Rieul,
            Final::Bieup | Final::BieupSiot | Final::Pieup => Final::Bieup,
            Final::Ieung => Final::Ieung,
        }
    }

    /// Nasal a final obstruent becomes before ㄴ/ㅁ.
    pub fn nasalized(self) -> Option<Final> {
        match self {
            Final::Giyeok
            | Final::SsangGiyeok
            | Final::GiyeokSiot
            | Final::Kieuk
            | Final::RieulGiyeok => Some(Final::Ieung),
            Final::Digeut
            | Final::Siot
            | Final::SsangSiot
            | Final::Jieut
            | Final::Chieut
            | Final::Tieut
            | Final::Hieut => Some(Final::Nieun),
            Final::Bieup | Final::Pieup | Final::RieulBieup | Final::BieupSiot => {
                Some(Final::Mieum)
            }
            _ => None,
        }
    }

    /// Finals that end in a stop or fricative closure.
    pub fn is_obstruent(self) -> bool {
        matches!(
            self,
            Final::Giyeok
                | Final::SsangGiyeok
                | Final::GiyeokSiot
                | Final::Kieuk
                | Final::Digeut
                | Final::Siot
                | Final::SsangSiot
                | Final::Jieut
                | Final::Chieut
                | Final::Tieut
                | Final::Bieup
                | Final::BieupSiot
                | Final::Pieup
        )
    }

    /// Aspirated onset produced when this final meets an onset ㅎ.
    pub fn aspirated_with_h(self) -> Option<Initial> {
        match self {
            Final::Giyeok => Some(Initial::Kieuk),
            Final::Digeut => Some(Initial::Tieut),
            Final::Bieup => Some(Initial::Pieup),
            Final::Jieut => Some(Initial::Chieut),
            _ => None,
        }
    }
}

/// One decomposed Hangul syllable block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Syllable {
    pub initial: Initial,
    pub vowel: Vowel,
    pub coda: Option<Final>,
}

impl Syllable {
    pub fn new(initial: Initial, vowel: Vowel, coda: Option<Final>) -> Self {
        Self {
            initial,
            vowel,
            coda,
        }
    }

    /// Whether the syllable is written with the silent onset ㅇ.
    pub fn has_null_onset(&self) -> bool {
        self.initial == Initial::Ieung
    }

    pub fn compose(&self) -> char {
        let code = SYLLABLE_BASE
            + (self.initial.index() as u32 * VOWEL_COUNT + self.vowel.index() as u32)
                * FINAL_COUNT
            + self.coda.map_or(0, Final::code);
        char::from_u32(code).unwrap_or('\u{FFFD}')
    }

    /// Jamo in reading order: onset, vowel, then the coda when present.
    pub fn jamo(&self) -> impl Iterator<Item = char> {
        [
            Some(self.initial.symbol()),
            Some(self.vowel.symbol()),
            self.coda.map(Final::symbol),
        ]
        .into_iter()
        .flatten()
    }
}

pub fn is_hangul_syllable(ch: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_LAST).contains(&(ch as u32))
}

/// Hangul Compatibility Jamo consonants and vowels (`U+3131..=U+3163`).
pub fn is_hangul_jamo(ch: char) -> bool {
    (0x3131..=0x3163).contains(&(ch as u32))
}

pub fn decompose(ch: char) -> Option<Syllable> {
    if !is_hangul_syllable(ch) {
        return None;
    }
    let code = ch as u32 - SYLLABLE_BASE;
    let initial = Initial::from_index((code / (VOWEL_COUNT * FINAL_COUNT)) as usize)?;
    let vowel = Vowel::from_index(((code % (VOWEL_COUNT * FINAL_COUNT)) / FINAL_COUNT) as usize)?;
    let coda = Final::from_code(code % FINAL_COUNT);
    Some(Syllable::new(initial, vowel, coda))
}

/// Splits every syllable of `text` into jamo; other characters pass through.
pub fn decompose_to_jamo(text: &str) -> Vec<char> {
    let mut jamo = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match decompose(ch) {
            Some(syllable) => jamo.extend(syllable.jamo()),
            None => jamo.push(ch),
        }
    }
    jamo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_and_compose_are_inverse() {
        for ch in ['가', '각', '힣', '닭', '없', '읽'] {
            let syllable = decompose(ch).unwrap();
            assert_eq!(syllable.compose(), ch);
        }
    }

    #[test]
    fn decomposes_double_final() {
        let syllable = decompose('닭').unwrap();
        assert_eq!(syllable.initial, Initial::Digeut);
        assert_eq!(syllable.vowel, Vowel::A);
        assert_eq!(syllable.coda, Some(Final::RieulGiyeok));
        assert_eq!(
            Final::RieulGiyeok.split(),
            Some((Final::Rieul, Final::Giyeok))
        );
    }

    #[test]
    fn jamo_use_compatibility_code_points() {
        assert_eq!(decompose_to_jamo("한a"), vec!['ㅎ', 'ㅏ', 'ㄴ', 'a']);
        assert_eq!(Vowel::I.symbol(), 'ㅣ');
        assert_eq!(Initial::from_symbol('ㅎ'), Some(Initial::Hieut));
    }

    #[test]
    fn classifies_ranges() {
        assert!(is_hangul_syllable('가'));
        assert!(!is_hangul_syllable('ㄱ'));
        assert!(is_hangul_jamo('ㄱ'));
        assert!(is_hangul_jamo('ㅣ'));
        assert!(!is_hangul_jamo('a'));
    }
}
