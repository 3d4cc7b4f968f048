//! Korean grapheme-to-phoneme conversion.
//!
//! Text is decomposed into syllables and a fixed cascade of pairwise sound
//! changes is run over each adjacent pair, left to right. A syllable changed
//! by one pair is what the next pair sees.

use super::jamo::{self, Final, Initial, Syllable, Vowel};

type PairRule = fn(Syllable, Syllable) -> (Syllable, Syllable);

/// Pairwise rules in precedence order.
const RULES: [(&str, PairRule); 8] = [
    ("h-deletion", delete_h),
    ("aspiration", aspirate),
    ("palatalization", palatalize),
    ("liaison", link),
    ("neutralization", neutralize_pair),
    ("nasalization", nasalize),
    ("liquidization", liquidize),
    ("fortition", tense),
];

const DIGIT_WORDS: [&str; 10] = ["영", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];

#[derive(Debug, Clone, Copy, Default)]
pub struct KoreanG2p;

impl KoreanG2p {
    pub fn new() -> Self {
        Self
    }

    /// Converts Korean text into its pronounced jamo sequence.
    pub fn convert(&self, text: &str) -> Vec<char> {
        let normalized = normalize_text(text);
        let mut syllables: Vec<Option<Syllable>> =
            normalized.chars().map(jamo::decompose).collect();
        apply_rules(&mut syllables);

        let mut phonemes = Vec::with_capacity(syllables.len() * 3);
        for (slot, ch) in syllables.iter().zip(normalized.chars()) {
            match slot {
                Some(syllable) => phonemes.extend(syllable.jamo()),
                // Bare jamo (ㅋㅋ, ㅠㅠ) are already phonemes; anything else is dropped.
                None if jamo::is_hangul_jamo(ch) => phonemes.push(ch),
                None => {}
            }
        }
        phonemes
    }

    pub fn convert_to_string(&self, text: &str) -> String {
        self.convert(text).into_iter().collect()
    }
}

/// Runs the pairwise cascade, then neutralizes every syllable that ends a
/// Hangul run.
pub fn apply_rules(syllables: &mut [Option<Syllable>]) {
    for i in 0..syllables.len().saturating_sub(1) {
        let (Some(mut curr), Some(mut next)) = (syllables[i], syllables[i + 1]) else {
            continue;
        };
        for (_, rule) in RULES {
            (curr, next) = rule(curr, next);
        }
        syllables[i] = Some(curr);
        syllables[i + 1] = Some(next);
    }

    for i in 0..syllables.len() {
        let followed_by_hangul = matches!(syllables.get(i + 1), Some(Some(_)));
        if followed_by_hangul {
            continue;
        }
        if let Some(syllable) = syllables[i].as_mut() {
            syllable.coda = syllable.coda.map(Final::neutralized);
        }
    }
}

/// Spells digits as Sino-Korean numerals, strips punctuation and turns
/// hyphens and underscores into spaces.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '0'..='9' => normalized.push_str(DIGIT_WORDS[ch as usize - '0' as usize]),
            '-' | '_' => normalized.push(' '),
            _ if is_punctuation(ch) => {}
            _ => normalized.push(ch),
        }
    }
    normalized.trim().to_string()
}

fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation()
        || ('\u{2000}'..='\u{206F}').contains(&ch) && !ch.is_whitespace()
        || ('\u{3000}'..='\u{303F}').contains(&ch) && !ch.is_whitespace()
}

fn with_coda(syllable: Syllable, coda: Option<Final>) -> Syllable {
    Syllable { coda, ..syllable }
}

fn with_initial(syllable: Syllable, initial: Initial) -> Syllable {
    Syllable {
        initial,
        ..syllable
    }
}

/// ㅎ before a vowel is silent; in ㄶ/ㅀ only the ㅎ half goes.
fn delete_h(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    if !next.has_null_onset() {
        return (curr, next);
    }
    match curr.coda {
        Some(Final::Hieut) => (with_coda(curr, None), next),
        Some(Final::NieunHieut) => (with_coda(curr, Some(Final::Nieun)), next),
        Some(Final::RieulHieut) => (with_coda(curr, Some(Final::Rieul)), next),
        _ => (curr, next),
    }
}

/// ㅎ merges with an adjacent lax stop into its aspirated form, in either order.
fn aspirate(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    let Some(coda) = curr.coda else {
        return (curr, next);
    };

    if let Some(onset) = next.initial.aspirated() {
        let remaining = match coda {
            Final::Hieut => Some(None),
            Final::NieunHieut => Some(Some(Final::Nieun)),
            Final::RieulHieut => Some(Some(Final::Rieul)),
            _ => None,
        };
        if let Some(remaining) = remaining {
            return (with_coda(curr, remaining), with_initial(next, onset));
        }
    }

    if next.initial == Initial::Hieut {
        let (remaining, merging) = match coda.split() {
            Some((first, second)) => (Some(first), second),
            None => (None, coda),
        };
        if let Some(onset) = aspirate_final(merging) {
            return (with_coda(curr, remaining), with_initial(next, onset));
        }
    }

    (curr, next)
}

fn aspirate_final(coda: Final) -> Option<Initial> {
    match coda {
        Final::Jieut => Some(Initial::Chieut),
        Final::Siot | Final::SsangSiot | Final::Chieut | Final::Tieut => Some(Initial::Tieut),
        Final::SsangGiyeok | Final::Kieuk => Some(Initial::Kieuk),
        Final::Pieup => Some(Initial::Pieup),
        other => other.aspirated_with_h(),
    }
}

/// ㄷ/ㅌ before 이 surface as ㅈ/ㅊ.
fn palatalize(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    if !next.has_null_onset() || next.vowel != Vowel::I {
        return (curr, next);
    }
    match curr.coda {
        Some(Final::Digeut) => (with_coda(curr, None), with_initial(next, Initial::Jieut)),
        Some(Final::Tieut) => (with_coda(curr, None), with_initial(next, Initial::Chieut)),
        Some(Final::RieulTieut) => (
            with_coda(curr, Some(Final::Rieul)),
            with_initial(next, Initial::Chieut),
        ),
        _ => (curr, next),
    }
}

/// A final consonant moves into a following silent onset. Double finals
/// keep their first half.
fn link(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    if !next.has_null_onset() {
        return (curr, next);
    }
    let Some(coda) = curr.coda else {
        return (curr, next);
    };
    if let Some((first, second)) = coda.split() {
        return match second.as_initial() {
            Some(onset) => (with_coda(curr, Some(first)), with_initial(next, onset)),
            None => (curr, next),
        };
    }
    match coda.as_initial() {
        Some(onset) => (with_coda(curr, None), with_initial(next, onset)),
        None => (curr, next),
    }
}

fn neutralize_pair(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    (with_coda(curr, curr.coda.map(Final::neutralized)), next)
}

/// Obstruent finals become nasal before ㄴ/ㅁ; ㄹ after a nasal or
/// obstruent final is read as ㄴ.
fn nasalize(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    let Some(coda) = curr.coda else {
        return (curr, next);
    };
    match next.initial {
        Initial::Nieun | Initial::Mieum => match coda.nasalized() {
            Some(nasal) if nasal != coda => (with_coda(curr, Some(nasal)), next),
            _ => (curr, next),
        },
        Initial::Rieul => {
            if matches!(coda, Final::Mieum | Final::Ieung) {
                return (curr, with_initial(next, Initial::Nieun));
            }
            match coda.nasalized() {
                Some(nasal) => (
                    with_coda(curr, Some(nasal)),
                    with_initial(next, Initial::Nieun),
                ),
                None => (curr, next),
            }
        }
        _ => (curr, next),
    }
}

/// ㄴ next to ㄹ assimilates to ㄹ.
fn liquidize(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    match (curr.coda, next.initial) {
        (Some(Final::Nieun), Initial::Rieul) => (with_coda(curr, Some(Final::Rieul)), next),
        (Some(Final::Rieul), Initial::Nieun) => (curr, with_initial(next, Initial::Rieul)),
        _ => (curr, next),
    }
}

/// Lax onsets are tensed after an obstruent final.
fn tense(curr: Syllable, next: Syllable) -> (Syllable, Syllable) {
    match (curr.coda, next.initial.tensed()) {
        (Some(coda), Some(tensed)) if coda.is_obstruent() => (curr, with_initial(next, tensed)),
        _ => (curr, next),
    }
}
