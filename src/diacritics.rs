//! Arabic diacritic (tashkeel) handling.
//!
//! Diacritics are only ever removed from copies used for comparison.
//! Text that is being rewritten keeps whatever marks it arrived with.

use unicode_normalization::UnicodeNormalization;

/// First and last code points of the tashkeel block (fathatan .. sukun).
const TASHKEEL_START: char = '\u{064B}';
const TASHKEEL_END: char = '\u{0652}';

/// Check if a character is an Arabic tashkeel mark.
pub fn is_diacritic(ch: char) -> bool {
    (TASHKEEL_START..=TASHKEEL_END).contains(&ch)
}

/// Check if a character sits in the Arabic block (U+0600..U+06FF).
pub fn is_arabic(ch: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&ch)
}

/// Remove tashkeel after canonical decomposition.
///
/// Base letters are kept in decomposed form, so `strip_diacritics` is
/// idempotent: a second pass finds nothing left to remove.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|&c| !is_diacritic(c)).collect()
}

/// Comparison key: stripped, lower-cased, whitespace runs collapsed.
pub(crate) fn comparison_key(text: &str) -> String {
    let stripped = strip_diacritics(text).to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_vowel_marks() {
        assert_eq!(strip_diacritics("كُرَة"), "كرة");
        assert_eq!(strip_diacritics("بِدّي"), "بدي");
    }

    #[test]
    fn strip_is_idempotent() {
        for s in ["كُرَة", "هَلَّأ", "إِنْتَ", "plain latin", "", "آكُل"] {
            let once = strip_diacritics(s);
            assert_eq!(strip_diacritics(&once), once);
        }
    }

    #[test]
    fn non_arabic_text_unchanged() {
        assert_eq!(strip_diacritics("biddi kura"), "biddi kura");
    }

    #[test]
    fn diacritic_range() {
        assert!(is_diacritic('\u{064E}'));
        assert!(is_diacritic('\u{0651}'));
        assert!(!is_diacritic('\u{0653}'));
        assert!(!is_diacritic('ك'));
    }

    #[test]
    fn comparison_key_collapses_whitespace() {
        assert_eq!(comparison_key("كُرة   قَدَم"), "كرة قدم");
    }
}
