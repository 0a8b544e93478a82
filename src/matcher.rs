//! Substring search used by the substitution engine.
//!
//! [`TolerantPattern`] finds an Arabic key inside text that may carry
//! tashkeel the key does not. It is a two-pointer scan: the key pointer
//! only moves on base letters, the text pointer additionally skips any
//! marks that follow a matched letter. Whitespace in a key matches one
//! or more whitespace characters in the text. A composed letter such as
//! `أ` also matches its decomposed spelling (`ا` + hamza above).

use std::ops::Range;

use unicode_normalization::char::{decompose_canonical, is_combining_mark};
use unicode_normalization::UnicodeNormalization;

use crate::diacritics::{is_arabic, is_diacritic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    Letter(Letter),
    Gap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Letter {
    ch: char,
    /// Base and combining mark, when `ch` has a two-part canonical decomposition.
    split: Option<(char, char)>,
}

impl Letter {
    fn new(ch: char) -> Self {
        let mut parts = Vec::with_capacity(2);
        decompose_canonical(ch, |c| parts.push(c));
        let split = match parts[..] {
            [base, mark] => Some((base, mark)),
            _ => None,
        };
        Self { ch, split }
    }

    /// Char index just past this letter at `h`, if it is there.
    ///
    /// Tashkeel may sit between a decomposed base and its mark, which is
    /// where NFD puts it.
    fn match_at(&self, chars: &[(usize, char)], h: usize) -> Option<usize> {
        let found = chars.get(h)?.1;
        if found == self.ch {
            return Some(h + 1);
        }
        let (base, mark) = self.split?;
        if found != base {
            return None;
        }
        let mut i = h + 1;
        while i < chars.len() && is_diacritic(chars[i].1) {
            i += 1;
        }
        (chars.get(i)?.1 == mark).then_some(i + 1)
    }
}

/// A compiled diacritic-tolerant search key.
#[derive(Debug, Clone)]
pub struct TolerantPattern {
    atoms: Vec<Atom>,
    /// Single-word keys must sit on word boundaries.
    anchored: bool,
}

impl TolerantPattern {
    /// Compile a key. Returns `None` when the key has no Arabic letters to anchor on.
    pub fn new(key: &str) -> Option<Self> {
        let mut atoms = Vec::new();

        for ch in key.nfc() {
            if is_diacritic(ch) {
                continue;
            }
            if ch.is_whitespace() {
                if matches!(atoms.last(), Some(Atom::Letter(_))) {
                    atoms.push(Atom::Gap);
                }
            } else if is_arabic(ch) {
                atoms.push(Atom::Letter(Letter::new(ch)));
            }
        }

        if atoms.last() == Some(&Atom::Gap) {
            atoms.pop();
        }
        if atoms.is_empty() {
            return None;
        }

        Some(Self {
            atoms,
            anchored: key.split_whitespace().count() == 1,
        })
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Byte range of the first match in `haystack`, trailing marks included.
    pub fn find(&self, haystack: &str) -> Option<Range<usize>> {
        self.find_where(haystack, |_| true)
    }

    /// Like [`find`](Self::find), but skips matches `accept` rejects.
    pub fn find_where(
        &self,
        haystack: &str,
        accept: impl Fn(&Range<usize>) -> bool,
    ) -> Option<Range<usize>> {
        let chars: Vec<(usize, char)> = haystack.char_indices().collect();

        for start in 0..chars.len() {
            if self.anchored && !boundary_before(&chars, start) {
                continue;
            }
            let Some(end) = self.match_at(&chars, start) else {
                continue;
            };
            if self.anchored && !boundary_after(&chars, end) {
                continue;
            }
            let end_byte = chars.get(end).map(|&(i, _)| i).unwrap_or(haystack.len());
            let range = chars[start].0..end_byte;
            if accept(&range) {
                return Some(range);
            }
        }

        None
    }

    /// Char index just past the match starting at `start`, if any.
    fn match_at(&self, chars: &[(usize, char)], start: usize) -> Option<usize> {
        let mut h = start;

        for atom in &self.atoms {
            match *atom {
                Atom::Letter(letter) => {
                    h = letter.match_at(chars, h)?;
                    while h < chars.len() && is_diacritic(chars[h].1) {
                        h += 1;
                    }
                }
                Atom::Gap => {
                    let gap_start = h;
                    while h < chars.len() && chars[h].1.is_whitespace() {
                        h += 1;
                    }
                    if h == gap_start {
                        return None;
                    }
                }
            }
        }

        Some(h)
    }
}

/// First case-insensitive occurrence of `needle` as a whole word in `haystack`.
pub fn find_word_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    find_word_ignore_case_where(haystack, needle, |_| true)
}

/// Like [`find_word_ignore_case`], but skips matches `accept` rejects.
pub fn find_word_ignore_case_where(
    haystack: &str,
    needle: &str,
    accept: impl Fn(&Range<usize>) -> bool,
) -> Option<Range<usize>> {
    let needle: Vec<char> = needle.trim().chars().collect();
    if needle.is_empty() {
        return None;
    }
    let chars: Vec<(usize, char)> = haystack.char_indices().collect();
    if chars.len() < needle.len() {
        return None;
    }

    for start in 0..=chars.len() - needle.len() {
        if !boundary_before(&chars, start) {
            continue;
        }
        let end = start + needle.len();
        let same = chars[start..end]
            .iter()
            .zip(&needle)
            .all(|(&(_, a), &b)| a.to_lowercase().eq(b.to_lowercase()));
        if same && boundary_after(&chars, end) {
            let end_byte = chars.get(end).map(|&(i, _)| i).unwrap_or(haystack.len());
            let range = chars[start].0..end_byte;
            if accept(&range) {
                return Some(range);
            }
        }
    }

    None
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || is_diacritic(c) || is_combining_mark(c)
}

fn boundary_before(chars: &[(usize, char)], start: usize) -> bool {
    start == 0 || !is_word_char(chars[start - 1].1)
}

fn boundary_after(chars: &[(usize, char)], end: usize) -> bool {
    end >= chars.len() || !is_word_char(chars[end].1)
}
