//! Arabic script to Latin chat-alphabet transliteration.
//!
//! The mapping lives in a [`ChatAlphabet`] table so that alternative
//! conventions can be loaded from a file instead of being compiled in.
//! Scanning is greedy longest-match: multi-letter sequences are tried
//! before single letters. Ta marbuta is positional: it takes one form
//! at the end of a word and another inside one.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::diacritics::strip_diacritics;
use crate::errors::ConfigError;

const TA_MARBUTA: char = 'ة';

/// Punctuation copied through as-is. Also ends a word for ta marbuta.
const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '`', '-', '،', '؛',
    '؟',
];

/// Canonical Levantine chat-alphabet table, in registration order.
static LEVANTINE: &[(&str, &str)] = &[
    // Hamza and its carriers
    ("ء", "2"),
    ("أ", "2a"),
    ("إ", "2i"),
    ("ؤ", "2u"),
    ("ئ", "2i"),
    ("آ", "2a"),
    // Letters
    ("ا", "a"),
    ("ب", "b"),
    ("ت", "t"),
    ("ث", "th"),
    ("ج", "j"),
    ("ح", "7"),
    ("خ", "kh"),
    ("د", "d"),
    ("ذ", "z"),
    ("ر", "r"),
    ("ز", "z"),
    ("س", "s"),
    ("ش", "sh"),
    ("ص", "S"),
    ("ض", "D"),
    ("ط", "T"),
    ("ظ", "z"),
    ("ع", "3"),
    ("غ", "gh"),
    ("ف", "f"),
    ("ق", "2"),
    ("ك", "k"),
    ("ل", "l"),
    ("م", "m"),
    ("ن", "n"),
    ("ه", "h"),
    ("و", "w"),
    ("ي", "y"),
    ("ى", "a"),
    // Combinations
    ("لا", "la"),
    ("الل", "all"),
];

/// One row of an alphabet table as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphabetEntry {
    pub arabic: String,
    pub latin: String,
}

/// Serializable form of a chat-alphabet table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphabetTable {
    pub entries: Vec<AlphabetEntry>,
    #[serde(default = "default_ta_final")]
    pub ta_marbuta_final: String,
    #[serde(default = "default_ta_medial")]
    pub ta_marbuta_medial: String,
}

fn default_ta_final() -> String {
    "eh".to_string()
}

fn default_ta_medial() -> String {
    "a".to_string()
}

impl AlphabetTable {
    pub fn levantine() -> Self {
        Self {
            entries: LEVANTINE
                .iter()
                .map(|&(arabic, latin)| AlphabetEntry {
                    arabic: arabic.to_string(),
                    latin: latin.to_string(),
                })
                .collect(),
            ta_marbuta_final: default_ta_final(),
            ta_marbuta_medial: default_ta_medial(),
        }
    }
}

/// A compiled chat-alphabet mapping.
#[derive(Debug, Clone)]
pub struct ChatAlphabet {
    singles: HashMap<char, String>,
    /// Multi-letter sequences, longest first, registration order within a length.
    sequences: Vec<(Vec<char>, String)>,
    ta_final: String,
    ta_medial: String,
}

impl ChatAlphabet {
    /// The built-in Levantine convention.
    pub fn levantine() -> Self {
        Self::from_table(&AlphabetTable::levantine())
    }

    /// Compile a table. The first registration of a key wins; empty keys are ignored.
    pub fn from_table(table: &AlphabetTable) -> Self {
        let mut singles = HashMap::new();
        let mut sequences: Vec<(Vec<char>, String)> = Vec::new();

        for entry in &table.entries {
            let key: Vec<char> = entry.arabic.nfc().collect();
            match key.len() {
                0 => {}
                1 => {
                    singles.entry(key[0]).or_insert_with(|| entry.latin.clone());
                }
                _ => {
                    if !sequences.iter().any(|(k, _)| *k == key) {
                        sequences.push((key, entry.latin.clone()));
                    }
                }
            }
        }

        // Stable: equal lengths keep registration order.
        sequences.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            singles,
            sequences,
            ta_final: table.ta_marbuta_final.clone(),
            ta_medial: table.ta_marbuta_medial.clone(),
        }
    }

    /// Load a table from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let table: AlphabetTable = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_table(&table))
    }

    /// Transliterate Arabic text. Never fails: unmapped characters pass through.
    pub fn transliterate(&self, arabic_text: &str) -> String {
        let clean = clean_for_mapping(arabic_text);
        let mut out = String::with_capacity(clean.len() * 2);
        let mut i = 0;

        'scan: while i < clean.len() {
            for (key, latin) in &self.sequences {
                if clean[i..].starts_with(key) {
                    out.push_str(latin);
                    i += key.len();
                    continue 'scan;
                }
            }

            let ch = clean[i];
            if ch == TA_MARBUTA {
                if ends_word(clean.get(i + 1).copied()) {
                    out.push_str(&self.ta_final);
                } else {
                    out.push_str(&self.ta_medial);
                }
            } else if let Some(latin) = self.singles.get(&ch) {
                out.push_str(latin);
            } else if ch.is_whitespace() {
                out.push(' ');
            } else {
                // Punctuation, digits and anything unmapped
                out.push(ch);
            }
            i += 1;
        }

        out.trim().to_string()
    }
}

impl Default for ChatAlphabet {
    fn default() -> Self {
        Self::levantine()
    }
}

/// Transliterate with the built-in Levantine table.
pub fn transliterate(arabic_text: &str) -> String {
    static DEFAULT: OnceLock<ChatAlphabet> = OnceLock::new();
    DEFAULT
        .get_or_init(ChatAlphabet::levantine)
        .transliterate(arabic_text)
}

/// Strip tashkeel, recompose hamza carriers, drop any leftover marks.
fn clean_for_mapping(text: &str) -> Vec<char> {
    strip_diacritics(text)
        .nfc()
        .filter(|&c| !is_combining_mark(c))
        .collect()
}

fn ends_word(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || PUNCTUATION.contains(&c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_letters() {
        assert_eq!(transliterate("بيت"), "byt");
        assert_eq!(transliterate("شو"), "shw");
    }

    #[test]
    fn ta_marbuta_word_final() {
        assert_eq!(transliterate("مدرسة"), "mdrseh");
        assert_eq!(transliterate("مدرسةٌ شو"), "mdrseh shw");
        assert_eq!(transliterate("مدرسة."), "mdrseh.");
        assert_eq!(transliterate("مدرسة؟"), "mdrseh؟");
    }

    #[test]
    fn ta_marbuta_medial() {
        assert_eq!(transliterate("سيارةكم"), "syarakm");
    }

    #[test]
    fn digraphs_take_precedence() {
        assert_eq!(transliterate("لا"), "la");
        assert_eq!(transliterate("الله"), "allh");
        assert_eq!(transliterate("الولد"), "alwld");
    }

    #[test]
    fn diacritics_are_ignored() {
        assert_eq!(transliterate("بِدّي"), transliterate("بدي"));
        assert_eq!(transliterate("كُرَة"), "kreh");
    }

    #[test]
    fn hamza_carriers_survive_decomposition() {
        assert_eq!(transliterate("أنا"), "2ana");
        // alef + combining hamza above, written decomposed
        assert_eq!(transliterate("\u{0627}\u{0654}نا"), "2ana");
        assert_eq!(transliterate("إنت"), "2int");
    }

    #[test]
    fn passthrough_and_trim() {
        assert_eq!(transliterate("  3 كتب!  "), "3 ktb!");
        assert_eq!(transliterate("hello"), "hello");
        assert_eq!(transliterate("😀 ب"), "😀 b");
        assert_eq!(transliterate(""), "");
    }

    #[test]
    fn whitespace_becomes_single_spaces() {
        assert_eq!(transliterate("ب\tب\nب"), "b b b");
    }

    #[test]
    fn custom_table_first_registration_wins() {
        let table = AlphabetTable {
            entries: vec![
                AlphabetEntry { arabic: "ق".into(), latin: "q".into() },
                AlphabetEntry { arabic: "ق".into(), latin: "2".into() },
                AlphabetEntry { arabic: "قل".into(), latin: "QL".into() },
                AlphabetEntry { arabic: "لب".into(), latin: "LB".into() },
                AlphabetEntry { arabic: "ب".into(), latin: "b".into() },
            ],
            ta_marbuta_final: "a".into(),
            ta_marbuta_medial: "at".into(),
        };
        let alphabet = ChatAlphabet::from_table(&table);
        assert_eq!(alphabet.transliterate("ق"), "q");
        assert_eq!(alphabet.transliterate("قلب"), "QLb");
        assert_eq!(alphabet.transliterate("ة"), "a");
    }

    #[test]
    fn table_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alphabet.json");
        std::fs::write(
            &path,
            r#"{"entries":[{"arabic":"ب","latin":"B"}],"ta_marbuta_final":"ah"}"#,
        )
        .unwrap();
        let alphabet = ChatAlphabet::from_json(&path).unwrap();
        assert_eq!(alphabet.transliterate("ب ة"), "B ah");
        assert_eq!(alphabet.transliterate("بةب"), "BaB");
    }

    #[test]
    fn missing_table_file_is_config_error() {
        let err = ChatAlphabet::from_json(Path::new("/nonexistent/alphabet.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
