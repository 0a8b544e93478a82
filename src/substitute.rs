//! Levantine lexical post-correction for translator output.
//!
//! Rewrites an Arabic string and its transliteration in lockstep using
//! the curated replacement rules. Rules run longest key first, and each
//! rule rewrites at most its first occurrence, so every fired rule is
//! exactly one visible edit for the reviewer.

use std::cmp::Reverse;
use std::ops::Range;

use serde::Serialize;
use tracing::{debug, warn};

use crate::diacritics::{comparison_key, is_diacritic};
use crate::matcher::{find_word_ignore_case_where, TolerantPattern};
use crate::rules::{ReplacementRule, RuleStore};

/// A rule that fired during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRule {
    pub original_arabic: String,
    pub replacement_arabic: String,
    /// Whether the rule's transliteration was found and rewritten too.
    pub transliteration_aligned: bool,
}

impl AppliedRule {
    pub fn describe(&self) -> String {
        format!("{} → {}", self.original_arabic, self.replacement_arabic)
    }
}

/// Result of a substitution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub arabic: String,
    pub transliteration: String,
    pub applied: Vec<AppliedRule>,
}

impl Substitution {
    fn unchanged(arabic: &str, transliteration: &str) -> Self {
        Self {
            arabic: arabic.to_string(),
            transliteration: transliteration.to_string(),
            applied: Vec::new(),
        }
    }

    /// "original → replacement" for every fired rule, in firing order.
    pub fn fired(&self) -> Vec<String> {
        self.applied.iter().map(AppliedRule::describe).collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn into_parts(self) -> (String, String, Vec<String>) {
        let fired = self.fired();
        (self.arabic, self.transliteration, fired)
    }
}

/// Text being rewritten plus the spans earlier rules already produced.
struct Edited {
    text: String,
    written: Vec<Range<usize>>,
}

impl Edited {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            written: Vec::new(),
        }
    }

    fn is_untouched(&self, range: &Range<usize>) -> bool {
        self.written
            .iter()
            .all(|w| range.end <= w.start || range.start >= w.end)
    }

    fn splice(&mut self, range: Range<usize>, replacement: &str) {
        let removed = range.end - range.start;
        for w in &mut self.written {
            if w.start >= range.end {
                w.start = w.start - removed + replacement.len();
                w.end = w.end - removed + replacement.len();
            }
        }
        self.text.replace_range(range.clone(), replacement);
        self.written
            .push(range.start..range.start + replacement.len());
    }
}

/// Key length used for ordering: letters only, marks not counted.
fn key_length(rule: &ReplacementRule) -> usize {
    rule.original_arabic
        .chars()
        .filter(|&c| !is_diacritic(c))
        .count()
}

/// Apply `rules` to an Arabic string and its aligned transliteration.
///
/// Never fails. Rules with an empty key or no Arabic letters are skipped.
/// Equal-length keys keep the order they were given in.
pub fn apply_rules(
    arabic_text: &str,
    transliteration_text: &str,
    rules: &[ReplacementRule],
) -> Substitution {
    let mut ordered: Vec<&ReplacementRule> = rules.iter().collect();
    ordered.sort_by_key(|r| Reverse(key_length(r)));

    let mut arabic = Edited::new(arabic_text);
    let mut translit = Edited::new(transliteration_text);
    let mut haystack_key = comparison_key(arabic_text);
    let mut applied = Vec::new();

    for rule in ordered {
        let key = comparison_key(&rule.original_arabic);
        if key.is_empty() {
            debug!("Skipping rule with empty key");
            continue;
        }
        if !haystack_key.contains(&key) {
            continue;
        }
        let Some(pattern) = TolerantPattern::new(&rule.original_arabic) else {
            debug!(key = %rule.original_arabic, "Skipping rule without Arabic letters");
            continue;
        };
        let Some(range) = pattern.find_where(&arabic.text, |r| arabic.is_untouched(r)) else {
            continue;
        };

        // Both sides are decided before either is committed.
        let translit_range = find_word_ignore_case_where(
            &translit.text,
            &rule.original_transliteration,
            |r| translit.is_untouched(r),
        );
        if translit_range.is_none() {
            debug!(
                key = %rule.original_arabic,
                transliteration = %rule.original_transliteration,
                "Transliteration counterpart not found"
            );
        }

        arabic.splice(range, &rule.replacement_arabic);
        let transliteration_aligned = match translit_range {
            Some(r) => {
                translit.splice(r, &rule.replacement_transliteration);
                true
            }
            None => false,
        };
        haystack_key = comparison_key(&arabic.text);

        applied.push(AppliedRule {
            original_arabic: rule.original_arabic.clone(),
            replacement_arabic: rule.replacement_arabic.clone(),
            transliteration_aligned,
        });
    }

    Substitution {
        arabic: arabic.text,
        transliteration: translit.text,
        applied,
    }
}

/// Run a substitution pass against a rule store and record usage.
///
/// A failed rule read degrades to no substitutions; a failed usage
/// update is logged and does not undo the pass.
#[tracing::instrument(skip_all)]
pub fn correct(store: &dyn RuleStore, arabic_text: &str, transliteration_text: &str) -> Substitution {
    let rules = match store.list_rules() {
        Ok(rules) => rules,
        Err(e) => {
            warn!(error = %e, "Cannot read replacement rules, skipping substitutions");
            return Substitution::unchanged(arabic_text, transliteration_text);
        }
    };

    let result = apply_rules(arabic_text, transliteration_text, &rules);

    for rule in &result.applied {
        if let Err(e) = store.record_usage(&rule.original_arabic) {
            warn!(key = %rule.original_arabic, error = %e, "Cannot record rule usage");
        }
    }

    debug!(
        rules = rules.len(),
        fired = result.applied.len(),
        "Substitution pass complete"
    );
    result
}

// ── Tests ───────────────────────────────────────────────────────────
