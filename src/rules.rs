//! Replacement rules and the stores that hold them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::storage::{self, lock};

/// One curated substitution: an MSA word or phrase and its Levantine form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub original_arabic: String,
    pub original_transliteration: String,
    pub replacement_arabic: String,
    pub replacement_transliteration: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub usage_count: u64,
}

impl ReplacementRule {
    pub fn new(
        original_arabic: impl Into<String>,
        original_transliteration: impl Into<String>,
        replacement_arabic: impl Into<String>,
        replacement_transliteration: impl Into<String>,
    ) -> Self {
        Self {
            original_arabic: original_arabic.into(),
            original_transliteration: original_transliteration.into(),
            replacement_arabic: replacement_arabic.into(),
            replacement_transliteration: replacement_transliteration.into(),
            context: String::new(),
            reason: String::new(),
            usage_count: 0,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Human-readable "original → replacement" entry.
    pub fn describe(&self) -> String {
        format!("{} → {}", self.original_arabic, self.replacement_arabic)
    }
}

/// MSA → Levantine starter vocabulary: (original, translit, replacement, translit, context).
const SEED: &[(&str, &str, &str, &str, &str)] = &[
    ("كيف حالك", "kayfa haluk", "كيفك", "kifak", "greetings"),
    ("ما اسمك", "ma ismuk", "شو اسمك", "shu ismak", "greetings"),
    ("أريد", "ureed", "بدي", "biddi", "verbs"),
    ("تريد", "tureed", "بدك", "biddak", "verbs"),
    ("يريد", "yureed", "بدو", "biddo", "verbs"),
    ("نريد", "nureed", "بدنا", "biddna", "verbs"),
    ("أستطيع", "astatee3", "بقدر", "b2dar", "verbs"),
    ("تستطيع", "tastatee3", "بتقدر", "bti2dar", "verbs"),
    ("يجب", "yajib", "لازم", "lazim", "modals"),
    ("ينبغي", "yanbaghi", "لازم", "lazim", "modals"),
    ("سوف", "sawfa", "رح", "ra7", "modals"),
    ("أين", "ayna", "وين", "wen", "questions"),
    ("متى", "mata", "إيمتى", "emta", "questions"),
    ("لماذا", "limatha", "ليش", "lesh", "questions"),
    ("ماذا", "matha", "شو", "shu", "questions"),
    ("كيف", "kayfa", "كيف", "kif", "questions"),
    ("هذا", "hatha", "هاد", "had", "pronouns"),
    ("هذه", "hathihi", "هاي", "hay", "pronouns"),
    ("الذي", "allathi", "اللي", "illi", "pronouns"),
    ("التي", "allati", "اللي", "illi", "pronouns"),
    ("نحن", "na7nu", "إحنا", "i7na", "pronouns"),
    ("أنت", "anta", "إنت", "enta", "pronouns"),
];

/// Vocabulary a fresh store is seeded with.
pub fn seed_rules() -> Vec<ReplacementRule> {
    let ball = ReplacementRule::new("كُرة", "kura", "طابة", "taabeh")
        .with_context("sports, games")
        .with_reason("More commonly used Levantine word for ball");

    std::iter::once(ball)
        .chain(SEED.iter().map(|&(from, from_tr, to, to_tr, context)| {
            ReplacementRule::new(from, from_tr, to, to_tr)
                .with_context(context)
                .with_reason("Colloquial Levantine form")
        }))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub total_rules: usize,
    pub total_usage: u64,
    pub most_used: Option<(String, u64)>,
}

/// Keyed rule storage. `original_arabic` is the key.
pub trait RuleStore: Send + Sync {
    /// All rules, in insertion order.
    fn list_rules(&self) -> Result<Vec<ReplacementRule>, StoreError>;

    /// Bump the usage count of `original_arabic` by one. Unknown keys are ignored.
    fn record_usage(&self, original_arabic: &str) -> Result<(), StoreError>;

    /// Insert or overwrite the rule with the same key.
    fn add_rule(&self, rule: ReplacementRule) -> Result<(), StoreError>;

    /// Remove a rule, returning it.
    fn delete_rule(&self, original_arabic: &str) -> Result<ReplacementRule, StoreError>;

    fn stats(&self) -> Result<RuleStats, StoreError> {
        Ok(compute_stats(&self.list_rules()?))
    }
}

fn compute_stats(rules: &[ReplacementRule]) -> RuleStats {
    let most_used = rules
        .iter()
        // first rule wins a tie
        .fold(None::<&ReplacementRule>, |best, r| match best {
            Some(b) if b.usage_count >= r.usage_count => Some(b),
            _ => Some(r),
        })
        .map(|r| (r.original_arabic.clone(), r.usage_count));

    RuleStats {
        total_rules: rules.len(),
        total_usage: rules.iter().map(|r| r.usage_count).sum(),
        most_used,
    }
}

// ── Shared rule list operations ─────────────────────────────────────

fn validate(rule: &ReplacementRule) -> Result<(), StoreError> {
    if rule.original_arabic.trim().is_empty() {
        return Err(StoreError::InvalidRule(
            "original_arabic must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Insert, or overwrite the rule with the same key in its current position.
fn put(rules: &mut Vec<ReplacementRule>, rule: ReplacementRule) {
    match rules
        .iter_mut()
        .find(|r| r.original_arabic == rule.original_arabic)
    {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }
}

/// Upsert from the add operation: the rule starts over at zero uses.
fn upsert(rules: &mut Vec<ReplacementRule>, mut rule: ReplacementRule) {
    rule.usage_count = 0;
    put(rules, rule);
}

fn increment(rules: &mut [ReplacementRule], key: &str) -> bool {
    match rules.iter_mut().find(|r| r.original_arabic == key) {
        Some(rule) => {
            rule.usage_count += 1;
            true
        }
        None => false,
    }
}

fn remove(rules: &mut Vec<ReplacementRule>, key: &str) -> Result<ReplacementRule, StoreError> {
    let pos = rules
        .iter()
        .position(|r| r.original_arabic == key)
        .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
    Ok(rules.remove(pos))
}

// ── In-memory store ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<ReplacementRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store. Usage counts are kept; invalid rules are dropped.
    pub fn with_rules(rules: impl IntoIterator<Item = ReplacementRule>) -> Self {
        let mut list = Vec::new();
        for rule in rules.into_iter().filter(|r| validate(r).is_ok()) {
            put(&mut list, rule);
        }
        Self {
            rules: Mutex::new(list),
        }
    }
}

impl RuleStore for MemoryRuleStore {
    fn list_rules(&self) -> Result<Vec<ReplacementRule>, StoreError> {
        Ok(lock(&self.rules)?.clone())
    }

    fn record_usage(&self, original_arabic: &str) -> Result<(), StoreError> {
        increment(&mut *lock(&self.rules)?, original_arabic);
        Ok(())
    }

    fn add_rule(&self, rule: ReplacementRule) -> Result<(), StoreError> {
        validate(&rule)?;
        upsert(&mut *lock(&self.rules)?, rule);
        Ok(())
    }

    fn delete_rule(&self, original_arabic: &str) -> Result<ReplacementRule, StoreError> {
        remove(&mut *lock(&self.rules)?, original_arabic)
    }
}

// ── JSON file store ─────────────────────────────────────────────────

/// Rules persisted to a JSON file.
///
/// Nothing is cached: every read loads the file and every mutation runs
/// under the file lock, so several processes can share one store.
#[derive(Debug, Clone)]
pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub const FILE_NAME: &'static str = "word_replacements.json";

    /// Store at `path`. A missing file reads as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "Rule store opened");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<ReplacementRule>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        storage::update(&self.path, f)
    }
}

impl RuleStore for JsonRuleStore {
    fn list_rules(&self) -> Result<Vec<ReplacementRule>, StoreError> {
        storage::load_or_default(&self.path)
    }

    fn record_usage(&self, original_arabic: &str) -> Result<(), StoreError> {
        self.mutate(|rules| {
            increment(rules, original_arabic);
            Ok(())
        })
    }

    fn add_rule(&self, rule: ReplacementRule) -> Result<(), StoreError> {
        validate(&rule)?;
        let description = rule.describe();
        self.mutate(|rules| {
            upsert(rules, rule);
            Ok(())
        })?;
        info!(rule = %description, "Added word replacement");
        Ok(())
    }

    fn delete_rule(&self, original_arabic: &str) -> Result<ReplacementRule, StoreError> {
        let removed = self.mutate(|rules| remove(rules, original_arabic))?;
        info!(rule = %removed.describe(), "Deleted word replacement");
        Ok(removed)
    }
}
