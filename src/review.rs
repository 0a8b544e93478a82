//! Human review of corrected translations.
//!
//! Every corrected translation can be queued for review. Approving one
//! copies it into the training corpus; declining only records the verdict.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{ReviewError, StoreError};
use crate::storage;
use crate::substitute::Substitution;
use crate::translator::Translation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Declined,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Declined => "declined",
        })
    }
}

/// A translation before and after lexical correction, with its review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: u64,
    pub english: String,
    pub context: String,
    pub raw_arabic: String,
    pub raw_transliteration: String,
    pub final_arabic: String,
    pub final_transliteration: String,
    pub replacements: Vec<String>,
    pub status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusSource {
    Approved,
    UserCorrected,
    ManualAddition,
}

/// One training pair in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub english: String,
    pub arabic: String,
    pub transliteration: String,
    /// Domain hint the translation was made for.
    pub context: String,
    /// Curator's remark.
    #[serde(default)]
    pub notes: String,
    pub quality_score: f64,
    pub source: CorpusSource,
    pub created_at: DateTime<Utc>,
}

impl CorpusEntry {
    fn new(
        english: &str,
        arabic: &str,
        transliteration: &str,
        context: &str,
        quality_score: f64,
        source: CorpusSource,
    ) -> Self {
        Self {
            english: english.to_string(),
            arabic: arabic.to_string(),
            transliteration: transliteration.to_string(),
            context: context.to_string(),
            notes: String::new(),
            quality_score,
            source,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub pending: usize,
    pub approved: usize,
    pub declined: usize,
    pub corpus_size: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ReviewState {
    next_id: u64,
    records: Vec<TranslationRecord>,
    corpus: Vec<CorpusEntry>,
}

/// Review queue and training corpus, persisted to one JSON file.
///
/// Reads load the file; writes run under the file lock.
#[derive(Debug, Clone)]
pub struct ReviewLog {
    path: PathBuf,
}

impl ReviewLog {
    pub const FILE_NAME: &'static str = "translation_reviews.json";

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ReviewState, StoreError> {
        storage::load_or_default(&self.path)
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut ReviewState) -> Result<R, ReviewError>,
    ) -> Result<R, ReviewError> {
        storage::update(&self.path, f)
    }

    /// Queue a corrected translation for review. Returns its id.
    pub fn submit(
        &self,
        english: &str,
        context: &str,
        raw: &Translation,
        corrected: &Substitution,
    ) -> Result<u64, ReviewError> {
        let id = self.mutate(|state| {
            state.next_id += 1;
            let id = state.next_id;
            state.records.push(TranslationRecord {
                id,
                english: english.to_string(),
                context: context.to_string(),
                raw_arabic: raw.arabic.clone(),
                raw_transliteration: raw.transliteration.clone(),
                final_arabic: corrected.arabic.clone(),
                final_transliteration: corrected.transliteration.clone(),
                replacements: corrected.fired(),
                status: ReviewStatus::Pending,
                reviewed_by: None,
                review_notes: None,
                created_at: Utc::now(),
                reviewed_at: None,
            });
            Ok(id)
        })?;
        info!(id, "Translation queued for review");
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Result<TranslationRecord, ReviewError> {
        self.load()?
            .records
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(ReviewError::NotFound(id))
    }

    /// Pending records, newest first.
    pub fn pending(&self, limit: usize) -> Result<Vec<TranslationRecord>, ReviewError> {
        Ok(self
            .load()?
            .records
            .into_iter()
            .rev()
            .filter(|r| r.status == ReviewStatus::Pending)
            .take(limit)
            .collect())
    }

    /// Approve a pending record and add its final text to the corpus.
    pub fn approve(&self, id: u64, reviewer: &str, notes: &str) -> Result<(), ReviewError> {
        self.mutate(|state| {
            let record = close(state, id, ReviewStatus::Approved, reviewer, notes)?;
            let entry = CorpusEntry::new(
                &record.english,
                &record.final_arabic,
                &record.final_transliteration,
                &record.context,
                1.0,
                CorpusSource::Approved,
            );
            state.corpus.push(CorpusEntry {
                notes: notes.to_string(),
                ..entry
            });
            Ok(())
        })?;
        info!(id, reviewer, "Approved translation");
        Ok(())
    }

    pub fn decline(&self, id: u64, reviewer: &str, notes: &str) -> Result<(), ReviewError> {
        self.mutate(|state| close(state, id, ReviewStatus::Declined, reviewer, notes).map(|_| ()))?;
        info!(id, reviewer, "Declined translation");
        Ok(())
    }

    /// Record a reviewer's own translation as a corpus entry.
    pub fn add_correction(
        &self,
        english: &str,
        arabic: &str,
        transliteration: &str,
        context: &str,
        reason: &str,
    ) -> Result<(), ReviewError> {
        let entry = CorpusEntry::new(
            english,
            arabic,
            transliteration,
            context,
            0.9,
            CorpusSource::UserCorrected,
        );
        self.push_corpus(CorpusEntry {
            notes: reason.to_string(),
            ..entry
        })
    }

    /// Add a hand-written training pair.
    pub fn add_training_pair(
        &self,
        english: &str,
        arabic: &str,
        transliteration: &str,
        context: &str,
    ) -> Result<(), ReviewError> {
        self.push_corpus(CorpusEntry::new(
            english,
            arabic,
            transliteration,
            context,
            1.0,
            CorpusSource::ManualAddition,
        ))
    }

    fn push_corpus(&self, entry: CorpusEntry) -> Result<(), ReviewError> {
        self.mutate(|state| {
            state.corpus.push(entry);
            Ok(())
        })
    }

    /// Number of corpus entries that came from approvals.
    pub fn approved_count(&self) -> Result<usize, ReviewError> {
        Ok(self
            .load()?
            .corpus
            .iter()
            .filter(|e| e.source == CorpusSource::Approved)
            .count())
    }

    /// Corpus entries at or above `min_quality`.
    pub fn corpus(&self, min_quality: f64) -> Result<Vec<CorpusEntry>, ReviewError> {
        Ok(self
            .load()?
            .corpus
            .into_iter()
            .filter(|e| e.quality_score >= min_quality)
            .collect())
    }

    pub fn stats(&self) -> Result<ReviewStats, ReviewError> {
        let state = self.load()?;
        let count = |s: ReviewStatus| state.records.iter().filter(|r| r.status == s).count();
        Ok(ReviewStats {
            pending: count(ReviewStatus::Pending),
            approved: count(ReviewStatus::Approved),
            declined: count(ReviewStatus::Declined),
            corpus_size: state.corpus.len(),
        })
    }
}

/// Move a pending record to `status`. Returns the updated record.
fn close(
    state: &mut ReviewState,
    id: u64,
    status: ReviewStatus,
    reviewer: &str,
    notes: &str,
) -> Result<TranslationRecord, ReviewError> {
    let record = state
        .records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(ReviewError::NotFound(id))?;

    if record.status != ReviewStatus::Pending {
        return Err(ReviewError::AlreadyReviewed {
            id,
            status: record.status,
        });
    }

    record.status = status;
    record.reviewed_by = Some(reviewer.to_string());
    record.review_notes = (!notes.is_empty()).then(|| notes.to_string());
    record.reviewed_at = Some(Utc::now());
    Ok(record.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ReplacementRule;
    use crate::substitute::apply_rules;

    fn queued(log: &ReviewLog, english: &str) -> u64 {
        let raw = Translation {
            arabic: "بِدّي كُرة".to_string(),
            transliteration: "biddi kura".to_string(),
        };
        let rules = [ReplacementRule::new("كرة", "kura", "طابة", "taabeh")];
        let corrected = apply_rules(&raw.arabic, &raw.transliteration, &rules);
        log.submit(english, "sports", &raw, &corrected).unwrap()
    }

    #[test]
    fn submit_records_both_versions() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::open(dir.path().join(ReviewLog::FILE_NAME));
        let id = queued(&log, "I want a ball");

        let record = log.get(id).unwrap();
        assert_eq!(record.raw_arabic, "بِدّي كُرة");
        assert_eq!(record.final_arabic, "بِدّي طابة");
        assert_eq!(record.final_transliteration, "biddi taabeh");
        assert_eq!(record.replacements, vec!["كرة → طابة".to_string()]);
        assert_eq!(record.status, ReviewStatus::Pending);
    }

    #[test]
    fn pending_is_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::open(dir.path().join(ReviewLog::FILE_NAME));
        let a = queued(&log, "one");
        let b = queued(&log, "two");
        let c = queued(&log, "three");
        log.decline(b, "admin", "").unwrap();

        let ids: Vec<u64> = log.pending(10).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c, a]);
        assert_eq!(log.pending(1).unwrap().len(), 1);
    }

    #[test]
    fn approve_adds_to_corpus_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ReviewLog::FILE_NAME);
        let log = ReviewLog::open(&path);
        let id = queued(&log, "I want a ball");

        log.approve(id, "reviewer", "looks right").unwrap();
        assert!(matches!(
            log.approve(id, "reviewer", ""),
            Err(ReviewError::AlreadyReviewed { status: ReviewStatus::Approved, .. })
        ));
        assert!(matches!(log.decline(99, "reviewer", ""), Err(ReviewError::NotFound(99))));

        let reopened = ReviewLog::open(&path);
        assert_eq!(reopened.approved_count().unwrap(), 1);
        let corpus = reopened.corpus(0.0).unwrap();
        assert_eq!(corpus[0].arabic, "بِدّي طابة");
        assert_eq!(corpus[0].context, "sports");
        assert_eq!(corpus[0].notes, "looks right");
        let record = reopened.get(id).unwrap();
        assert_eq!(record.reviewed_by.as_deref(), Some("reviewer"));
        assert_eq!(record.review_notes.as_deref(), Some("looks right"));
        assert!(record.reviewed_at.is_some());
    }

    #[test]
    fn corrections_have_lower_quality() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::open(dir.path().join(ReviewLog::FILE_NAME));
        log.add_correction("ball", "طابة", "taabeh", "sports", "user fix")
            .unwrap();
        log.add_training_pair("now", "هلأ", "halla2", "time").unwrap();

        assert_eq!(log.corpus(0.95).unwrap().len(), 1);
        let corpus = log.corpus(0.0).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].context, "sports");
        assert_eq!(corpus[0].notes, "user fix");
        assert_eq!(corpus[1].context, "time");
        assert_eq!(corpus[1].notes, "");
        assert_eq!(log.approved_count().unwrap(), 0);

        let stats = log.stats().unwrap();
        assert_eq!(stats.corpus_size, 2);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn two_logs_on_one_file_share_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ReviewLog::FILE_NAME);
        let translating = ReviewLog::open(&path);
        let reviewing = ReviewLog::open(&path);

        let first = queued(&translating, "one");
        reviewing.approve(first, "admin", "").unwrap();
        let second = queued(&translating, "two");

        assert_ne!(first, second);
        assert_eq!(translating.get(first).unwrap().status, ReviewStatus::Approved);
        assert_eq!(reviewing.pending(10).unwrap().len(), 1);
    }
}
