use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::errors::InputError;
use crate::review::ReviewLog;
use crate::rules::RuleStore;
use crate::substitute::{self, Substitution};
use crate::transliterate::ChatAlphabet;
use crate::translator::{Translation, Translator};

/// Everything produced for one English input.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    pub english: String,
    pub context: String,
    /// Translator output, with a derived transliteration if it sent none.
    pub raw: Translation,
    pub corrected: Substitution,
    pub transliteration_derived: bool,
    pub review_id: Option<u64>,
}

/// Translator → transliteration fallback → lexical correction → review queue.
pub struct TranslationService<'a> {
    translator: &'a dyn Translator,
    rules: &'a dyn RuleStore,
    alphabet: &'a ChatAlphabet,
    review: Option<&'a ReviewLog>,
}

impl<'a> TranslationService<'a> {
    pub fn new(
        translator: &'a dyn Translator,
        rules: &'a dyn RuleStore,
        alphabet: &'a ChatAlphabet,
    ) -> Self {
        Self {
            translator,
            rules,
            alphabet,
            review: None,
        }
    }

    /// Queue every outcome in `review`.
    pub fn with_review(mut self, review: &'a ReviewLog) -> Self {
        self.review = Some(review);
        self
    }

    /// Run the full pipeline for one input.
    #[tracing::instrument(skip_all, fields(chars = english.chars().count()))]
    pub fn translate(&self, english: &str, context: &str) -> Result<TranslationOutcome> {
        let english = english.trim();
        if english.is_empty() {
            return Err(InputError::Empty { field: "english" }.into());
        }
        let started = Instant::now();

        // ── Upstream translation ────────────────────────────────────
        let mut raw = {
            let _span = info_span!("translate").entered();
            self.translator.translate(english, context)?
        };

        let transliteration_derived = raw.transliteration.trim().is_empty();
        if transliteration_derived {
            debug!("Translator sent no transliteration, deriving one");
            raw.transliteration = self.alphabet.transliterate(&raw.arabic);
        }

        // ── Lexical correction ──────────────────────────────────────
        let corrected = {
            let _span = info_span!("correct").entered();
            substitute::correct(self.rules, &raw.arabic, &raw.transliteration)
        };

        // ── Review queue ────────────────────────────────────────────
        let review_id = self.review.and_then(|log| {
            match log.submit(english, context, &raw, &corrected) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "Cannot queue translation for review");
                    None
                }
            }
        });

        info!(
            replacements = corrected.applied.len(),
            derived_transliteration = transliteration_derived,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Translation complete"
        );

        Ok(TranslationOutcome {
            english: english.to_string(),
            context: context.to_string(),
            raw,
            corrected,
            transliteration_derived,
            review_id,
        })
    }
}
