//! English to Levantine Arabic translation support.
//!
//! The core is [`substitute::apply_rules`], which nudges Modern Standard
//! Arabic translator output toward colloquial Levantine with a curated
//! dictionary, and [`transliterate::transliterate`], which derives a
//! chat-alphabet rendering from Arabic script. Around them sit the rule
//! store, the upstream translator client, the review log and the
//! pipeline tying them together.

pub mod config;
pub mod diacritics;
pub mod errors;
pub mod matcher;
pub mod pipeline;
pub mod review;
pub mod rules;
pub mod storage;
pub mod substitute;
pub mod translator;
pub mod transliterate;

pub use diacritics::strip_diacritics;
pub use rules::{ReplacementRule, RuleStore};
pub use substitute::{apply_rules, Substitution};
pub use transliterate::transliterate;
