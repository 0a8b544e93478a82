use thiserror::Error;

use crate::review::ReviewStatus;

// ── Input errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Missing required input: {field}")]
    Empty { field: &'static str },
}

// ── Store errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot read store file: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write store file: {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file is corrupt: {path}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid replacement rule: {0}")]
    InvalidRule(String),

    #[error("No replacement rule for \"{0}\"")]
    NotFound(String),

    #[error("Store lock poisoned by a panicked writer")]
    Poisoned,

    #[error("Store file is locked by another writer: {path}")]
    Locked { path: String },
}

// ── Translator errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("Translation unavailable: environment variable {var} is not set")]
    MissingApiKey { var: String },

    #[error("Translation unavailable: cannot build HTTP client: {0}")]
    Client(String),

    #[error("Translation unavailable: request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Translation unavailable: network error: {0}")]
    Network(String),

    #[error("Translation unavailable: upstream returned HTTP {status}")]
    Http { status: u16, body: String },

    #[error("Translation unavailable: unexpected upstream response: {0}")]
    InvalidResponse(String),
}

impl TranslatorError {
    /// Network failures, timeouts and 429/5xx answers may succeed on a later call.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslatorError::Timeout { .. } | TranslatorError::Network(_) => true,
            TranslatorError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Review errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No translation with id {0}")]
    NotFound(u64),

    #[error("Translation {id} was already {status}")]
    AlreadyReviewed { id: u64, status: ReviewStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ── Config errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

// ── Exit codes ───────────────────────────────────────────────────────

pub struct ExitCode;

impl ExitCode {
    pub const SUCCESS: i32 = 0;

    // Input errors (10)
    pub const INPUT: i32 = 10;

    // Store errors (20-21)
    pub const STORE_IO: i32 = 20;
    pub const STORE_RULE: i32 = 21;

    // Translator errors (30-31)
    pub const TRANSLATOR_CONFIG: i32 = 30;
    pub const TRANSLATOR_UNAVAILABLE: i32 = 31;

    // Review errors (40-41)
    pub const REVIEW_NOT_FOUND: i32 = 40;
    pub const REVIEW_STATE: i32 = 41;

    // Config errors (50)
    pub const CONFIG: i32 = 50;

    // Unknown (99)
    pub const UNKNOWN: i32 = 99;

    /// Walk the anyhow error chain and return the appropriate exit code.
    pub fn from_error(err: &anyhow::Error) -> i32 {
        for cause in err.chain() {
            if cause.downcast_ref::<InputError>().is_some() {
                return Self::INPUT;
            }
            if let Some(e) = cause.downcast_ref::<StoreError>() {
                return Self::from_store(e);
            }
            if let Some(e) = cause.downcast_ref::<TranslatorError>() {
                return match e {
                    TranslatorError::MissingApiKey { .. } | TranslatorError::Client(_) => {
                        Self::TRANSLATOR_CONFIG
                    }
                    TranslatorError::Timeout { .. }
                    | TranslatorError::Network(_)
                    | TranslatorError::Http { .. }
                    | TranslatorError::InvalidResponse(_) => Self::TRANSLATOR_UNAVAILABLE,
                };
            }
            if let Some(e) = cause.downcast_ref::<ReviewError>() {
                return match e {
                    ReviewError::NotFound(_) => Self::REVIEW_NOT_FOUND,
                    ReviewError::AlreadyReviewed { .. } => Self::REVIEW_STATE,
                    ReviewError::Store(inner) => Self::from_store(inner),
                };
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::CONFIG;
            }
        }
        Self::UNKNOWN
    }

    fn from_store(err: &StoreError) -> i32 {
        match err {
            StoreError::InvalidRule(_) | StoreError::NotFound(_) => Self::STORE_RULE,
            StoreError::Read { .. }
            | StoreError::Write { .. }
            | StoreError::Corrupt { .. }
            | StoreError::Serialize(_)
            | StoreError::Poisoned
            | StoreError::Locked { .. } => Self::STORE_IO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_follows_error_chain() {
        let err = Err::<(), _>(StoreError::NotFound("كرة".into()))
            .context("Deleting rule")
            .unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::STORE_RULE);

        let err = anyhow::Error::from(TranslatorError::Timeout { seconds: 30 });
        assert_eq!(ExitCode::from_error(&err), ExitCode::TRANSLATOR_UNAVAILABLE);

        let err = anyhow::Error::from(ReviewError::NotFound(7));
        assert_eq!(ExitCode::from_error(&err), ExitCode::REVIEW_NOT_FOUND);

        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_error(&err), ExitCode::UNKNOWN);
    }

    #[test]
    fn transient_translator_errors() {
        assert!(TranslatorError::Network("reset".into()).is_transient());
        assert!(TranslatorError::Http { status: 503, body: String::new() }.is_transient());
        assert!(!TranslatorError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!TranslatorError::MissingApiKey { var: "KEY".into() }.is_transient());
    }
}
