//! Upstream English → Levantine translator.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TranslatorConfig;
use crate::errors::TranslatorError;

/// Raw translator output, before lexical correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub arabic: String,
    pub transliteration: String,
}

pub trait Translator {
    fn translate(&self, text: &str, context: &str) -> Result<Translation, TranslatorError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiTranslator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiTranslator {
    const BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta/models";

    pub fn new(api_key: String, config: &TranslatorConfig) -> Result<Self, TranslatorError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(timeout)
            .build()
            .map_err(|e| TranslatorError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            timeout,
        })
    }

    /// Build from config, reading the API key from the configured env var.
    pub fn from_env(config: &TranslatorConfig) -> Result<Self, TranslatorError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TranslatorError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(api_key, config)
    }
}

impl Translator for GeminiTranslator {
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    fn translate(&self, text: &str, context: &str) -> Result<Translation, TranslatorError> {
        let url = format!("{}/{}:generateContent", Self::BASE_URL, self.model);
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": build_prompt(text, context) }]
            }]
        });

        debug!(chars = text.chars().count(), "Requesting translation");

        let resp = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TranslatorError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    TranslatorError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            warn!(status = status.as_u16(), "Translator returned an error status");
            return Err(TranslatorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = resp
            .json()
            .map_err(|e| TranslatorError::InvalidResponse(e.to_string()))?;

        let answer = json["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["content"]["parts"].as_array())
            .and_then(|parts| parts.first())
            .and_then(|p| p["text"].as_str())
            .ok_or_else(|| TranslatorError::InvalidResponse("Missing content".to_string()))?;

        let translation = parse_answer(answer)?;
        info!(
            arabic_chars = translation.arabic.chars().count(),
            "Translation received"
        );
        Ok(translation)
    }
}

fn build_prompt(text: &str, context: &str) -> String {
    let context_clause = if context.trim().is_empty() {
        String::new()
    } else {
        format!(", context: \"{context}\"")
    };

    format!(
        r#"Translate "{text}" to colloquial Levantine Arabic (Lebanese/Syrian/Palestinian/Jordanian), not MSA{context_clause}.

Use natural daily speech as actually spoken, not formal or literary Arabic.
All Arabic text must include full diacritics (tashkeel).

Essential Levantine patterns:
- "بِدّي" (biddi) for "I want", never "أريد"
- "لازِم" (lazim) for "need to/must"
- "عَم + verb" for the present continuous
- Question words: "شو" (shu), "وين" (wen), "كيف" (kif), "ليش" (lesh), "إيمتى" (emta)
- Negation with "مش" (mish) or "مو" (mo)

Respond only in this exact format:
Arabic: [Arabic translation with full diacritics]
Transliteration: [chat-alphabet transliteration]
"#
    )
}

/// Pull the `Arabic:` and `Transliteration:` lines out of a model answer.
pub fn parse_answer(answer: &str) -> Result<Translation, TranslatorError> {
    let mut arabic = None;
    let mut transliteration = String::new();

    for line in answer.lines().map(str::trim) {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().trim_matches('*').trim().to_lowercase();
        let value = value.trim().trim_start_matches('*').trim();
        match label.as_str() {
            "arabic" => arabic = Some(value.to_string()),
            "transliteration" => transliteration = value.to_string(),
            _ => {}
        }
    }

    match arabic {
        Some(arabic) if !arabic.is_empty() => Ok(Translation {
            arabic,
            transliteration,
        }),
        _ => Err(TranslatorError::InvalidResponse(
            "No Arabic line in translator answer".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labelled_lines() {
        let answer = "Arabic: بِدّي آكُل هَلَّأ\nTransliteration: biddi akul halla2\n";
        let t = parse_answer(answer).unwrap();
        assert_eq!(t.arabic, "بِدّي آكُل هَلَّأ");
        assert_eq!(t.transliteration, "biddi akul halla2");
    }

    #[test]
    fn labels_are_case_insensitive_and_may_be_bold() {
        let answer = "Sure!\n**ARABIC:** وين\n  transliteration: wen";
        let t = parse_answer(answer).unwrap();
        assert_eq!(t.arabic, "وين");
        assert_eq!(t.transliteration, "wen");
    }

    #[test]
    fn missing_transliteration_is_empty() {
        let t = parse_answer("Arabic: شو").unwrap();
        assert_eq!(t.transliteration, "");
    }

    #[test]
    fn missing_arabic_is_an_error() {
        assert!(matches!(
            parse_answer("Transliteration: shu"),
            Err(TranslatorError::InvalidResponse(_))
        ));
        assert!(parse_answer("Arabic:   ").is_err());
    }

    #[test]
    fn prompt_mentions_context_only_when_given() {
        assert!(build_prompt("ball", "sports").contains("context: \"sports\""));
        assert!(!build_prompt("ball", " ").contains("context:"));
    }

    #[test]
    fn missing_api_key_env() {
        let config = TranslatorConfig {
            api_key_env: "LEVANTINE_TEST_UNSET_KEY_VAR".to_string(),
            ..TranslatorConfig::default()
        };
        assert!(matches!(
            GeminiTranslator::from_env(&config),
            Err(TranslatorError::MissingApiKey { .. })
        ));
    }
}
