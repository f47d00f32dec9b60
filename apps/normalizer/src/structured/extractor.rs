//! Structured Extractor: LLM first, regex fallback, field-wise merge.
//!
//! The completion capability gets exactly one request per document. A
//! timeout, transport error, malformed JSON or schema mismatch all end the
//! same way: the regex draft is used on its own and the reason is recorded.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{CompletionClient, LlmError};
use crate::models::resume::{ParsingMethod, StructuredResumeDraft};
use crate::structured::prompts::{build_parse_prompt, RESUME_PARSE_SYSTEM};
use crate::structured::regex_fallback;
use crate::structured::schema::{parse_completion, SchemaError};

/// Longest text sent to the completion capability, in characters.
pub const MAX_TEXT_LENGTH: usize = 75_000;

#[derive(Debug, Error)]
pub enum StructuredExtractionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone)]
pub struct StructuredExtraction {
    pub draft: StructuredResumeDraft,
    pub method: ParsingMethod,
    /// Why the LLM path was abandoned, if it was tried and failed.
    pub failure: Option<String>,
}

pub struct StructuredExtractor {
    completion: Option<Arc<dyn CompletionClient>>,
    timeout: Duration,
}

impl StructuredExtractor {
    pub fn new(completion: Option<Arc<dyn CompletionClient>>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
        }
    }

    pub async fn extract(&self, text: &str) -> StructuredExtraction {
        let regex_draft = regex_fallback::extract(text);

        let Some(client) = &self.completion else {
            debug!("No completion capability configured, using regex extraction");
            return StructuredExtraction {
                draft: regex_draft,
                method: ParsingMethod::Regex,
                failure: None,
            };
        };

        match self.ask(client.as_ref(), text).await {
            Ok(llm_draft) => {
                info!("LLM extraction succeeded");
                StructuredExtraction {
                    draft: llm_draft.sanitized().or_fill_from(regex_draft),
                    method: ParsingMethod::Llm,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("LLM extraction failed, using regex fallback: {}", e);
                StructuredExtraction {
                    draft: regex_draft,
                    method: ParsingMethod::Regex,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    async fn ask(
        &self,
        client: &dyn CompletionClient,
        text: &str,
    ) -> Result<StructuredResumeDraft, StructuredExtractionError> {
        let prompt = build_parse_prompt(truncate_chars(text, MAX_TEXT_LENGTH));
        let answer = tokio::time::timeout(self.timeout, client.complete(&prompt, RESUME_PARSE_SYSTEM))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;
        Ok(parse_completion(&answer)?)
    }
}

/// Longest prefix of `text` with at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::stub::StubCompletion;

    const TEXT: &str = "Jane Doe\njane@example.com\nSenior Software Engineer\n";

    #[tokio::test]
    async fn test_no_capability_uses_regex() {
        let extractor = StructuredExtractor::new(None, Duration::from_secs(5));
        let out = extractor.extract(TEXT).await;
        assert_eq!(out.method, ParsingMethod::Regex);
        assert!(out.failure.is_none());
        assert_eq!(out.draft.email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_llm_values_win_and_gaps_are_filled() {
        let stub = StubCompletion::replying(
            r#"{"name": "Jane Q. Doe", "email": "", "skills": ["Distributed Systems"]}"#,
        );
        let extractor = StructuredExtractor::new(Some(stub.clone()), Duration::from_secs(5));
        let out = extractor.extract(TEXT).await;

        assert_eq!(out.method, ParsingMethod::Llm);
        assert_eq!(out.draft.name, "Jane Q. Doe");
        assert_eq!(out.draft.email, "jane@example.com");
        assert_eq!(out.draft.title, "Senior Software Engineer");
        assert_eq!(out.draft.skills, vec!["Distributed Systems"]);

        let prompts = stub.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("jane@example.com"));
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back_without_nulls() {
        let stub = StubCompletion::replying(r#"{"name": "Jane Doe", "skills": ["Ru"#);
        let extractor = StructuredExtractor::new(Some(stub.clone()), Duration::from_secs(5));
        let out = extractor.extract(TEXT).await;

        assert_eq!(out.method, ParsingMethod::Regex);
        assert!(out.failure.is_some());
        assert_eq!(out.draft.name, "Jane Doe");
        let value = serde_json::to_value(&out.draft).unwrap();
        assert!(value.as_object().unwrap().values().all(|v| !v.is_null()));
        // One request, no resubmission.
        assert_eq!(stub.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_capability_error_falls_back() {
        let stub = StubCompletion::failing();
        let extractor = StructuredExtractor::new(Some(stub.clone()), Duration::from_secs(5));
        let out = extractor.extract(TEXT).await;
        assert_eq!(out.method, ParsingMethod::Regex);
        assert!(out.failure.unwrap().contains("500"));
        assert_eq!(stub.prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let stub = StubCompletion::slow(r#"{"name": "Too Late"}"#, Duration::from_secs(120));
        let extractor = StructuredExtractor::new(Some(stub), Duration::from_secs(2));
        let out = extractor.extract(TEXT).await;
        assert_eq!(out.method, ParsingMethod::Regex);
        assert!(out.failure.unwrap().contains("timed out"));
        assert_eq!(out.draft.name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_long_text_is_truncated_before_sending() {
        let stub = StubCompletion::replying("{}");
        let extractor = StructuredExtractor::new(Some(stub.clone()), Duration::from_secs(5));
        let long = "é".repeat(MAX_TEXT_LENGTH + 500);
        extractor.extract(&long).await;
        let prompt = &stub.prompts()[0];
        assert_eq!(prompt.matches('é').count(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
