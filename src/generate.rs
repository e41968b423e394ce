//! Structured generation engine and retry controller.
//!
//! One generation attempt is: invoke the chat model with the rendered
//! prompt, then coerce its free-text response into a validated
//! [`NewsReport`]. Decoding is strict whole-response JSON first; when that
//! fails, a best-effort fallback locates the first balanced `{...}` span
//! in the response and decodes that substring. The fallback is a
//! compatibility shim for models that wrap their JSON in prose, not a
//! primary contract.
//!
//! The retry controller runs attempts under a fixed budget: schema
//! validation failures are presumed transient (the model produced
//! malformed-but-recoverable output) and retried after a fixed backoff;
//! any other failure aborts immediately. Exhaustion and aborts both
//! degrade to an empty report with the last error preserved in the
//! per-request [`NewsOutcome`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::GenerateError;
use crate::index::SharedIndex;
use crate::llm::{ChatClient, OpenAiChatClient};
use crate::models::{GenerationRequest, NewsOutcome, NewsReport};
use crate::prompt::{compose, render_context, RenderedPrompt};
use crate::retriever::{retrieve_for_date, DatedCandidate};

/// Decode a raw model response into a report.
///
/// Strict decode of the whole response first, then the balanced-brace
/// fallback. A successful report is truncated to `max_articles` (the
/// number of context documents actually supplied); the model may
/// legitimately return fewer.
fn decode_report(raw: &str, max_articles: usize) -> Result<NewsReport, GenerateError> {
    let strict: Result<NewsReport, _> = serde_json::from_str(raw.trim());

    let mut report = match strict {
        Ok(report) => report,
        Err(strict_err) => match extract_json_object(raw) {
            Some(span) => serde_json::from_str(span).map_err(|e| {
                GenerateError::SchemaValidation {
                    message: format!("extracted JSON object failed to validate: {e}"),
                    raw: Some(raw.to_string()),
                }
            })?,
            None => {
                return Err(GenerateError::SchemaValidation {
                    message: format!("no JSON object found in response: {strict_err}"),
                    raw: Some(raw.to_string()),
                })
            }
        },
    };

    report.articles.truncate(max_articles);
    Ok(report)
}

/// Locate the first balanced `{...}` span in free text.
///
/// Tracks brace depth while honoring JSON string literals and escape
/// sequences, so braces inside strings do not end the span.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Run generation attempts under the retry budget.
///
/// Attempted at most `max_retries` times; only schema validation failures
/// consume further attempts. Every other error aborts on the spot.
async fn run_attempts(
    chat: &dyn ChatClient,
    prompt: &RenderedPrompt,
    max_articles: usize,
    max_retries: u32,
    backoff_secs: u64,
) -> Result<NewsReport, GenerateError> {
    let mut last_error: Option<GenerateError> = None;

    for attempt in 1..=max_retries {
        info!(attempt, max_retries, "generation attempt");

        let raw = chat.complete(prompt).await?;

        match decode_report(&raw, max_articles) {
            Ok(report) => {
                info!(articles = report.articles.len(), "generation succeeded");
                return Ok(report);
            }
            Err(e) => {
                warn!(attempt, error = %e, "model output failed schema validation");
                last_error = Some(e);
                if attempt < max_retries {
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| GenerateError::SchemaValidation {
        message: "no generation attempt was made".to_string(),
        raw: None,
    }))
}

/// The generation service: corpus, index, embedding provider, and chat
/// backend behind one entry point.
///
/// Construct once per process and share; the semantic index is built
/// lazily on the first request and reused by all later ones.
pub struct Newsroom {
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    chat: Box<dyn ChatClient>,
    index: SharedIndex,
}

impl Newsroom {
    /// Build a newsroom from configuration, wiring the configured
    /// embedding provider and the OpenAI-compatible chat client.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Configuration`] for missing credentials, endpoint,
    /// or an unusable embedding provider. Raised before any retrieval or
    /// generation work.
    pub fn new(config: Config) -> Result<Self, GenerateError> {
        let chat = Box::new(OpenAiChatClient::new(&config.llm)?);
        let provider = create_provider(&config.embedding)
            .map_err(|e| GenerateError::Configuration(e.to_string()))?;
        Ok(Self::with_backends(config, Arc::from(provider), chat))
    }

    /// Build a newsroom for retrieval inspection only.
    ///
    /// No chat credentials are resolved, so this works in environments
    /// where the model API is not configured. [`Newsroom::generate_news`]
    /// on such a newsroom degrades every request with a
    /// [`GenerateError::Configuration`] error.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Configuration`] for an unusable embedding provider.
    pub fn retrieval_only(config: Config) -> Result<Self, GenerateError> {
        let provider = create_provider(&config.embedding)
            .map_err(|e| GenerateError::Configuration(e.to_string()))?;
        Ok(Self::with_backends(
            config,
            Arc::from(provider),
            Box::new(UnconfiguredChat),
        ))
    }

    /// Build a newsroom with explicit backends. Used by tests and callers
    /// that bring their own provider or chat client.
    pub fn with_backends(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
        chat: Box<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            provider,
            chat,
            index: SharedIndex::new(),
        }
    }

    /// Inspect what the date-windowed retriever would feed the model for a
    /// target date, without invoking the model.
    ///
    /// # Errors
    ///
    /// Corpus and index-build failures, plus
    /// [`GenerateError::InvalidTargetDate`] for an unparseable date.
    pub async fn retrieve(
        &self,
        target_date: &str,
        count: usize,
        window_days: Option<i64>,
    ) -> Result<Vec<DatedCandidate>, GenerateError> {
        let index = self
            .index
            .get_or_build(&self.config.corpus.path, Arc::clone(&self.provider))
            .await?;
        retrieve_for_date(&index, target_date, count, window_days, &self.config.retrieval).await
    }

    /// Generate a newspaper issue for the requested date.
    ///
    /// `num_articles` is clamped to 1..=5. Never fails for "no events
    /// nearby" or "model kept producing malformed output"; both degrade
    /// to an empty report in the outcome, with the notice or last error
    /// attached.
    ///
    /// # Errors
    ///
    /// Only corpus loading and index build failures propagate as `Err`;
    /// the system cannot function without a corpus.
    pub async fn generate_news(
        &self,
        request: &GenerationRequest,
    ) -> Result<NewsOutcome, GenerateError> {
        let num_articles = request.num_articles.clamp(1, 5);

        let index = self
            .index
            .get_or_build(&self.config.corpus.path, Arc::clone(&self.provider))
            .await?;

        let candidates = match retrieve_for_date(
            &index,
            &request.target_date,
            num_articles,
            request.window_days,
            &self.config.retrieval,
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "retrieval failed; degrading to empty report");
                return Ok(NewsOutcome::degraded(e));
            }
        };

        if candidates.is_empty() {
            return Ok(NewsOutcome::empty_with_notice(format!(
                "No relevant historical events found near '{}'.",
                request.target_date
            )));
        }

        let context = render_context(&candidates);
        let prompt = compose(&request.target_date, request.era, num_articles, &context);

        match run_attempts(
            self.chat.as_ref(),
            &prompt,
            candidates.len(),
            self.config.generation.max_retries,
            self.config.generation.backoff_secs,
        )
        .await
        {
            Ok(report) => Ok(NewsOutcome::success(report)),
            Err(e) => {
                warn!(error = %e, "generation failed; degrading to empty report");
                Ok(NewsOutcome::degraded(e))
            }
        }
    }
}

/// Placeholder chat backend for retrieval-only newsrooms.
struct UnconfiguredChat;

#[async_trait::async_trait]
impl ChatClient for UnconfiguredChat {
    async fn complete(&self, _prompt: &RenderedPrompt) -> Result<String, GenerateError> {
        Err(GenerateError::Configuration(
            "chat client not configured; this newsroom only retrieves".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsArticle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn article_json(n: usize) -> String {
        let articles: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "headline": format!("Headline {i}"),
                    "rubric": "Politics",
                    "date_location": "Paris, 14 July 1789",
                    "body": "Body text.",
                    "reporter": "A. Quill"
                })
            })
            .collect();
        serde_json::json!({ "articles": articles }).to_string()
    }

    #[test]
    fn test_decode_strict() {
        let report = decode_report(&article_json(2), 5).unwrap();
        assert_eq!(report.articles.len(), 2);
    }

    #[test]
    fn test_decode_fallback_with_prose_wrapper() {
        let raw = format!("Here is your gazette:\n{}\nEnjoy!", article_json(1));
        let report = decode_report(&raw, 5).unwrap();
        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].headline, "Headline 0");
    }

    #[test]
    fn test_decode_truncates_to_context_size() {
        let report = decode_report(&article_json(4), 2).unwrap();
        assert_eq!(report.articles.len(), 2);
    }

    #[test]
    fn test_decode_garbage_is_schema_validation_with_raw() {
        let err = decode_report("the model refuses to cooperate", 3).unwrap_err();
        match err {
            GenerateError::SchemaValidation { raw, .. } => {
                assert_eq!(raw.as_deref(), Some("the model refuses to cooperate"));
            }
            other => panic!("expected SchemaValidation, got {other}"),
        }
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let err = decode_report(r#"{"articles": [{"headline": "only"}]}"#, 3).unwrap_err();
        assert!(matches!(err, GenerateError::SchemaValidation { .. }));
    }

    #[test]
    fn test_extract_json_object_balanced() {
        let text = r#"prefix {"a": {"b": 1}} suffix {"c": 2}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn test_extract_json_object_braces_in_strings() {
        let text = r#"note: {"headline": "the } brace \" trick", "x": 1} end"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"headline": "the } brace \" trick", "x": 1}"#)
        );
    }

    #[test]
    fn test_extract_json_object_unbalanced() {
        assert_eq!(extract_json_object(r#"{"articles": ["#), None);
        assert_eq!(extract_json_object("no braces at all"), None);
    }

    struct ScriptedChat {
        responses: Vec<Result<String, GenerateError>>,
        calls: AtomicUsize,
    }

    impl ScriptedChat {
        fn new(responses: Vec<Result<String, GenerateError>>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ChatClient for ScriptedChat {
        async fn complete(&self, _prompt: &RenderedPrompt) -> Result<String, GenerateError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(i.min(self.responses.len() - 1)).unwrap() {
                Ok(s) => Ok(s.clone()),
                Err(GenerateError::Invocation(m)) => Err(GenerateError::Invocation(m.clone())),
                Err(e) => Err(GenerateError::Invocation(e.to_string())),
            }
        }
    }

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "system".to_string(),
            user: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_bound_on_persistent_schema_failure() {
        let chat = ScriptedChat::new(vec![Ok("not json".to_string())]);
        let err = run_attempts(&chat, &prompt(), 3, 2, 0).await.unwrap_err();
        assert_eq!(chat.calls(), 2);
        assert!(matches!(err, GenerateError::SchemaValidation { .. }));
        assert!(err.raw_output().is_some());
    }

    #[tokio::test]
    async fn test_no_retry_on_invocation_failure() {
        let chat = ScriptedChat::new(vec![Err(GenerateError::Invocation(
            "connection refused".to_string(),
        ))]);
        let err = run_attempts(&chat, &prompt(), 3, 2, 0).await.unwrap_err();
        assert_eq!(chat.calls(), 1);
        assert!(matches!(err, GenerateError::Invocation(_)));
    }

    #[tokio::test]
    async fn test_second_attempt_recovers() {
        let chat = ScriptedChat::new(vec![Ok("garbage".to_string()), Ok(article_json(1))]);
        let report = run_attempts(&chat, &prompt(), 3, 2, 0).await.unwrap();
        assert_eq!(chat.calls(), 2);
        assert_eq!(report.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_success_returns_articles() {
        let chat = ScriptedChat::new(vec![Ok(article_json(2))]);
        let report = run_attempts(&chat, &prompt(), 2, 2, 0).await.unwrap();
        assert_eq!(
            report.articles[0],
            NewsArticle {
                headline: "Headline 0".to_string(),
                rubric: "Politics".to_string(),
                date_location: "Paris, 14 July 1789".to_string(),
                body: "Body text.".to_string(),
                reporter: "A. Quill".to_string(),
            }
        );
    }
}
