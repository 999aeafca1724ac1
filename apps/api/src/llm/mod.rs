//! LLM fallback chain: the single point of entry for all upstream model
//! calls in the Career Navigator backend.
//!
//! Providers are tried in priority order (OpenRouter, then Hugging Face).
//! Every way a provider can drop out of the chain produces its own log line
//! naming the provider and the reason: missing credential, transport
//! failure, non-success status, or a structural defect in an otherwise
//! successful response. Operators must be able to identify the failing
//! stage from logs alone.
//!
//! `invoke()` never fails: exhausting the chain yields a tagged degraded
//! reply that callers can tell apart from real provider output.

use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub mod providers;

pub use providers::ProviderChain;

/// Prompts longer than this are truncated before being sent upstream.
const PROMPT_LIMIT_CHARS: usize = 4000;

/// How many characters of an upstream error body make it into the log.
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A defect in the shape of an otherwise successful upstream response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("response body is not valid JSON")]
    NotJson,

    #[error("'choices' field is missing or not an array")]
    MissingChoices,

    #[error("'choices' is empty")]
    EmptyChoices,

    #[error("first choice has no 'message.content' string")]
    MissingContent,

    #[error("message content is empty after trimming")]
    EmptyContent,

    #[error("'generated_text' field is missing")]
    MissingGeneratedText,
}

/// Raw outcome of one upstream call, before validation. Ephemeral.
#[derive(Debug)]
pub struct ProviderResponse {
    pub status: u16,
    /// Parsed JSON body, when the body was parseable.
    pub body: Option<Value>,
    /// Raw body text, kept for error-log excerpts.
    pub text: Option<String>,
}

impl ProviderResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One upstream call strategy in the chain.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Some(env_var)` when the provider's credential is absent (or empty
    /// after trimming) and the provider must be skipped.
    fn missing_credential(&self) -> Option<&'static str>;

    async fn call(&self, prompt: &str) -> Result<ProviderResponse, TransportError>;

    /// Pulls the reply text out of a success body, reporting the specific
    /// structural defect when the shape is not what this provider promises.
    fn extract_text(&self, body: &Value, prompt: &str) -> Result<String, StructuralError>;
}

/// Reply from the chain. The `Degraded` variant is the terminal fallback:
/// callers (and tests) distinguish it by tag, never by matching on text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainReply {
    Provider { provider: &'static str, text: String },
    Degraded { text: String },
}

impl ChainReply {
    pub fn text(&self) -> &str {
        match self {
            ChainReply::Provider { text, .. } => text,
            ChainReply::Degraded { text } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ChainReply::Degraded { .. })
    }

    /// Name of the provider that answered, `None` for the terminal fallback.
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            ChainReply::Provider { provider, .. } => Some(provider),
            ChainReply::Degraded { .. } => None,
        }
    }
}

impl ProviderChain {
    /// Tries each provider in order and returns the first validated,
    /// non-empty reply. Never errors: a fully exhausted chain produces a
    /// `ChainReply::Degraded`.
    pub async fn invoke(&self, prompt: &str) -> ChainReply {
        let prompt = truncate_prompt(prompt);

        for provider in self.providers() {
            let name = provider.name();

            if let Some(credential) = provider.missing_credential() {
                warn!("[llm] skipping {name}: {credential} is not configured");
                continue;
            }

            info!("[llm] sending prompt to {name}");
            let response = match provider.call(&prompt).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("[llm] {name} transport failure: {e}");
                    continue;
                }
            };

            if !response.is_success() {
                warn!(
                    "[llm] {name} returned status {}: {}",
                    response.status,
                    excerpt(response.text.as_deref().unwrap_or(""))
                );
                continue;
            }

            let Some(body) = &response.body else {
                warn!("[llm] {name} structural defect: {}", StructuralError::NotJson);
                continue;
            };

            match provider.extract_text(body, &prompt) {
                Ok(text) => {
                    info!("[llm] {name} answered ({} chars)", text.len());
                    return ChainReply::Provider {
                        provider: name,
                        text,
                    };
                }
                Err(defect) => {
                    warn!("[llm] {name} structural defect: {defect}");
                    continue;
                }
            }
        }

        warn!("[llm] all providers exhausted, returning degraded reply");
        ChainReply::Degraded {
            text: degraded_reply(&prompt),
        }
    }
}

/// Validates the OpenAI-style chat-completions shape: a non-empty `choices`
/// array whose first entry carries a non-empty `message.content`.
pub fn extract_chat_completion_text(body: &Value) -> Result<String, StructuralError> {
    let choices = body
        .get("choices")
        .and_then(Value::as_array)
        .ok_or(StructuralError::MissingChoices)?;
    let first = choices.first().ok_or(StructuralError::EmptyChoices)?;
    let content = first
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or(StructuralError::MissingContent)?;
    let text = content.trim();
    if text.is_empty() {
        return Err(StructuralError::EmptyContent);
    }
    Ok(text.to_string())
}

/// Hugging Face text-generation shape: a list whose first entry carries
/// `generated_text`, which echoes the prompt as a prefix.
pub fn extract_generated_text(body: &Value, prompt: &str) -> Result<String, StructuralError> {
    let generated = body
        .get(0)
        .and_then(|entry| entry.get("generated_text"))
        .and_then(Value::as_str)
        .ok_or(StructuralError::MissingGeneratedText)?;
    let text = generated.strip_prefix(prompt).unwrap_or(generated).trim();
    if text.is_empty() {
        return Err(StructuralError::EmptyContent);
    }
    Ok(text.to_string())
}

fn truncate_prompt(prompt: &str) -> Cow<'_, str> {
    match prompt.char_indices().nth(PROMPT_LIMIT_CHARS) {
        Some((idx, _)) => Cow::Owned(format!("{}... [truncated]", &prompt[..idx])),
        None => Cow::Borrowed(prompt),
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Terminal fallback: canned guidance keyed on the prompt, so a fully
/// degraded deployment still answers with something useful. Callers see the
/// `Degraded` tag, never a silent empty success.
fn degraded_reply(prompt: &str) -> String {
    let p = prompt.to_lowercase();
    let text = if ["resume", "cv", "career", "job", "apply"]
        .iter()
        .any(|w| p.contains(w))
    {
        "I can help you with resume optimization and career guidance.\n\n\
         Upload your resume text and I can identify skill gaps, suggest \
         improvements, and recommend tailored job roles."
    } else if p.contains("sql") || p.contains("database") {
        "SQL learning path: SELECT/WHERE/ORDER BY, then INSERT/UPDATE/DELETE, \
         JOINs, GROUP BY and HAVING, then subqueries and indexes."
    } else if p.contains("python") {
        "Python learning guide: basics (variables, loops, functions), data \
         structures (lists, dicts, sets), OOP, then libraries like Pandas \
         and Flask."
    } else if p.contains("learn") || p.contains("study") {
        "Smart learning tips: set goals, practice consistently, build small \
         projects, review and iterate."
    } else {
        "The AI service is temporarily degraded. I can still help with \
         resume advice, job matching, or learning plans. What would you \
         like to focus on?"
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Script {
        Timeout,
        Status(u16, &'static str),
        Body(Value),
    }

    struct MockProvider {
        name: &'static str,
        missing: Option<&'static str>,
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn configured(name: &'static str, script: Script) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    missing: None,
                    script,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }

        fn unconfigured(name: &'static str, credential: &'static str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    missing: Some(credential),
                    script: Script::Timeout,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn missing_credential(&self) -> Option<&'static str> {
            self.missing
        }

        async fn call(&self, _prompt: &str) -> Result<ProviderResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Timeout => Err(TransportError::Timeout(Duration::from_secs(20))),
                Script::Status(code, body) => Ok(ProviderResponse {
                    status: *code,
                    body: serde_json::from_str(body).ok(),
                    text: Some(body.to_string()),
                }),
                Script::Body(v) => Ok(ProviderResponse {
                    status: 200,
                    body: Some(v.clone()),
                    text: Some(v.to_string()),
                }),
            }
        }

        fn extract_text(&self, body: &Value, _prompt: &str) -> Result<String, StructuralError> {
            extract_chat_completion_text(body)
        }
    }

    fn chain(providers: Vec<MockProvider>) -> ProviderChain {
        ProviderChain::with_providers(
            providers
                .into_iter()
                .map(|p| Box::new(p) as Box<dyn Provider>)
                .collect(),
        )
    }

    fn good_body() -> Value {
        json!({"choices": [{"message": {"content": "  hello  "}}]})
    }

    #[tokio::test]
    async fn zero_credentials_yields_degraded_reply_without_calling_anyone() {
        let (a, a_calls) = MockProvider::unconfigured("openrouter", "OPENROUTER_API_KEY");
        let (b, b_calls) = MockProvider::unconfigured("huggingface", "HF_API_KEY");
        let reply = chain(vec![a, b]).invoke("teach me sql").await;

        assert!(reply.is_degraded());
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn timeout_falls_through_to_next_provider() {
        let (a, _) = MockProvider::configured("openrouter", Script::Timeout);
        let (b, b_calls) = MockProvider::configured("huggingface", Script::Body(good_body()));
        let reply = chain(vec![a, b]).invoke("hi").await;

        assert_eq!(
            reply,
            ChainReply::Provider {
                provider: "huggingface",
                text: "hello".to_string(),
            }
        );
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_success_status_advances_the_chain() {
        let (a, _) = MockProvider::configured("openrouter", Script::Status(429, "rate limited"));
        let (b, _) = MockProvider::configured("huggingface", Script::Body(good_body()));
        let reply = chain(vec![a, b]).invoke("hi").await;
        assert_eq!(reply.text(), "hello");
        assert!(!reply.is_degraded());
    }

    #[tokio::test]
    async fn missing_content_field_advances_instead_of_raising() {
        let (a, a_calls) = MockProvider::configured(
            "openrouter",
            Script::Body(json!({"choices": [{"message": {}}]})),
        );
        let (b, _) = MockProvider::configured("huggingface", Script::Body(good_body()));
        let reply = chain(vec![a, b]).invoke("hi").await;

        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(reply.text(), "hello");
    }

    #[tokio::test]
    async fn whitespace_only_content_is_not_an_empty_success() {
        let (a, _) = MockProvider::configured(
            "openrouter",
            Script::Body(json!({"choices": [{"message": {"content": "   "}}]})),
        );
        let reply = chain(vec![a]).invoke("hi").await;
        assert!(reply.is_degraded());
        assert!(!reply.text().is_empty());
    }

    #[tokio::test]
    async fn every_credential_combination_returns_without_error() {
        for (a_configured, b_configured) in
            [(false, false), (false, true), (true, false), (true, true)]
        {
            let (a, _) = if a_configured {
                MockProvider::configured("openrouter", Script::Body(good_body()))
            } else {
                MockProvider::unconfigured("openrouter", "OPENROUTER_API_KEY")
            };
            let (b, _) = if b_configured {
                MockProvider::configured("huggingface", Script::Body(good_body()))
            } else {
                MockProvider::unconfigured("huggingface", "HF_API_KEY")
            };

            let reply = chain(vec![a, b]).invoke("hi").await;
            if a_configured || b_configured {
                assert_eq!(reply.text(), "hello");
            } else {
                assert!(reply.is_degraded());
            }
        }
    }

    #[test]
    fn chat_completion_extraction_reports_each_defect() {
        assert_eq!(
            extract_chat_completion_text(&json!({})),
            Err(StructuralError::MissingChoices)
        );
        assert_eq!(
            extract_chat_completion_text(&json!({"choices": []})),
            Err(StructuralError::EmptyChoices)
        );
        assert_eq!(
            extract_chat_completion_text(&json!({"choices": [{}]})),
            Err(StructuralError::MissingContent)
        );
        assert_eq!(
            extract_chat_completion_text(&json!({"choices": [{"message": {"content": " "}}]})),
            Err(StructuralError::EmptyContent)
        );
        assert_eq!(
            extract_chat_completion_text(&good_body()).as_deref(),
            Ok("hello")
        );
    }

    #[test]
    fn generated_text_extraction_strips_the_echoed_prompt() {
        let body = json!([{"generated_text": "teach me sql Start with SELECT."}]);
        assert_eq!(
            extract_generated_text(&body, "teach me sql").as_deref(),
            Ok("Start with SELECT.")
        );
        assert_eq!(
            extract_generated_text(&json!([]), "x"),
            Err(StructuralError::MissingGeneratedText)
        );
    }

    #[test]
    fn long_prompts_are_truncated_on_a_char_boundary() {
        let prompt = "é".repeat(PROMPT_LIMIT_CHARS + 50);
        let truncated = truncate_prompt(&prompt);
        assert!(truncated.ends_with("... [truncated]"));
        assert_eq!(
            truncated.chars().filter(|c| *c == 'é').count(),
            PROMPT_LIMIT_CHARS
        );

        let short = "hello";
        assert!(matches!(truncate_prompt(short), Cow::Borrowed("hello")));
    }
}
