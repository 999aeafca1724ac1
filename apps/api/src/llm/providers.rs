//! Concrete upstream providers and the chain that owns them.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{
    extract_chat_completion_text, extract_generated_text, Provider, ProviderResponse,
    StructuralError, TransportError,
};
use crate::config::Config;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_MODEL: &str = "openai/gpt-4o";
const HF_API_URL: &str = "https://api-inference.huggingface.co/models/google/gemma-2-2b-it";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

/// Ordered list of upstream call strategies. Priority is construction order.
pub struct ProviderChain {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderChain {
    /// OpenRouter first, Hugging Face second. Unconfigured providers are
    /// still registered so the chain can log exactly why each was skipped.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .context("failed to build upstream HTTP client")?;

        Ok(Self {
            providers: vec![
                Box::new(OpenRouterProvider {
                    client: client.clone(),
                    api_key: config.openrouter_api_key.clone(),
                    timeout: config.llm_timeout,
                }),
                Box::new(HuggingFaceProvider {
                    client,
                    api_key: config.hf_api_key.clone(),
                    timeout: config.llm_timeout,
                }),
            ],
        })
    }

    pub fn with_providers(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub(super) fn providers(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.iter().map(Box::as_ref)
    }

    /// Names of providers that have a credential configured. Used by the
    /// pre-flight report; an empty list is allowed (fully degraded chain).
    pub fn configured_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|p| p.missing_credential().is_none())
            .map(|p| p.name())
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

struct OpenRouterProvider {
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.api_key.is_none().then_some("OPENROUTER_API_KEY")
    }

    async fn call(&self, prompt: &str) -> Result<ProviderResponse, TransportError> {
        let request_body = ChatCompletionRequest {
            model: OPENROUTER_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let request = self
            .client
            .post(OPENROUTER_API_URL)
            // The chain skips unconfigured providers before calling.
            .bearer_auth(self.api_key.as_deref().unwrap_or_default())
            .json(&request_body)
            .send();

        read_response(request, self.timeout).await
    }

    fn extract_text(&self, body: &Value, _prompt: &str) -> Result<String, StructuralError> {
        extract_chat_completion_text(body)
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

struct HuggingFaceProvider {
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.api_key.is_none().then_some("HF_API_KEY")
    }

    async fn call(&self, prompt: &str) -> Result<ProviderResponse, TransportError> {
        let request = self
            .client
            .post(HF_API_URL)
            .bearer_auth(self.api_key.as_deref().unwrap_or_default())
            .json(&InferenceRequest { inputs: prompt })
            .send();

        read_response(request, self.timeout).await
    }

    fn extract_text(&self, body: &Value, prompt: &str) -> Result<String, StructuralError> {
        extract_generated_text(body, prompt)
    }
}

/// Awaits a request under the chain's own timeout bound and folds the body
/// into a `ProviderResponse`. The reqwest client carries the same timeout,
/// but reading the body is bounded here too.
async fn read_response(
    request: impl std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    timeout: Duration,
) -> Result<ProviderResponse, TransportError> {
    let read = async {
        let response = request.await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    let (status, text) = tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| TransportError::Timeout(timeout))??;

    Ok(ProviderResponse {
        status,
        body: serde_json::from_str(&text).ok(),
        text: Some(text),
    })
}
