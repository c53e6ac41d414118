//! OpenAI-compatible provider client.
//!
//! The sole provider implementation that actually speaks the wire protocol;
//! [`anthropic`](crate::provider::anthropic), [`gemini`](crate::provider::gemini), and
//! [`grok`](crate::provider::grok) all delegate to an [`OpenAIProvider`] pointed at a
//! different `base_url` and model name, since every one of those vendors exposes an
//! OpenAI-compatible Chat Completions endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudguild::provider::{GenerateOptions, Provider};
//! use cloudguild::provider::openai::OpenAIProvider;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAIProvider::new(std::env::var("OPENAI_API_KEY")?, "gpt-4o-mini".into());
//! let reply = provider.generate("Who are you?", &GenerateOptions::default()).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::error::ProviderError;
use crate::provider::common::{post_chat_completion, shared_http_client};
use crate::provider::{ChunkStream, GenerateOptions, Provider, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for OpenAI's Chat Completions API, and the delegate target for every
/// other OpenAI-compatible vendor binding in this crate.
pub struct OpenAIProvider {
    id: String,
    api_key: String,
    base_url: String,
    model: String,
    usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url("openai".into(), api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Construct a provider pointed at a vendor-specific base URL, reusing the
    /// OpenAI wire format. Used by the Anthropic/Gemini/Grok delegates.
    pub fn new_with_base_url(id: String, api_key: String, model: String, base_url: String) -> Self {
        Self {
            id,
            api_key,
            base_url,
            model,
            usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError> {
        let completion = post_chat_completion(
            &self.base_url,
            &self.api_key,
            &self.model,
            options.system_prompt.as_deref(),
            prompt,
            options.temperature,
            options.max_tokens,
        )
        .await?;

        if let Some(usage) = completion.usage {
            *self.usage.lock().await = Some(usage);
        }

        Ok(completion.content)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ChunkStream, ProviderError> {
        let mut messages = Vec::new();
        if let Some(sys) = &options.system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": sys}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if let Some(t) = options.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(m) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(m);
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = shared_http_client()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!("HTTP {}", status)));
        }

        let byte_stream = resp.bytes_stream();
        let chunks = byte_stream.filter_map(|chunk_result| async move {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => return Some(Err(ProviderError::from(e))),
            };
            let text = String::from_utf8_lossy(&bytes).to_string();
            let deltas: Vec<String> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .filter(|data| *data != "[DONE]")
                .filter_map(|data| serde_json::from_str::<serde_json::Value>(data).ok())
                .filter_map(|event| {
                    event
                        .get("choices")?
                        .get(0)?
                        .get("delta")?
                        .get("content")?
                        .as_str()
                        .map(|s| s.to_string())
                })
                .collect();
            if deltas.is_empty() {
                None
            } else {
                Some(Ok(deltas.join("")))
            }
        });

        Ok(Box::pin(chunks))
    }

    async fn health_check(&self) -> bool {
        let options = GenerateOptions {
            max_tokens: Some(1),
            ..Default::default()
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), self.generate("ping", &options))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    async fn last_usage(&self) -> Option<TokenUsage> {
        self.usage.lock().await.clone()
    }
}
