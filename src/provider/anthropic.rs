//! Anthropic Claude provider binding.
//!
//! Delegates to [`OpenAIProvider`] pointed at Anthropic's OpenAI-compatible
//! endpoint, the same "one transport, many vendor identities" shape the
//! teacher's `ClaudeClient` uses.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudguild::provider::anthropic::AnthropicProvider;
//!
//! let provider = AnthropicProvider::new(std::env::var("ANTHROPIC_API_KEY").unwrap());
//! ```

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::openai::OpenAIProvider;
use crate::provider::{ChunkStream, GenerateOptions, Provider, TokenUsage};

const BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

pub struct AnthropicProvider {
    delegate: OpenAIProvider,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self::new_with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn new_with_model(api_key: String, model: String) -> Self {
        Self {
            delegate: OpenAIProvider::new_with_base_url(
                "anthropic".into(),
                api_key,
                model,
                BASE_URL.to_string(),
            ),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        self.delegate.model()
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError> {
        self.delegate.generate(prompt, options).await
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ChunkStream, ProviderError> {
        self.delegate.generate_stream(prompt, options).await
    }

    async fn health_check(&self) -> bool {
        self.delegate.health_check().await
    }

    async fn last_usage(&self) -> Option<TokenUsage> {
        self.delegate.last_usage().await
    }
}
