//! Google Gemini provider binding.
//!
//! Delegates to [`OpenAIProvider`] pointed at Gemini's OpenAI-compatible
//! endpoint, same shape as [`anthropic`](crate::provider::anthropic).

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::openai::OpenAIProvider;
use crate::provider::{ChunkStream, GenerateOptions, Provider, TokenUsage};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

pub struct GeminiProvider {
    delegate: OpenAIProvider,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self::new_with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn new_with_model(api_key: String, model: String) -> Self {
        Self {
            delegate: OpenAIProvider::new_with_base_url(
                "gemini".into(),
                api_key,
                model,
                BASE_URL.to_string(),
            ),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
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
