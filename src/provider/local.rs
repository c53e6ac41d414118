//! Local HTTP provider binding.
//!
//! Points an [`OpenAIProvider`] at a local OpenAI-compatible inference server
//! (e.g. llama.cpp's server mode, Ollama's compatibility endpoint). Zero-rated
//! by the pricing table (C1) — locally hosted inference has no per-token cost.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::openai::OpenAIProvider;
use crate::provider::{ChunkStream, GenerateOptions, Provider, TokenUsage};

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
const DEFAULT_MODEL: &str = "local-model";

pub struct LocalProvider {
    delegate: OpenAIProvider,
}

impl LocalProvider {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            delegate: OpenAIProvider::new_with_base_url(
                "local".into(),
                String::new(),
                model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ),
        }
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn id(&self) -> &str {
        "local"
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
