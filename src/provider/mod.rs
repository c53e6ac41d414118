//! Provider abstraction and selection (C3).
//!
//! A [`Provider`] is any LLM backend satisfying a uniform blocking/streaming
//! generation contract plus a best-effort health check. Concrete vendor
//! bindings are ordinary HTTP clients implementing this trait; see
//! [`openai`], [`anthropic`], [`gemini`], [`grok`], and [`local`].
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
//! let text = provider.generate("Say hi", &GenerateOptions::default()).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod anthropic;
pub mod common;
pub mod gemini;
pub mod grok;
pub mod local;
pub mod openai;

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::Stream;

use crate::catalog::{resolve_provider_alias, Agent};
use crate::error::ProviderError;

/// Options threaded through both `generate` and `generate_stream` (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// How many tokens a single `generate`/`generate_stream` call spent.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// A finite, non-restartable sequence of text chunks produced by `generate_stream`.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Uniform contract over heterogeneous LLM backends (spec §4.3).
///
/// Implementations must be thread-safe (`Send + Sync`) so a single instance can
/// be shared across concurrently executing tasks via `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable lowercase identifier used as the key in the Runtime's provider map
    /// (`"openai"`, `"anthropic"`, `"gemini"`, `"grok"`, `"local"`).
    fn id(&self) -> &str;

    /// Vendor model identifier in use, for cost-tracker pricing lookups
    /// (spec §4.8). Empty string for providers with no fixed model name.
    fn model(&self) -> &str {
        ""
    }

    /// Full request/response generation.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError>;

    /// Streaming generation. Concatenating every chunk MUST equal what `generate`
    /// would have produced for the same inputs (spec §4.3 streaming contract).
    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ChunkStream, ProviderError>;

    /// Best-effort, bounded-time liveness probe.
    async fn health_check(&self) -> bool;

    /// Token usage recorded by the most recent `generate`/`generate_stream` call
    /// on this provider instance, if the vendor reports it.
    async fn last_usage(&self) -> Option<TokenUsage> {
        None
    }
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider({})", self.id())
    }
}

/// The set of providers the Runtime initialized successfully, keyed by id.
pub type ProviderMap = HashMap<String, Arc<dyn Provider>>;

/// Cloud provider of "wide availability" used as the fallback rank in step 3 of
/// the selection rule (spec §4.3) when no router/local preference resolves.
const DEFAULT_CLOUD_RANK: &[&str] = &["openai", "anthropic", "gemini", "grok"];

/// Select a provider for `agent` out of `providers`, per the five-step rule in
/// spec §4.3. Returns `None` when no provider can be selected
/// (`NoProviderAvailable`, fatal for the call).
pub fn select_provider<'a>(agent: &Agent, providers: &'a ProviderMap) -> Option<&'a Arc<dyn Provider>> {
    for raw in &agent.brain.routers {
        if let Some(canonical) = resolve_provider_alias(raw) {
            if let Some(p) = providers.get(&canonical) {
                return Some(p);
            }
        }
    }

    if agent.brain.prefers_local {
        if let Some(p) = providers.get("local") {
            return Some(p);
        }
    }

    for id in DEFAULT_CLOUD_RANK {
        if let Some(p) = providers.get(*id) {
            return Some(p);
        }
    }

    let mut ids: Vec<&String> = providers.keys().collect();
    ids.sort();
    ids.first().and_then(|id| providers.get(*id))
}
