//! Shared HTTP plumbing reused by every OpenAI-compatible provider client.
//!
//! Providers that expose an OpenAI-style `/chat/completions` endpoint (OpenAI
//! itself, and the Anthropic/Gemini/Grok bindings that delegate to it with a
//! different base URL and model name) funnel their requests through
//! [`post_chat_completion`], which owns the wire-format serialization and the
//! token-usage extraction.

use std::time::Duration;

use lazy_static::lazy_static;

use crate::error::ProviderError;
use crate::provider::TokenUsage;

lazy_static! {
    /// Shared HTTP client with persistent connection pooling across every
    /// provider instance, so TLS sessions and DNS lookups stay warm under
    /// concurrent task execution.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build shared HTTP client");
}

pub fn shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Result of a successful chat completion call: the assistant's text plus
/// whatever token usage the vendor reported.
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// POST an OpenAI-compatible chat completion request to `{base_url}/chat/completions`
/// and parse the response, mirroring the manual wire-format handling used across
/// this codebase's provider clients.
pub async fn post_chat_completion(
    base_url: &str,
    api_key: &str,
    model: &str,
    system_prompt: Option<&str>,
    prompt: &str,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Result<ChatCompletion, ProviderError> {
    let mut messages = Vec::new();
    if let Some(sys) = system_prompt {
        messages.push(serde_json::json!({"role": "system", "content": sys}));
    }
    messages.push(serde_json::json!({"role": "user", "content": prompt}));

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
    });
    if let Some(t) = temperature {
        body["temperature"] = serde_json::json!(t);
    }
    if let Some(m) = max_tokens {
        body["max_tokens"] = serde_json::json!(m);
    }

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let resp = shared_http_client()
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Auth(format!("HTTP {}: {}", status, text)));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited(format!("HTTP {}: {}", status, text)));
    }
    if !status.is_success() {
        if log::log_enabled!(log::Level::Error) {
            log::error!("post_chat_completion: HTTP {} from {}: {}", status, url, text);
        }
        return Err(ProviderError::Transport(format!("HTTP {}: {}", status, text)));
    }

    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let content = parsed
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| ProviderError::InvalidResponse("no choices[0].message.content".into()))?
        .to_string();

    let usage = parsed.get("usage").map(|u| TokenUsage {
        input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
        output_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
    });

    Ok(ChatCompletion { content, usage })
}
