//! Crate-wide error kinds.
//!
//! Mirrors the error taxonomy of the provider clients this crate grew out of: each
//! variant carries a plain `String` message and implements `Display`/`Error` by hand
//! rather than through a derive macro, so the mapping to HTTP status codes in
//! [`crate::server`] stays explicit and easy to audit.

use std::fmt;

/// Error surfaced by the agent catalog loader (C4) at startup.
#[derive(Debug, Clone)]
pub struct ConfigurationError(pub String);

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigurationError {}

impl From<std::io::Error> for ConfigurationError {
    fn from(e: std::io::Error) -> Self {
        ConfigurationError(format!("io error: {}", e))
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(e: toml::de::Error) -> Self {
        ConfigurationError(format!("toml parse error: {}", e))
    }
}

/// Error taxonomy for provider (C3) calls. Transport and Timeout are retryable by
/// the caller's policy; Auth and InvalidResponse are not (see spec §4.3, §7).
#[derive(Debug, Clone)]
pub enum ProviderError {
    Transport(String),
    Auth(String),
    RateLimited(String),
    Timeout(String),
    InvalidResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(m) => write!(f, "transport error: {}", m),
            ProviderError::Auth(m) => write!(f, "auth error: {}", m),
            ProviderError::RateLimited(m) => write!(f, "rate limited: {}", m),
            ProviderError::Timeout(m) => write!(f, "timeout: {}", m),
            ProviderError::InvalidResponse(m) => write!(f, "invalid response: {}", m),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Errors that can occur while running a tool's subprocess. Distinct from
/// [`ProviderError`] because tool failures never abort the task — they are
/// always folded into a `ToolExecutionResult { succeeded: false, .. }`.
#[derive(Debug, Clone)]
pub enum ToolError {
    Timeout(String),
    PermissionDenied(String),
    ExecutionFailed(String),
    OutputTooLarge(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Timeout(m) => write!(f, "tool timeout: {}", m),
            ToolError::PermissionDenied(m) => write!(f, "permission denied: {}", m),
            ToolError::ExecutionFailed(m) => write!(f, "execution failed: {}", m),
            ToolError::OutputTooLarge(m) => write!(f, "output too large: {}", m),
        }
    }
}

impl std::error::Error for ToolError {}

/// Error raised when parsing the orchestration DSL (C9) fails. Maps to HTTP 400.
#[derive(Debug, Clone)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Top-level error returned at the boundary between the Runtime and the server
/// layer. Each variant names the HTTP treatment it receives in `server::handlers`.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    Configuration(ConfigurationError),
    AgentNotFound(String),
    NoProviderAvailable(String),
    Parse(ParseError),
    Unauthorized,
    NotFound(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Configuration(e) => write!(f, "{}", e),
            RuntimeError::AgentNotFound(id) => write!(f, "agent not found: {}", id),
            RuntimeError::NoProviderAvailable(id) => {
                write!(f, "no provider available for agent {}", id)
            }
            RuntimeError::Parse(e) => write!(f, "{}", e),
            RuntimeError::Unauthorized => write!(f, "unauthorized"),
            RuntimeError::NotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigurationError> for RuntimeError {
    fn from(e: ConfigurationError) -> Self {
        RuntimeError::Configuration(e)
    }
}

impl From<ParseError> for RuntimeError {
    fn from(e: ParseError) -> Self {
        RuntimeError::Parse(e)
    }
}
