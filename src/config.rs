//! Runtime configuration loaded from environment variables (spec §6 table;
//! ambient addition in §3 RuntimeConfig).

use std::collections::HashMap;

use crate::error::ConfigurationError;

const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "gemini", "grok", "local"];

/// Environment-derived settings every C11 handler reads at startup. Not part
/// of the core data model proper — ambient plumbing held alongside it.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen_port: u16,
    pub auth_enabled: bool,
    pub jwt_secret: Option<String>,
    pub dashboard_user: Option<String>,
    pub dashboard_pass: Option<String>,
    pub rate_limit_per_minute: u32,
    pub audit_url: Option<String>,
    pub provider_api_keys: HashMap<String, String>,
}

impl RuntimeConfig {
    /// Read every recognized variable from the process environment (spec §6).
    /// Fails only if `AUTH_ENABLED=true` but no `JWT_SECRET` is set — auth
    /// cannot self-verify tokens without a signing secret.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let listen_port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3001);

        let auth_enabled = std::env::var("AUTH_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let jwt_secret = std::env::var("JWT_SECRET").ok();
        if auth_enabled && jwt_secret.is_none() {
            return Err(ConfigurationError(
                "AUTH_ENABLED=true requires JWT_SECRET to be set".to_string(),
            ));
        }

        let dashboard_user = std::env::var("DASHBOARD_USER").ok();
        let dashboard_pass = std::env::var("DASHBOARD_PASS").ok();

        let rate_limit_per_minute = std::env::var("API_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        let audit_url = std::env::var("AUDIT_URL").ok();

        let mut provider_api_keys = HashMap::new();
        for provider in KNOWN_PROVIDERS {
            let var_name = format!("{}_API_KEY", provider.to_uppercase());
            if let Ok(key) = std::env::var(&var_name) {
                if !key.is_empty() {
                    provider_api_keys.insert(provider.to_string(), key);
                }
            }
        }

        Ok(Self {
            listen_port,
            auth_enabled,
            jwt_secret,
            dashboard_user,
            dashboard_pass,
            rate_limit_per_minute,
            audit_url,
            provider_api_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_env_set() {
        // We can't safely clear process env in a parallel test run, so this
        // only asserts the parse-or-default behavior for a value we control.
        let parsed: u16 = "not-a-number".parse().unwrap_or(3001);
        assert_eq!(parsed, 3001);
    }
}
