//! Fire-and-forget audit sink (spec §6 Audit sink collaborator).
//!
//! Not a durable audit log — just a thin POST-and-forget notifier, per the
//! spec's non-goal of audit persistence. Failures are logged and dropped;
//! callers on the task critical path never await this.

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::provider::common::shared_http_client;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    #[serde(flatten)]
    pub context: serde_json::Value,
}

impl AuditEvent {
    pub fn new(actor: impl Into<String>, action: impl Into<String>, context: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            context,
        }
    }
}

/// Spawn a detached task that POSTs `event` to `audit_url`, if configured.
/// Returns immediately; never propagates a failure to the caller.
pub fn fire_and_forget_audit(audit_url: Option<String>, event: AuditEvent) {
    let Some(url) = audit_url else { return };

    tokio::spawn(async move {
        let client = shared_http_client();
        let body = serde_json::to_value(&event).unwrap_or_else(|_| json!({}));
        let result = client
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;

        if let Err(e) = result {
            warn!("audit sink post to {} failed: {}", url, e);
        }
    });
}
