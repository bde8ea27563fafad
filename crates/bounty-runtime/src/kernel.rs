//! Contract with the orchestration kernel: the inbound event envelope and
//! the repository-dispatch result channel.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use bounty_github::payloads::WebhookPayload;
use bounty_github::timeline::BotIdentity;

use crate::context::{RepoRef, RuntimeContext};
use crate::dispatch::ResultReport;
use crate::github_client::GithubApiClient;
use crate::settings::StartStopSettings;
use crate::user_backend::PostgrestUserBackend;

/// `event_type` of the repository dispatch that carries a run result back to
/// the kernel.
pub const KERNEL_RESULT_EVENT_TYPE: &str = "assignment-bot-result";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Envelope the kernel hands to the bot for one webhook delivery. The
/// payload and settings arrive either inline or as JSON-encoded strings,
/// depending on the kernel revision.
pub struct KernelEvent {
    pub state_id: String,
    pub event_name: String,
    event_payload: Value,
    #[serde(default)]
    settings: Value,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}

impl KernelEvent {
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to decode the kernel event")
    }

    pub fn payload(&self) -> Result<WebhookPayload> {
        let value = embedded_json(&self.event_payload, "eventPayload")?;
        serde_json::from_value(value).context("failed to decode the webhook payload")
    }

    pub fn settings(&self) -> Result<StartStopSettings> {
        if self.settings.is_null() {
            return Ok(StartStopSettings::default());
        }
        let value = embedded_json(&self.settings, "settings")?;
        serde_json::from_value(value).context("failed to decode the plugin settings")
    }
}

fn embedded_json(value: &Value, field: &str) -> Result<Value> {
    match value {
        Value::String(raw) => serde_json::from_str(raw)
            .with_context(|| format!("kernel event field '{field}' is not valid JSON")),
        other => Ok(other.clone()),
    }
}

#[derive(Debug, Clone)]
/// Connection parameters for one run, combined from the process environment
/// and the kernel event.
pub struct RuntimeOptions {
    pub github_api_base: String,
    pub github_token: String,
    pub backend_url: String,
    pub backend_key: String,
    pub app_id: Option<u64>,
    pub bot_logins: Vec<String>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

/// Builds the runtime context for one kernel event: normalized settings,
/// authenticated API adapters, and the decoded webhook payload.
pub fn build_runtime_context(
    options: &RuntimeOptions,
    event: &KernelEvent,
) -> Result<RuntimeContext> {
    let settings = event
        .settings()?
        .normalize()
        .context("invalid plugin settings")?;
    let payload = event.payload()?;
    let repo = RepoRef {
        owner: payload.repository.owner.login.clone(),
        name: payload.repository.name.clone(),
    };
    let github = GithubApiClient::new(
        options.github_api_base.clone(),
        options.github_token.clone(),
        repo.clone(),
        options.request_timeout_ms,
        options.retry_max_attempts,
        options.retry_base_delay_ms,
    )?;
    let backend = PostgrestUserBackend::new(
        &options.backend_url,
        &options.backend_key,
        options.request_timeout_ms,
    )?;
    Ok(RuntimeContext {
        settings,
        github,
        backend: Arc::new(backend),
        bot: BotIdentity {
            app_id: options.app_id,
            bot_logins: options.bot_logins.clone(),
        },
        repo,
        payload,
    })
}

/// Reports a run result to the kernel. The report travels JSON-encoded in
/// `client_payload.output` next to the state id the kernel issued.
pub async fn report_to_kernel(
    github: &GithubApiClient,
    state_id: &str,
    report: &ResultReport,
) -> Result<()> {
    let output = serde_json::to_string(report).context("failed to encode the run report")?;
    let client_payload = json!({
        "state_id": state_id,
        "output": output,
    });
    github
        .repository_dispatch(KERNEL_RESULT_EVENT_TYPE, &client_payload)
        .await
}

#[cfg(test)]
mod tests {
    use super::KernelEvent;

    fn repository_value() -> serde_json::Value {
        serde_json::json!({
            "id": 99,
            "name": "widgets",
            "owner": {"login": "acme", "id": 1},
            "private": false,
            "default_branch": "main"
        })
    }

    #[test]
    fn unit_kernel_event_decodes_inline_payload_and_settings() {
        let raw = serde_json::json!({
            "stateId": "state-1",
            "eventName": "issue_comment.created",
            "eventPayload": {"repository": repository_value()},
            "settings": {"startRequiresWallet": false},
            "authToken": "ghs_token",
            "ref": "refs/heads/main"
        })
        .to_string();
        let event = KernelEvent::decode(&raw).expect("decode");
        assert_eq!(event.state_id, "state-1");
        assert_eq!(event.event_name, "issue_comment.created");
        assert_eq!(event.auth_token, "ghs_token");
        assert_eq!(event.git_ref.as_deref(), Some("refs/heads/main"));
        assert_eq!(event.payload().expect("payload").repository.name, "widgets");
        assert!(!event.settings().expect("settings").start_requires_wallet);
    }

    #[test]
    fn unit_kernel_event_decodes_json_encoded_strings() {
        let payload = serde_json::json!({"repository": repository_value()}).to_string();
        let settings = serde_json::json!({"maxConcurrentTasks": 5}).to_string();
        let raw = serde_json::json!({
            "stateId": "state-2",
            "eventName": "issues.assigned",
            "eventPayload": payload,
            "settings": settings
        })
        .to_string();
        let event = KernelEvent::decode(&raw).expect("decode");
        assert!(event.auth_token.is_empty());
        assert!(event.git_ref.is_none());
        assert_eq!(event.payload().expect("payload").repository.id, 99);
        let normalized = event
            .settings()
            .expect("settings")
            .normalize()
            .expect("normalize");
        assert_eq!(normalized.task_limits.limit_for("member"), Some(5));
    }

    #[test]
    fn unit_kernel_event_defaults_absent_settings() {
        let raw = serde_json::json!({
            "stateId": "state-3",
            "eventName": "issues.unassigned",
            "eventPayload": {"repository": repository_value()}
        })
        .to_string();
        let event = KernelEvent::decode(&raw).expect("decode");
        let settings = event.settings().expect("settings");
        assert!(settings.start_requires_wallet);
    }

    #[test]
    fn unit_kernel_event_rejects_garbage_embedded_json() {
        let raw = serde_json::json!({
            "stateId": "state-4",
            "eventName": "issue_comment.created",
            "eventPayload": "{not json",
            "settings": {}
        })
        .to_string();
        let event = KernelEvent::decode(&raw).expect("decode");
        let error = event.payload().expect_err("embedded garbage");
        assert!(format!("{error:#}").contains("eventPayload"));
    }
}
