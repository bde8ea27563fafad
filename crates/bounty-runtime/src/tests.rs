//! Workflow tests for the assignment-bot runtime against mocked GitHub and
//! user-backend endpoints.

use std::sync::Arc;

use chrono::{Duration, Utc};
use httpmock::prelude::*;
use serde_json::json;

use bounty_github::payloads::WebhookPayload;
use bounty_github::timeline::BotIdentity;

use crate::context::{RepoRef, RuntimeContext};
use crate::dispatch::{dispatch_event, RunStatus};
use crate::github_client::GithubApiClient;
use crate::settings::{NormalizedSettings, StartStopSettings};
use crate::user_backend::PostgrestUserBackend;

const BOT_APP_ID: u64 = 710776;

fn recent_timestamp(days_ago: i64) -> String {
    (Utc::now() - Duration::days(days_ago)).to_rfc3339()
}

fn decode_settings(value: serde_json::Value) -> NormalizedSettings {
    let settings: StartStopSettings = serde_json::from_value(value).expect("settings decode");
    settings.normalize().expect("settings normalize")
}

fn test_settings() -> NormalizedSettings {
    decode_settings(json!({
        "labels": {
            "time": ["Time: <1 Hour", "Time: <2 Days"],
            "priority": ["Priority: 1 (Normal)", "Priority: 2 (Medium)"]
        },
        "timers": {
            "reviewDelayTolerance": "1 Day",
            "taskStaleTimeoutDuration": "28 Days"
        },
        "maxConcurrentTasks": {"member": 10, "contributor": 2}
    }))
}

fn repository_json() -> serde_json::Value {
    json!({
        "id": 99,
        "name": "widgets",
        "owner": {"login": "acme", "id": 1},
        "private": false,
        "default_branch": "main"
    })
}

fn open_issue_json(number: u64, labels: &[&str], assignees: &[(&str, u64)]) -> serde_json::Value {
    json!({
        "id": number * 100,
        "number": number,
        "state": "open",
        "title": "Implement the widget pipeline",
        "body": "Ship the widget pipeline end to end.",
        "created_at": recent_timestamp(3),
        "html_url": format!("https://github.com/acme/widgets/issues/{number}"),
        "labels": labels.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
        "assignees": assignees
            .iter()
            .map(|(login, id)| json!({"login": login, "id": id}))
            .collect::<Vec<_>>()
    })
}

fn command_payload(issue: serde_json::Value, body: &str, sender: (&str, u64)) -> WebhookPayload {
    serde_json::from_value(json!({
        "issue": issue,
        "comment": {
            "id": 9001,
            "body": body,
            "created_at": recent_timestamp(0),
            "user": {"login": sender.0, "id": sender.1}
        },
        "sender": {"login": sender.0, "id": sender.1},
        "repository": repository_json()
    }))
    .expect("payload decode")
}

fn event_payload(value: serde_json::Value) -> WebhookPayload {
    serde_json::from_value(value).expect("payload decode")
}

fn test_context(server: &MockServer, payload: WebhookPayload) -> RuntimeContext {
    context_with_settings(server, payload, test_settings())
}

fn context_with_settings(
    server: &MockServer,
    payload: WebhookPayload,
    settings: NormalizedSettings,
) -> RuntimeContext {
    let repo = RepoRef::parse("acme/widgets").expect("repo slug");
    let github = GithubApiClient::new(
        server.base_url(),
        "test-token".to_string(),
        repo.clone(),
        3_000,
        2,
        1,
    )
    .expect("github client");
    let backend =
        PostgrestUserBackend::new(&server.base_url(), "test-key", 3_000).expect("user backend");
    RuntimeContext {
        settings,
        github,
        backend: Arc::new(backend),
        bot: BotIdentity {
            app_id: Some(BOT_APP_ID),
            bot_logins: vec!["bounty-bot[bot]".to_string()],
        },
        repo,
        payload,
    }
}
