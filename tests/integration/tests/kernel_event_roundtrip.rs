//! Full kernel round trips: decode the event envelope, run the handler
//! against mocked GitHub and user-backend endpoints, and deliver the run
//! result back through the repository dispatch channel.

use chrono::{Duration, Utc};
use httpmock::prelude::*;
use serde_json::{json, Value};

use bounty_runtime::dispatch::dispatch_event;
use bounty_runtime::kernel::{
    build_runtime_context, report_to_kernel, KernelEvent, RuntimeOptions,
};

fn recent_timestamp(days_ago: i64) -> String {
    (Utc::now() - Duration::days(days_ago)).to_rfc3339()
}

fn repository_json() -> Value {
    json!({
        "id": 99,
        "name": "widgets",
        "owner": {"login": "acme", "id": 1},
        "private": false,
        "default_branch": "main"
    })
}

fn start_command_payload() -> Value {
    json!({
        "issue": {
            "id": 100,
            "number": 1,
            "state": "open",
            "title": "Implement the widget pipeline",
            "body": "Ship the widget pipeline end to end.",
            "created_at": recent_timestamp(3),
            "html_url": "https://github.com/acme/widgets/issues/1",
            "labels": [{"name": "Price: 100 USD"}, {"name": "Time: <2 Days"}],
            "assignees": []
        },
        "comment": {
            "id": 9001,
            "body": "/start",
            "created_at": recent_timestamp(0),
            "user": {"login": "alice", "id": 2}
        },
        "sender": {"login": "alice", "id": 2},
        "repository": repository_json()
    })
}

fn plugin_settings() -> Value {
    json!({
        "labels": {
            "time": ["Time: <1 Hour", "Time: <2 Days"],
            "priority": ["Priority: 1 (Normal)"]
        },
        "timers": {
            "reviewDelayTolerance": "1 Day",
            "taskStaleTimeoutDuration": "28 Days"
        },
        "maxConcurrentTasks": {"member": 10, "contributor": 2}
    })
}

fn runtime_options(server: &MockServer) -> RuntimeOptions {
    RuntimeOptions {
        github_api_base: server.base_url(),
        github_token: "installation-token".to_string(),
        backend_url: server.base_url(),
        backend_key: "backend-key".to_string(),
        app_id: Some(710776),
        bot_logins: vec!["bounty-bot[bot]".to_string()],
        request_timeout_ms: 3_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
    }
}

/// The envelope variant where payload and settings arrive as JSON-encoded
/// strings, the way older kernel revisions ship them.
#[tokio::test]
async fn kernel_start_command_round_trip() {
    let server = MockServer::start();
    let raw = json!({
        "stateId": "state-it-1",
        "eventName": "issue_comment.created",
        "eventPayload": start_command_payload().to_string(),
        "settings": plugin_settings().to_string(),
        "authToken": "installation-token",
        "ref": "refs/heads/main"
    })
    .to_string();

    let head = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/commits/main");
        then.status(200)
            .json_body(json!({"sha": "0123456789abcdef0123456789abcdef01234567"}));
    });
    let membership = server.mock(|when, then| {
        when.method(GET).path("/orgs/acme/memberships/alice");
        then.status(200).json_body(json!({"role": "member"}));
    });
    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/search/issues")
            .query_param("q", "is:issue is:open assignee:alice org:acme");
        then.status(200).json_body(json!({"items": []}));
    });
    let pulls = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/pulls");
        then.status(200).json_body(json!([]));
    });
    let timeline = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues/1/timeline");
        then.status(200).json_body(json!([]));
    });
    let wallet = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/users")
            .query_param("id", "eq.2");
        then.status(200)
            .json_body(json!([{"wallets": {"address": "0x1234abcd"}}]));
    });
    let locations = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/locations")
            .query_param("repository_id", "eq.99");
        then.status(200).json_body(json!([]));
    });
    let user_lookup = server.mock(|when, then| {
        when.method(GET).path("/users/alice");
        then.status(200).json_body(json!({"login": "alice", "id": 2}));
    });
    let assign = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues/1/assignees")
            .json_body(json!({"assignees": ["alice"]}));
        then.status(201).json_body(json!({
            "id": 100,
            "number": 1,
            "state": "open",
            "title": "Implement the widget pipeline",
            "body": "Ship the widget pipeline end to end.",
            "created_at": recent_timestamp(3),
            "html_url": "https://github.com/acme/widgets/issues/1",
            "labels": [{"name": "Price: 100 USD"}, {"name": "Time: <2 Days"}],
            "assignees": [{"login": "alice", "id": 2}]
        }));
    });
    let summary = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues/1/comments")
            .body_includes("<td>Deadline</td>")
            .body_includes("<td>Registered Wallet</td><td>0x1234abcd</td>");
        then.status(201).json_body(json!({"id": 4242}));
    });
    let dispatches = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/dispatches")
            .json_body(json!({
                "event_type": "assignment-bot-result",
                "client_payload": {
                    "state_id": "state-it-1",
                    "output": "{\"status\":\"ok\",\"content\":\"Task assigned successfully\"}"
                }
            }));
        then.status(204);
    });

    let event = KernelEvent::decode(&raw).expect("kernel event decode");
    assert_eq!(event.auth_token, "installation-token");
    assert_eq!(event.git_ref.as_deref(), Some("refs/heads/main"));

    let ctx = build_runtime_context(&runtime_options(&server), &event).expect("runtime context");
    let report = dispatch_event(&ctx, &event.event_name)
        .await
        .expect("dispatch");
    report_to_kernel(&ctx.github, &event.state_id, &report)
        .await
        .expect("report delivery");

    head.assert_calls(1);
    membership.assert_calls(1);
    search.assert_calls(1);
    pulls.assert_calls(1);
    timeline.assert_calls(1);
    wallet.assert_calls(1);
    locations.assert_calls(1);
    user_lookup.assert_calls(1);
    assign.assert_calls(1);
    summary.assert_calls(1);
    dispatches.assert_calls(1);
}

/// Events the bot has no handler for still produce a delivered report, so
/// the kernel never waits on a run that silently did nothing.
#[tokio::test]
async fn kernel_unsupported_event_reports_skipped() {
    let server = MockServer::start();
    let raw = json!({
        "stateId": "state-it-2",
        "eventName": "issues.labeled",
        "eventPayload": {"repository": repository_json()},
        "settings": plugin_settings()
    })
    .to_string();

    let dispatches = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/dispatches")
            .json_body(json!({
                "event_type": "assignment-bot-result",
                "client_payload": {
                    "state_id": "state-it-2",
                    "output": "{\"status\":\"skipped\",\"reason\":\"unsupported event\"}"
                }
            }));
        then.status(204);
    });

    let event = KernelEvent::decode(&raw).expect("kernel event decode");
    let ctx = build_runtime_context(&runtime_options(&server), &event).expect("runtime context");
    let report = dispatch_event(&ctx, &event.event_name)
        .await
        .expect("dispatch");
    report_to_kernel(&ctx.github, &event.state_id, &report)
        .await
        .expect("report delivery");

    dispatches.assert_calls(1);
}
