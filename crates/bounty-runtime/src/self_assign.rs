use anyhow::Context;
use chrono::Utc;

use bounty_github::duration_labels::{calculate_durations, format_deadline};
use bounty_github::payloads::GithubIssue;
use bounty_github::render::render_deadline_mentions;

use crate::context::RuntimeContext;
use crate::dispatch::ResultReport;
use crate::error::{HandlerResult, StartStopError};

/// Posts a deadline reminder when users are assigned through the GitHub UI
/// instead of `/start`. Issues without time labels carry no deadline, so the
/// event is recorded and skipped.
pub async fn post_deadline_reminder(
    ctx: &RuntimeContext,
    issue: &GithubIssue,
) -> HandlerResult<ResultReport> {
    let durations = calculate_durations(&issue.labels);
    let Some(shortest) = durations.first() else {
        return Ok(ResultReport::skipped("no time labels on issue"));
    };
    if issue.assignees.is_empty() {
        return Ok(ResultReport::skipped("issue has no assignees"));
    }

    let deadline = format_deadline(Utc::now(), *shortest);
    let logins: Vec<String> = issue
        .assignees
        .iter()
        .map(|assignee| assignee.login.clone())
        .collect();
    ctx.github
        .create_issue_comment(issue.number, &render_deadline_mentions(&logins, &deadline))
        .await
        .context("failed to post the deadline reminder")
        .map_err(StartStopError::Api)?;

    tracing::info!(issue = issue.number, deadline = %deadline, "posted deadline reminder");
    Ok(ResultReport::ok())
}
