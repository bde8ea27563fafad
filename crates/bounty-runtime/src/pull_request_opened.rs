use anyhow::Context;

use bounty_github::payloads::GithubPullRequest;
use bounty_github::render::render_start_reminder;

use crate::context::RuntimeContext;
use crate::dispatch::ResultReport;
use crate::error::{HandlerResult, StartStopError};

/// Checks a freshly opened pull request against its closing-issue references
/// and reminds the author to `/start` any task they never claimed.
pub async fn check_closing_references(
    ctx: &RuntimeContext,
    pull_request: &GithubPullRequest,
) -> HandlerResult<ResultReport> {
    let references = ctx
        .github
        .closing_issue_references(pull_request.number)
        .await
        .map_err(StartStopError::Api)?;
    if references.is_empty() {
        return Ok(ResultReport::skipped("no closing issue references"));
    }

    let author = pull_request.user.login.as_str();
    let unclaimed: Vec<String> = references
        .iter()
        .filter(|reference| {
            !reference
                .assignees
                .iter()
                .any(|assignee| assignee.eq_ignore_ascii_case(author))
        })
        .map(|reference| reference.url.clone())
        .collect();
    if unclaimed.is_empty() {
        return Ok(ResultReport::ok());
    }

    ctx.github
        .create_issue_comment(
            pull_request.number,
            &render_start_reminder(author, &unclaimed),
        )
        .await
        .context("failed to post the start reminder")
        .map_err(StartStopError::Api)?;
    tracing::info!(
        pull_number = pull_request.number,
        unclaimed = unclaimed.len(),
        "reminded the author to start the linked tasks"
    );
    Ok(ResultReport::ok())
}
