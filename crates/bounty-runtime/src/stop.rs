use anyhow::Context;

use bounty_github::payloads::{GithubIssue, GithubUser};
use bounty_github::render::render_info_notice;

use crate::context::RuntimeContext;
use crate::error::{HandlerResult, StartStopError};
use crate::linked_prs::close_linked_pull_requests;

pub const MSG_TASK_UNASSIGNED: &str = "Task unassigned successfully";

/// Runs the `/stop` pipeline: verifies the sender holds the assignment,
/// closes their linked pull requests, and removes them from the issue.
pub async fn stop(
    ctx: &RuntimeContext,
    issue: &GithubIssue,
    sender: &GithubUser,
) -> HandlerResult<String> {
    let assignee = issue
        .assignees
        .iter()
        .find(|assignee| assignee.login.eq_ignore_ascii_case(&sender.login));
    let Some(assignee) = assignee else {
        return Err(ctx
            .reject(issue.number, "You are not assigned to this task")
            .await);
    };

    close_linked_pull_requests(ctx, issue.number, &assignee.login)
        .await
        .map_err(StartStopError::Api)?;

    ctx.github
        .remove_assignees(issue.number, &[assignee.login.clone()])
        .await
        .context("removing the assignee failed")
        .map_err(StartStopError::Api)?;

    ctx.github
        .create_issue_comment(
            issue.number,
            &render_info_notice("You have been unassigned from the task"),
        )
        .await
        .context("failed to post the unassignment notice")
        .map_err(StartStopError::Api)?;

    tracing::info!(issue = issue.number, sender = %sender.login, "task unassigned");
    Ok(MSG_TASK_UNASSIGNED.to_string())
}
