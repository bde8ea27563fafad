use anyhow::{Context, Result};

use bounty_github::command::{parse_slash_command, SlashCommand};
use bounty_github::timeline::{
    collect_assignment_events, has_disqualifying_unassignment, AssignmentAction,
};

use crate::context::RuntimeContext;

/// Whether `candidate` has previously been removed from this task in a way
/// that bars reassignment. History fetch failures propagate: assignment must
/// not proceed on an unknown history.
pub async fn has_user_been_unassigned(
    ctx: &RuntimeContext,
    issue_number: u64,
    candidate: &str,
) -> Result<bool> {
    let events = ctx
        .github
        .list_timeline_events(issue_number)
        .await
        .context("Error while getting assignment events")?;
    let assignment_events = collect_assignment_events(&events);
    let candidate_was_unassigned = assignment_events.iter().any(|event| {
        event.action == AssignmentAction::Unassigned
            && event
                .assignee
                .as_deref()
                .is_some_and(|assignee| assignee.eq_ignore_ascii_case(candidate))
    });
    if !candidate_was_unassigned {
        return Ok(false);
    }
    let stop_comments = count_stop_comments(ctx, issue_number, candidate).await?;
    Ok(has_disqualifying_unassignment(
        &assignment_events,
        candidate,
        &ctx.bot,
        stop_comments,
    ))
}

/// `/stop` comments authored by the candidate on this issue. Each one
/// accounts for one bot-side unassignment when history is judged.
async fn count_stop_comments(
    ctx: &RuntimeContext,
    issue_number: u64,
    candidate: &str,
) -> Result<usize> {
    let comments = ctx
        .github
        .list_issue_comments(issue_number)
        .await
        .context("Error while listing issue comments")?;
    Ok(comments
        .iter()
        .filter(|comment| comment.user.login.eq_ignore_ascii_case(candidate))
        .filter(|comment| {
            matches!(
                parse_slash_command(comment.body.as_deref().unwrap_or_default()),
                Some(SlashCommand::Stop)
            )
        })
        .count())
}
