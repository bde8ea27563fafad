use std::collections::HashSet;

use anyhow::{Context, Result};

use bounty_github::issue_links::issue_linked_via_pr_body;
use bounty_github::render::render_closed_pull_requests_notice;
use bounty_github::timeline::collect_linked_pull_requests;

use crate::context::RuntimeContext;

/// Closes the unassigned author's open linked pull requests and posts one
/// notice listing what was closed. A timeline fetch failure downgrades to a
/// no-op; failures while actually closing or announcing propagate.
pub async fn close_linked_pull_requests(
    ctx: &RuntimeContext,
    issue_number: u64,
    author: &str,
) -> Result<Vec<String>> {
    let events = match ctx.github.list_timeline_events(issue_number).await {
        Ok(events) => events,
        Err(error) => {
            tracing::warn!(
                issue = issue_number,
                error = %error,
                "skipping linked pull request cleanup, timeline fetch failed"
            );
            return Ok(Vec::new());
        }
    };
    let linked = collect_linked_pull_requests(&events);
    if linked.is_empty() {
        tracing::info!(issue = issue_number, "no linked pull requests to close");
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut closed = Vec::new();
    for pull_request in linked {
        if !seen.insert((
            pull_request.organization.clone(),
            pull_request.repository.clone(),
            pull_request.number,
        )) {
            continue;
        }
        if !pull_request.is_open() {
            continue;
        }
        if !pull_request.author.eq_ignore_ascii_case(author) {
            continue;
        }
        if !pull_request
            .organization
            .eq_ignore_ascii_case(&ctx.repo.owner)
        {
            continue;
        }
        if !issue_linked_via_pr_body(pull_request.body.as_deref(), issue_number) {
            tracing::info!(
                pull_request = pull_request.number,
                issue = issue_number,
                "linked pull request does not reference the issue, leaving it open"
            );
            continue;
        }
        ctx.github
            .close_pull_request(
                &pull_request.organization,
                &pull_request.repository,
                pull_request.number,
            )
            .await
            .context("closing pull requests failed")?;
        closed.push(pull_request.href.clone());
    }

    if !closed.is_empty() {
        let notice = render_closed_pull_requests_notice(&closed);
        ctx.github
            .create_issue_comment(issue_number, &notice)
            .await
            .context("failed to post closed pull request notice")?;
    }
    Ok(closed)
}
