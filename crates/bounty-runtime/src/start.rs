use anyhow::{anyhow, Context};
use chrono::Utc;
use serde_json::json;

use bounty_github::duration_labels::{
    calculate_durations, days_elapsed_since, format_deadline, is_task_stale, parse_price_label,
    task_payment_snapshot,
};
use bounty_github::issue_links::is_parent_issue;
use bounty_github::payloads::{GithubIssue, GithubUser};
use bounty_github::render::{
    render_assignment_table, render_assignment_tips, render_error_notice, render_header_notice,
    render_hidden_metadata, render_info_notice, AssignmentTable,
};

use crate::assignment_history::has_user_been_unassigned;
use crate::context::RuntimeContext;
use crate::error::{HandlerResult, StartStopError};
use crate::task_limits::{resolve_role_and_limit, RoleTaskLimit};
use crate::workload::{workload_for, WorkloadSnapshot};

pub const MSG_TASK_ASSIGNED: &str = "Task assigned successfully";

enum DropReason {
    OverLimit { message: String },
    Disqualified { message: String },
}

impl DropReason {
    fn message(&self) -> &str {
        match self {
            Self::OverLimit { message } | Self::Disqualified { message } => message,
        }
    }
}

/// Runs the `/start` pipeline: policy gates, candidate vetting, assignment,
/// and the confirmation comment with its hidden audit metadata.
pub async fn start(
    ctx: &RuntimeContext,
    issue: &GithubIssue,
    sender: &GithubUser,
    teammates: &[String],
) -> HandlerResult<String> {
    if is_parent_issue(issue.body.as_deref().unwrap_or_default()) {
        return Err(ctx
            .reject_with_comment(
                issue.number,
                &render_header_notice(
                    "Please select a child issue from the specification checklist to work on. The '/start' command is disabled on parent issues.",
                ),
                "Skipping '/start' since the issue is a parent issue",
            )
            .await);
    }

    let revision = resolve_revision(ctx).await;

    let sender_limit = resolve_role_and_limit(
        &ctx.github,
        ctx.organization(),
        &sender.login,
        &ctx.settings.task_limits,
    )
    .await;
    let sender_workload = workload_for(ctx, &sender.login)
        .await
        .map_err(StartStopError::Api)?;
    if !sender_limit.limit.allows(sender_workload.active_tasks()) {
        let message = format!(
            "Too many assigned issues, you have reached your max limit of {} issues.",
            sender_limit.limit
        );
        return Err(ctx.reject(issue.number, &message).await);
    }

    if issue.is_closed() {
        return Err(ctx
            .reject(issue.number, "This issue is closed, please choose another.")
            .await);
    }

    if !issue.assignees.is_empty() {
        let message = if issue
            .assignees
            .iter()
            .any(|assignee| assignee.login.eq_ignore_ascii_case(&sender.login))
        {
            "You are already assigned to this task."
        } else {
            "This issue is already assigned. Please choose another unassigned task."
        };
        return Err(ctx.reject(issue.number, message).await);
    }

    let mut candidates: Vec<String> = teammates
        .iter()
        .filter(|teammate| !teammate.eq_ignore_ascii_case(&sender.login))
        .cloned()
        .collect();
    candidates.push(sender.login.clone());
    let solo = candidates.len() == 1;

    let mut to_assign: Vec<String> = Vec::new();
    let mut last_drop: Option<DropReason> = None;
    for candidate in &candidates {
        let (role_limit, workload) = if candidate.eq_ignore_ascii_case(&sender.login) {
            (sender_limit.clone(), sender_workload)
        } else {
            let role_limit = resolve_role_and_limit(
                &ctx.github,
                ctx.organization(),
                candidate,
                &ctx.settings.task_limits,
            )
            .await;
            let workload = workload_for(ctx, candidate)
                .await
                .map_err(StartStopError::Api)?;
            (role_limit, workload)
        };
        match vet_candidate(ctx, issue, candidate, sender, &role_limit, workload).await? {
            None => to_assign.push(candidate.clone()),
            Some(dropped) => {
                if !solo {
                    ctx.github
                        .create_issue_comment(issue.number, &render_error_notice(dropped.message()))
                        .await
                        .map_err(StartStopError::Api)?;
                }
                last_drop = Some(dropped);
            }
        }
    }

    if to_assign.is_empty() {
        return Err(if !solo {
            ctx.reject(
                issue.number,
                "All teammates have reached their max task limit. Please close out some tasks before assigning new ones.",
            )
            .await
        } else {
            match last_drop {
                Some(DropReason::Disqualified { message }) => {
                    ctx.reject(issue.number, &message).await
                }
                _ => {
                    ctx.reject(
                        issue.number,
                        "You have reached your max task limit. Please close out some tasks before assigning new ones.",
                    )
                    .await
                }
            }
        });
    }

    let Some(price_label) = issue
        .labels
        .iter()
        .find(|label| label.name.starts_with("Price: "))
    else {
        return Err(ctx
            .reject(issue.number, "No price label is set to calculate the duration")
            .await);
    };

    let wallet = ctx
        .backend
        .wallet_address(sender.id)
        .await
        .context("Error while fetching the wallet address")
        .map_err(StartStopError::Api)?;
    let registered_wallet = match wallet {
        Some(address) => address,
        None => {
            if ctx.settings.start_requires_wallet {
                return Err(ctx
                    .reject_with_comment(
                        issue.number,
                        &render_header_notice(
                            "Please set your wallet address with the /wallet command first and try again.",
                        ),
                        "No wallet address found",
                    )
                    .await);
            }
            tracing::info!(
                sender = %sender.login,
                "wallet missing, proceeding under soft wallet policy"
            );
            ctx.settings.empty_wallet_text.clone()
        }
    };

    let multiplier = ctx
        .backend
        .payout_multiplier(sender.id, ctx.payload.repository.id)
        .await
        .context("Error while fetching the payout multiplier")
        .map_err(StartStopError::Api)?;

    let mut assignee_ids = Vec::with_capacity(to_assign.len());
    for login in &to_assign {
        let user = ctx
            .github
            .user_by_login(login)
            .await
            .context("Error while fetching user ids")
            .map_err(StartStopError::Api)?;
        assignee_ids.push(user.id);
    }

    ctx.github
        .add_assignees(issue.number, &to_assign)
        .await
        .context("Adding the assignee failed")
        .map_err(StartStopError::Api)?;
    if to_assign.len() > 1 {
        confirm_multi_assignment(ctx, issue.number).await?;
    }

    let now = Utc::now();
    let durations = calculate_durations(&issue.labels);
    let deadline = durations
        .first()
        .map(|shortest| format_deadline(now, *shortest));
    let stale = is_task_stale(ctx.settings.task_stale_timeout_seconds, &issue.created_at, now);
    let days_elapsed = days_elapsed_since(&issue.created_at, now);

    let payment = task_payment_snapshot(
        &ctx.settings.time_labels,
        &ctx.settings.priority_labels,
        &issue.labels,
    );
    let mut metadata = json!({
        "deadline": deadline,
        "assignee_ids": assignee_ids,
        "price_label": price_label.name,
        "eligible_for_payment": payment.eligible_for_payment,
        "time_label": payment.time_label,
        "priority_label": payment.priority_label,
    });
    if let (Some(multiplier), Some(object)) = (&multiplier, metadata.as_object_mut()) {
        object.insert("multiplier".to_string(), json!(multiplier.value));
        object.insert("multiplier_reason".to_string(), json!(multiplier.reason));
        if let Some(value) = multiplier.value {
            if value != 1.0 {
                let total = match parse_price_label(&price_label.name) {
                    Some(price) => format!("{} {}", price.amount * value, price.currency),
                    None => "Permit generation disabled because price label is not set."
                        .to_string(),
                };
                object.insert("total_price".to_string(), json!(total));
            }
        }
    }

    let table = render_assignment_table(&AssignmentTable {
        deadline: deadline.as_deref(),
        registered_wallet: &registered_wallet,
        is_task_stale: stale,
        days_elapsed,
    });
    let comment = format!(
        "{}\n{}\n{}",
        table,
        render_assignment_tips(),
        render_hidden_metadata("Assignment", revision.as_deref(), &metadata)
    );
    ctx.github
        .create_issue_comment(issue.number, &comment)
        .await
        .context("failed to post the assignment comment")
        .map_err(StartStopError::Api)?;

    tracing::info!(
        issue = issue.number,
        assignees = to_assign.len(),
        "task assigned"
    );
    Ok(MSG_TASK_ASSIGNED.to_string())
}

/// Short default-branch head SHA for the audit metadata. Best effort: a
/// failed lookup is logged and the flow continues without a revision.
async fn resolve_revision(ctx: &RuntimeContext) -> Option<String> {
    let branch = ctx.payload.repository.default_branch.as_str();
    if branch.is_empty() {
        return None;
    }
    match ctx.github.branch_head_sha(branch).await {
        Ok(sha) => Some(short_sha(sha)),
        Err(error) => {
            tracing::warn!(
                branch,
                error = %error,
                "failed to resolve default branch head for audit metadata"
            );
            None
        }
    }
}

fn short_sha(sha: String) -> String {
    match sha.get(0..7) {
        Some(prefix) => prefix.to_string(),
        None => sha,
    }
}

async fn vet_candidate(
    ctx: &RuntimeContext,
    issue: &GithubIssue,
    candidate: &str,
    sender: &GithubUser,
    role_limit: &RoleTaskLimit,
    workload: WorkloadSnapshot,
) -> Result<Option<DropReason>, StartStopError> {
    if !role_limit.limit.allows(workload.active_tasks()) {
        let message = if candidate.eq_ignore_ascii_case(&sender.login) {
            "You have reached your max task limit".to_string()
        } else {
            format!("{candidate} has reached their max task limit")
        };
        return Ok(Some(DropReason::OverLimit { message }));
    }
    if has_user_been_unassigned(ctx, issue.number, candidate)
        .await
        .map_err(StartStopError::Api)?
    {
        return Ok(Some(DropReason::Disqualified {
            message: format!(
                "{candidate} you were previously unassigned from this task. You cannot be reassigned."
            ),
        }));
    }
    Ok(None)
}

/// Re-reads the issue after a multi-user assignment. GitHub silently keeps a
/// private repository at one assignee on unpaid plans; surface that instead
/// of letting users assume the whole team was added.
async fn confirm_multi_assignment(ctx: &RuntimeContext, issue_number: u64) -> HandlerResult<()> {
    let issue = ctx
        .github
        .get_issue(issue_number)
        .await
        .context("Error while confirming the assignment")
        .map_err(StartStopError::Api)?;
    if issue.assignees.is_empty() {
        return Err(StartStopError::Api(anyhow!(
            "We detected that this task was not assigned to anyone. Please report this to the maintainers."
        )));
    }
    if ctx.payload.repository.private && issue.assignees.len() <= 1 {
        ctx.github
            .create_issue_comment(
                issue_number,
                &render_info_notice(
                    "This task belongs to a private repo and can only be assigned to one user without an official paid GitHub subscription.",
                ),
            )
            .await
            .context("failed to post the private repository notice")
            .map_err(StartStopError::Api)?;
    }
    Ok(())
}
