use anyhow::Result;
use chrono::{DateTime, Utc};

use bounty_github::payloads::{GithubPullRequest, GithubReview};

use crate::context::RuntimeContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Snapshot of a user's open work inside the organization.
pub struct WorkloadSnapshot {
    pub assigned_issues: usize,
    pub available_pull_requests: usize,
}

impl WorkloadSnapshot {
    /// Active tasks counted against the limit. Each reviewable pull request
    /// forgives one assigned issue, never pushing the count below zero.
    pub fn active_tasks(&self) -> u64 {
        (self.assigned_issues as u64).saturating_sub(self.available_pull_requests as u64)
    }
}

pub async fn workload_for(ctx: &RuntimeContext, username: &str) -> Result<WorkloadSnapshot> {
    let assigned = ctx
        .github
        .search_assigned_issues(username, ctx.organization())
        .await?;
    let available = available_opened_pull_requests(ctx, username, Utc::now()).await?;
    Ok(WorkloadSnapshot {
        assigned_issues: assigned.len(),
        available_pull_requests: available.len(),
    })
}

/// Open non-draft pull requests by `username` that are reviewable: approved,
/// or unreviewed for longer than the configured tolerance. A zero tolerance
/// disables the check and reports no pull requests as reviewable.
pub async fn available_opened_pull_requests(
    ctx: &RuntimeContext,
    username: &str,
    now: DateTime<Utc>,
) -> Result<Vec<GithubPullRequest>> {
    let tolerance_seconds = ctx.settings.review_delay_tolerance_seconds;
    if tolerance_seconds == 0 {
        return Ok(Vec::new());
    }
    let opened = ctx.github.list_open_pull_requests().await?;
    let mut available = Vec::new();
    for pull_request in opened {
        if pull_request.draft {
            continue;
        }
        if !pull_request.user.login.eq_ignore_ascii_case(username) {
            continue;
        }
        let reviews = ctx
            .github
            .list_pull_request_reviews(pull_request.number)
            .await?;
        if reviews.iter().any(GithubReview::is_approved) {
            available.push(pull_request);
            continue;
        }
        if reviews.is_empty() && age_seconds(&pull_request.created_at, now) >= tolerance_seconds {
            available.push(pull_request);
        }
    }
    Ok(available)
}

fn age_seconds(created_at: &str, now: DateTime<Utc>) -> u64 {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return 0;
    };
    u64::try_from(
        now.signed_duration_since(created.with_timezone(&Utc))
            .num_seconds(),
    )
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{age_seconds, WorkloadSnapshot};
    use chrono::{TimeZone, Utc};

    #[test]
    fn unit_active_tasks_saturates_at_zero() {
        let light = WorkloadSnapshot {
            assigned_issues: 2,
            available_pull_requests: 3,
        };
        assert_eq!(light.active_tasks(), 0);
        let heavy = WorkloadSnapshot {
            assigned_issues: 5,
            available_pull_requests: 2,
        };
        assert_eq!(heavy.active_tasks(), 3);
    }

    #[test]
    fn unit_age_seconds_handles_bad_and_future_timestamps() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).single().expect("time");
        assert_eq!(age_seconds("2026-08-25T11:59:00Z", now), 60);
        assert_eq!(age_seconds("2026-08-25T13:00:00Z", now), 0);
        assert_eq!(age_seconds("not a date", now), 0);
    }
}
