use std::fmt;

use crate::github_client::GithubApiClient;
use crate::settings::TaskLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Concurrent-task allowance for one role.
pub enum TaskLimit {
    Bounded(u32),
    Unlimited,
}

impl TaskLimit {
    pub fn allows(&self, active_tasks: u64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Bounded(limit) => active_tasks < u64::from(*limit),
        }
    }
}

impl fmt::Display for TaskLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Bounded(limit) => write!(f, "{limit}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RoleTaskLimit` used across bounty components.
pub struct RoleTaskLimit {
    pub role: String,
    pub limit: TaskLimit,
}

fn smallest_configured(limits: &TaskLimits) -> RoleTaskLimit {
    match limits.smallest() {
        Some((role, limit)) => RoleTaskLimit {
            role,
            limit: TaskLimit::Bounded(limit),
        },
        None => RoleTaskLimit {
            role: String::new(),
            limit: TaskLimit::Unlimited,
        },
    }
}

/// Resolves the user's organization role and the task limit it grants.
///
/// Unconfigured roles fall back to the smallest configured limit, except
/// `admin` which is unlimited when absent from the map. Membership lookups
/// are best effort: query failures also fall back to the smallest limit.
pub async fn resolve_role_and_limit(
    github: &GithubApiClient,
    organization: &str,
    username: &str,
    limits: &TaskLimits,
) -> RoleTaskLimit {
    let fallback = smallest_configured(limits);
    match github.org_membership_role(organization, username).await {
        Ok(role) => {
            let role = role.trim().to_ascii_lowercase();
            if let Some(limit) = limits.limit_for(&role) {
                RoleTaskLimit {
                    role,
                    limit: TaskLimit::Bounded(limit),
                }
            } else if role == "admin" {
                RoleTaskLimit {
                    role,
                    limit: TaskLimit::Unlimited,
                }
            } else {
                fallback
            }
        }
        Err(error) => {
            tracing::warn!(
                username,
                organization,
                error = %error,
                "membership lookup failed, falling back to smallest task limit"
            );
            fallback
        }
    }
}
