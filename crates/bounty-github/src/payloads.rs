use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubUser` used across bounty components.
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubLabel` used across bounty components.
pub struct GithubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssue` used across bounty components.
pub struct GithubIssue {
    pub id: u64,
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GithubLabel>,
    #[serde(default)]
    pub assignees: Vec<GithubUser>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl GithubIssue {
    pub fn is_closed(&self) -> bool {
        self.state.eq_ignore_ascii_case("closed")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubRepository` used across bounty components.
pub struct GithubRepository {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub owner: GithubUser,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubComment` used across bounty components.
pub struct GithubComment {
    pub id: u64,
    pub body: Option<String>,
    pub created_at: String,
    pub user: GithubUser,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubPullRequest` used across bounty components.
pub struct GithubPullRequest {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub user: GithubUser,
    pub body: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubReview` used across bounty components.
pub struct GithubReview {
    pub state: String,
}

impl GithubReview {
    pub fn is_approved(&self) -> bool {
        self.state.eq_ignore_ascii_case("approved")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Raw issue timeline entry. Only assignment and cross-reference events are
/// consumed; everything else deserializes leniently and is ignored.
pub struct GithubTimelineEvent {
    pub event: String,
    #[serde(default)]
    pub actor: Option<GithubUser>,
    #[serde(default)]
    pub assignee: Option<GithubUser>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub source: Option<GithubTimelineSource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubTimelineSource` used across bounty components.
pub struct GithubTimelineSource {
    #[serde(default)]
    pub issue: Option<GithubTimelineSourceIssue>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// The issue half of a cross-reference timeline event. When `pull_request`
/// is present the referencing issue is itself a pull request.
pub struct GithubTimelineSourceIssue {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub repository: Option<GithubRepository>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Webhook payload fields consumed by the assignment handlers. Absent
/// sections stay `None` so one shape covers every supported event.
pub struct WebhookPayload {
    #[serde(default)]
    pub issue: Option<GithubIssue>,
    #[serde(default)]
    pub comment: Option<GithubComment>,
    #[serde(default)]
    pub sender: Option<GithubUser>,
    pub repository: GithubRepository,
    #[serde(default)]
    pub organization: Option<GithubUser>,
    #[serde(default)]
    pub pull_request: Option<GithubPullRequest>,
}
