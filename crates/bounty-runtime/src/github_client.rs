use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use bounty_github::payloads::{
    GithubComment, GithubIssue, GithubPullRequest, GithubReview, GithubTimelineEvent, GithubUser,
};
use bounty_github::transport::{
    is_retryable_github_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

use crate::context::RepoRef;

const CLOSING_ISSUES_QUERY: &str = r"query closingIssues($owner: String!, $repo: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      closingIssuesReferences(first: 10, after: $cursor) {
        nodes {
          number
          url
          assignees(first: 100) {
            nodes { login }
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}";

#[derive(Debug, Clone, Deserialize)]
/// Public struct `GithubCommentCreateResponse` used across bounty components.
pub struct GithubCommentCreateResponse {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Issue referenced by a pull request as "closes #N", with the logins it is
/// currently assigned to.
pub struct ClosingIssueReference {
    pub number: u64,
    pub url: String,
    pub assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchIssuesResponse {
    #[serde(default)]
    items: Vec<GithubIssue>,
}

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    role: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<ClosingData>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorMessage>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClosingData {
    #[serde(default)]
    repository: Option<ClosingRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingRepository {
    #[serde(default)]
    pull_request: Option<ClosingPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingPullRequest {
    #[serde(default)]
    closing_issues_references: Option<ClosingReferencesPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingReferencesPage {
    #[serde(default)]
    nodes: Vec<ClosingReferenceNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct ClosingReferenceNode {
    number: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    assignees: Option<AssigneePage>,
}

#[derive(Debug, Deserialize)]
struct AssigneePage {
    #[serde(default)]
    nodes: Vec<AssigneeNode>,
}

#[derive(Debug, Deserialize)]
struct AssigneeNode {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Clone)]
/// REST and GraphQL adapter for the repository the event arrived on. All
/// requests share one retry policy keyed on retryable statuses and
/// transport errors.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub fn new(
        api_base: String,
        token: String,
        repo: RepoRef,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("bounty-assignment-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub async fn get_issue(&self, issue_number: u64) -> Result<GithubIssue> {
        self.request_json("get issue", || {
            self.http.get(format!(
                "{}/repos/{}/{}/issues/{}",
                self.api_base, self.repo.owner, self.repo.name, issue_number
            ))
        })
        .await
    }

    pub async fn list_issue_comments(&self, issue_number: u64) -> Result<Vec<GithubComment>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let api_base = self.api_base.clone();
            let owner = self.repo.owner.clone();
            let repo = self.repo.name.clone();
            let page_value = page.to_string();
            let chunk: Vec<GithubComment> = self
                .request_json("list issue comments", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/issues/{}/comments",
                            api_base, owner, repo, issue_number
                        ))
                        .query(&[
                            ("sort", "created"),
                            ("direction", "asc"),
                            ("per_page", "100"),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn create_issue_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, self.repo.owner, self.repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn add_assignees(&self, issue_number: u64, logins: &[String]) -> Result<GithubIssue> {
        let payload = json!({ "assignees": logins });
        self.request_json("add assignees", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/assignees",
                    self.api_base, self.repo.owner, self.repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn remove_assignees(
        &self,
        issue_number: u64,
        logins: &[String],
    ) -> Result<GithubIssue> {
        let payload = json!({ "assignees": logins });
        self.request_json("remove assignees", || {
            self.http
                .delete(format!(
                    "{}/repos/{}/{}/issues/{}/assignees",
                    self.api_base, self.repo.owner, self.repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn list_timeline_events(
        &self,
        issue_number: u64,
    ) -> Result<Vec<GithubTimelineEvent>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let api_base = self.api_base.clone();
            let owner = self.repo.owner.clone();
            let repo = self.repo.name.clone();
            let page_value = page.to_string();
            let chunk: Vec<GithubTimelineEvent> = self
                .request_json("list issue timeline", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/issues/{}/timeline",
                            api_base, owner, repo, issue_number
                        ))
                        .query(&[("per_page", "100"), ("page", page_value.as_str())])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn list_open_pull_requests(&self) -> Result<Vec<GithubPullRequest>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let api_base = self.api_base.clone();
            let owner = self.repo.owner.clone();
            let repo = self.repo.name.clone();
            let page_value = page.to_string();
            let chunk: Vec<GithubPullRequest> = self
                .request_json("list open pull requests", || {
                    self.http
                        .get(format!("{}/repos/{}/{}/pulls", api_base, owner, repo))
                        .query(&[
                            ("state", "open"),
                            ("per_page", "100"),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn list_pull_request_reviews(&self, pull_number: u64) -> Result<Vec<GithubReview>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let api_base = self.api_base.clone();
            let owner = self.repo.owner.clone();
            let repo = self.repo.name.clone();
            let page_value = page.to_string();
            let chunk: Vec<GithubReview> = self
                .request_json("list pull request reviews", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/pulls/{}/reviews",
                            api_base, owner, repo, pull_number
                        ))
                        .query(&[("per_page", "100"), ("page", page_value.as_str())])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    /// Closes a pull request in the repository it belongs to, which may be a
    /// sibling repository of the same organization.
    pub async fn close_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> Result<GithubPullRequest> {
        let payload = json!({ "state": "closed" });
        self.request_json("close pull request", || {
            self.http
                .patch(format!(
                    "{}/repos/{}/{}/pulls/{}",
                    self.api_base, owner, repo, pull_number
                ))
                .json(&payload)
        })
        .await
    }

    /// Open issues assigned to `username` anywhere in the organization.
    pub async fn search_assigned_issues(
        &self,
        username: &str,
        organization: &str,
    ) -> Result<Vec<GithubIssue>> {
        let query = format!("is:issue is:open assignee:{username} org:{organization}");
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let api_base = self.api_base.clone();
            let query_value = query.clone();
            let page_value = page.to_string();
            let chunk: SearchIssuesResponse = self
                .request_json("search assigned issues", || {
                    self.http
                        .get(format!("{}/search/issues", api_base))
                        .query(&[
                            ("q", query_value.as_str()),
                            ("per_page", "100"),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.items.len();
            rows.extend(
                chunk
                    .items
                    .into_iter()
                    .filter(|issue| issue.pull_request.is_none()),
            );
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn org_membership_role(&self, organization: &str, username: &str) -> Result<String> {
        let membership: MembershipResponse = self
            .request_json("get organization membership", || {
                self.http.get(format!(
                    "{}/orgs/{}/memberships/{}",
                    self.api_base, organization, username
                ))
            })
            .await?;
        Ok(membership.role)
    }

    pub async fn user_by_login(&self, login: &str) -> Result<GithubUser> {
        self.request_json("get user", || {
            self.http
                .get(format!("{}/users/{}", self.api_base, login))
        })
        .await
    }

    pub async fn branch_head_sha(&self, branch: &str) -> Result<String> {
        let commit: CommitResponse = self
            .request_json("get branch head", || {
                self.http.get(format!(
                    "{}/repos/{}/{}/commits/{}",
                    self.api_base, self.repo.owner, self.repo.name, branch
                ))
            })
            .await?;
        Ok(commit.sha)
    }

    /// Issues the pull request declares it closes, via the GraphQL
    /// `closingIssuesReferences` connection.
    pub async fn closing_issue_references(
        &self,
        pull_number: u64,
    ) -> Result<Vec<ClosingIssueReference>> {
        let mut cursor: Option<String> = None;
        let mut references = Vec::new();
        loop {
            let variables = json!({
                "owner": self.repo.owner,
                "repo": self.repo.name,
                "number": pull_number,
                "cursor": cursor,
            });
            let payload = json!({ "query": CLOSING_ISSUES_QUERY, "variables": variables });
            let response: GraphqlResponse = self
                .request_json("closing issue references", || {
                    self.http
                        .post(format!("{}/graphql", self.api_base))
                        .json(&payload)
                })
                .await?;
            if let Some(errors) = response.errors {
                if let Some(first) = errors.first() {
                    bail!(
                        "github graphql closing issue references failed: {}",
                        first.message
                    );
                }
            }
            let Some(chunk) = response
                .data
                .and_then(|data| data.repository)
                .and_then(|repository| repository.pull_request)
                .and_then(|pull_request| pull_request.closing_issues_references)
            else {
                break;
            };
            references.extend(chunk.nodes.into_iter().map(|node| ClosingIssueReference {
                number: node.number,
                url: node.url,
                assignees: node
                    .assignees
                    .map(|page| page.nodes.into_iter().map(|node| node.login).collect())
                    .unwrap_or_default(),
            }));
            if chunk.page_info.has_next_page {
                match chunk.page_info.end_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            } else {
                break;
            }
        }
        Ok(references)
    }

    /// Reports a run result back to the kernel through a repository dispatch
    /// event.
    pub async fn repository_dispatch(
        &self,
        event_type: &str,
        client_payload: &serde_json::Value,
    ) -> Result<()> {
        let payload = json!({
            "event_type": event_type,
            "client_payload": client_payload,
        });
        self.request_unit("repository dispatch", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/dispatches",
                    self.api_base, self.repo.owner, self.repo.name
                ))
                .json(&payload)
        })
        .await
    }

    async fn request_unit<F>(&self, operation: &str, mut request_builder: F) -> Result<()>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-bounty-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(());
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_github_status(status.as_u16())
                    {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-bounty-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode github {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_github_status(status.as_u16())
                    {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}
