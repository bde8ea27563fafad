use std::sync::Arc;

use anyhow::{bail, Result};

use bounty_github::payloads::WebhookPayload;
use bounty_github::render::render_error_notice;
use bounty_github::timeline::BotIdentity;

use crate::error::StartStopError;
use crate::github_client::GithubApiClient;
use crate::settings::NormalizedSettings;
use crate::user_backend::UserBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RepoRef` used across bounty components.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split('/');
        let owner = parts.next().unwrap_or_default().trim().to_string();
        let name = parts.next().unwrap_or_default().trim().to_string();
        let extra = parts.next();
        if owner.is_empty() || name.is_empty() || extra.is_some() {
            bail!("invalid repository slug '{raw}', expected owner/repo");
        }
        Ok(Self { owner, name })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Everything one event run needs: normalized settings, the GitHub and user
/// backend adapters, bot identity, and the decoded webhook payload.
pub struct RuntimeContext {
    pub settings: NormalizedSettings,
    pub github: GithubApiClient,
    pub backend: Arc<dyn UserBackend>,
    pub bot: BotIdentity,
    pub repo: RepoRef,
    pub payload: WebhookPayload,
}

impl RuntimeContext {
    /// Organization used for membership and assigned-issue queries. Falls
    /// back to the repository owner when the event carries no organization.
    pub fn organization(&self) -> &str {
        self.payload
            .organization
            .as_ref()
            .map(|org| org.login.as_str())
            .unwrap_or(self.repo.owner.as_str())
    }

    /// Posts the explanatory diff comment for a policy refusal and converts
    /// it into the handler error. A failed comment post outranks the
    /// refusal itself.
    pub(crate) async fn reject(&self, issue_number: u64, message: &str) -> StartStopError {
        self.reject_with_comment(issue_number, &render_error_notice(message), message)
            .await
    }

    pub(crate) async fn reject_with_comment(
        &self,
        issue_number: u64,
        comment: &str,
        message: &str,
    ) -> StartStopError {
        match self.github.create_issue_comment(issue_number, comment).await {
            Ok(_) => StartStopError::rejected(message),
            Err(error) => StartStopError::Api(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RepoRef;

    #[test]
    fn unit_repo_ref_parses_owner_and_name() {
        let repo = RepoRef::parse("acme/widgets").expect("slug");
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.as_slug(), "acme/widgets");
    }

    #[test]
    fn unit_repo_ref_rejects_malformed_slugs() {
        assert!(RepoRef::parse("acme").is_err());
        assert!(RepoRef::parse("acme/").is_err());
        assert!(RepoRef::parse("acme/widgets/extra").is_err());
    }
}
