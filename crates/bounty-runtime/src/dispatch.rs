use serde::Serialize;

use bounty_github::command::{parse_slash_command, SlashCommand};
use bounty_github::payloads::GithubUser;
use bounty_github::render::render_error_notice;

use crate::context::RuntimeContext;
use crate::error::StartStopError;
use crate::pull_request_opened::check_closing_references;
use crate::self_assign::post_deadline_reminder;
use crate::start::start;
use crate::stop::stop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Kernel events the bot reacts to. Everything else is reported as skipped
/// rather than treated as an error.
pub enum EventKind {
    IssueCommentCreated,
    IssuesAssigned,
    IssuesUnassigned,
    PullRequestOpened,
}

impl EventKind {
    pub fn parse(event_name: &str) -> Option<Self> {
        match event_name {
            "issue_comment.created" => Some(Self::IssueCommentCreated),
            "issues.assigned" => Some(Self::IssuesAssigned),
            "issues.unassigned" => Some(Self::IssuesUnassigned),
            "pull_request.opened" => Some(Self::PullRequestOpened),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Outcome of one event run, reported back to the kernel.
pub struct ResultReport {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResultReport {
    pub fn ok() -> Self {
        Self {
            status: RunStatus::Ok,
            content: None,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Skipped,
            content: None,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            content: None,
            reason: Some(reason.into()),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Routes one kernel event to its handler and folds the outcome into the
/// report contract. Policy rejections become failed reports; only fatal
/// collaborator errors propagate to the caller.
pub async fn dispatch_event(
    ctx: &RuntimeContext,
    event_name: &str,
) -> Result<ResultReport, StartStopError> {
    let Some(kind) = EventKind::parse(event_name) else {
        tracing::warn!(event_name, "unsupported event, skipping");
        return Ok(ResultReport::skipped("unsupported event"));
    };

    match kind {
        EventKind::IssueCommentCreated => run_slash_command(ctx).await,
        EventKind::IssuesAssigned => {
            let Some(issue) = ctx.payload.issue.as_ref() else {
                return Ok(ResultReport::skipped("event payload carries no issue"));
            };
            fold_rejection(post_deadline_reminder(ctx, issue).await)
        }
        EventKind::IssuesUnassigned => {
            tracing::info!("assignee removal recorded, nothing to run");
            Ok(ResultReport::skipped("no handler for issues.unassigned"))
        }
        EventKind::PullRequestOpened => {
            let Some(pull_request) = ctx.payload.pull_request.as_ref() else {
                return Ok(ResultReport::skipped(
                    "event payload carries no pull request",
                ));
            };
            fold_rejection(check_closing_references(ctx, pull_request).await)
        }
    }
}

async fn run_slash_command(ctx: &RuntimeContext) -> Result<ResultReport, StartStopError> {
    let Some(issue) = ctx.payload.issue.as_ref() else {
        return Ok(ResultReport::skipped("event payload carries no issue"));
    };
    let Some(comment) = ctx.payload.comment.as_ref() else {
        return Ok(ResultReport::skipped("event payload carries no comment"));
    };
    let Some(command) = comment.body.as_deref().and_then(parse_slash_command) else {
        return Ok(ResultReport::skipped("comment is not a slash command"));
    };

    let sender = match ctx.payload.sender.as_ref() {
        Some(sender) => sender,
        None => &comment.user,
    };

    if ctx.settings.is_command_disabled(command.name()) {
        let reason = format!(
            "The '/{}' command is disabled for this repository.",
            command.name()
        );
        ctx.github
            .create_issue_comment(issue.number, &render_error_notice(&reason))
            .await
            .map_err(StartStopError::Api)?;
        return Ok(ResultReport::failed(reason));
    }

    let outcome = match &command {
        SlashCommand::Start { teammates } => start(ctx, issue, sender, teammates).await,
        SlashCommand::Stop => stop(ctx, issue, sender).await,
        SlashCommand::Unknown { command } => {
            tracing::info!(command = %command, "ignoring unrecognized slash command");
            return Ok(ResultReport::skipped("unrecognized slash command"));
        }
    };
    log_command_outcome(&command, sender, &outcome);
    match outcome {
        Ok(content) => Ok(ResultReport::ok().with_content(content)),
        Err(StartStopError::Rejected { message }) => Ok(ResultReport::failed(message)),
        Err(error) => Err(error),
    }
}

fn fold_rejection(
    outcome: Result<ResultReport, StartStopError>,
) -> Result<ResultReport, StartStopError> {
    match outcome {
        Err(StartStopError::Rejected { message }) => Ok(ResultReport::failed(message)),
        other => other,
    }
}

fn log_command_outcome(
    command: &SlashCommand,
    sender: &GithubUser,
    outcome: &Result<String, StartStopError>,
) {
    match outcome {
        Ok(content) => {
            tracing::info!(
                command = command.name(),
                sender = %sender.login,
                content = %content,
                "command completed"
            );
        }
        Err(StartStopError::Rejected { message }) => {
            tracing::info!(
                command = command.name(),
                sender = %sender.login,
                message = %message,
                "command rejected"
            );
        }
        Err(error) => {
            tracing::error!(
                command = command.name(),
                sender = %sender.login,
                error = %error,
                "command failed"
            );
        }
    }
}
