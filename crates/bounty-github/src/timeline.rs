use chrono::DateTime;

use crate::payloads::GithubTimelineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `AssignmentAction` values.
pub enum AssignmentAction {
    Assigned,
    Unassigned,
}

#[derive(Debug, Clone)]
/// Read-only projection of an `assigned`/`unassigned` timeline entry,
/// ordered ascending by timestamp. Never persisted.
pub struct AssignmentEvent {
    pub action: AssignmentAction,
    pub actor: Option<String>,
    pub actor_id: Option<u64>,
    pub assignee: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
/// A pull request discovered through a cross-reference timeline event.
/// Only `state == open` entries are actionable.
pub struct LinkedPullRequest {
    pub organization: String,
    pub repository: String,
    pub number: u64,
    pub href: String,
    pub author: String,
    pub body: Option<String>,
    pub state: String,
}

impl LinkedPullRequest {
    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }
}

#[derive(Debug, Clone)]
/// Identifies the automation so its own unassignments can be told apart
/// from human ones.
pub struct BotIdentity {
    pub app_id: Option<u64>,
    pub bot_logins: Vec<String>,
}

impl BotIdentity {
    fn matches(&self, actor: Option<&str>, actor_id: Option<u64>) -> bool {
        if let (Some(app_id), Some(actor_id)) = (self.app_id, actor_id) {
            if app_id == actor_id {
                return true;
            }
        }
        let Some(actor) = actor else {
            return false;
        };
        self.bot_logins
            .iter()
            .any(|login| login.eq_ignore_ascii_case(actor))
    }
}

fn event_timestamp(created_at: Option<&str>) -> i64 {
    created_at
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.timestamp())
        .unwrap_or(0)
}

/// Projects raw timeline entries down to assignment events, sorted
/// ascending by timestamp (stable for ties).
pub fn collect_assignment_events(events: &[GithubTimelineEvent]) -> Vec<AssignmentEvent> {
    let mut collected: Vec<AssignmentEvent> = events
        .iter()
        .filter_map(|event| {
            let action = match event.event.as_str() {
                "assigned" => AssignmentAction::Assigned,
                "unassigned" => AssignmentAction::Unassigned,
                _ => return None,
            };
            Some(AssignmentEvent {
                action,
                actor: event.actor.as_ref().map(|actor| actor.login.clone()),
                actor_id: event.actor.as_ref().map(|actor| actor.id),
                assignee: event.assignee.as_ref().map(|user| user.login.clone()),
                created_at: event.created_at.clone(),
            })
        })
        .collect();
    collected.sort_by_key(|event| event_timestamp(event.created_at.as_deref()));
    collected
}

/// Decides whether a candidate is barred from reassignment.
///
/// Unassignments of the candidate are split into admin-initiated (actor is
/// neither the bot nor the candidate), bot-initiated, and self-initiated
/// through the platform UI. Admin removals always disqualify. Bot and
/// self-UI removals disqualify only once the candidate's own `/stop`
/// comment count no longer accounts for them, so a voluntary stop does not
/// poison later starts. Disqualification is terminal for the (issue, user)
/// pair regardless of later assignment cycles.
pub fn has_disqualifying_unassignment(
    events: &[AssignmentEvent],
    candidate: &str,
    bot: &BotIdentity,
    stop_comment_count: usize,
) -> bool {
    let candidate_events: Vec<&AssignmentEvent> = events
        .iter()
        .filter(|event| {
            event
                .assignee
                .as_deref()
                .map(|assignee| assignee.eq_ignore_ascii_case(candidate))
                .unwrap_or(false)
        })
        .collect();
    if candidate_events.is_empty() {
        return false;
    }

    let mut bot_or_self = 0_usize;
    let mut admin = 0_usize;
    for event in candidate_events {
        if event.action != AssignmentAction::Unassigned {
            continue;
        }
        let actor = event.actor.as_deref();
        if bot.matches(actor, event.actor_id) {
            bot_or_self = bot_or_self.saturating_add(1);
        } else if actor
            .map(|login| login.eq_ignore_ascii_case(candidate))
            .unwrap_or(false)
        {
            bot_or_self = bot_or_self.saturating_add(1);
        } else {
            // Includes ghost actors with no login; treated as admin removals
            // so the bar stays in place.
            admin = admin.saturating_add(1);
        }
    }

    admin > 0 || bot_or_self.saturating_sub(stop_comment_count) > 0
}

/// Maps cross-reference timeline entries whose source is a pull request to
/// `LinkedPullRequest` values. Entries missing the repository or author are
/// dropped rather than guessed at.
pub fn collect_linked_pull_requests(events: &[GithubTimelineEvent]) -> Vec<LinkedPullRequest> {
    events
        .iter()
        .filter(|event| event.event == "cross-referenced")
        .filter_map(|event| {
            let issue = event.source.as_ref()?.issue.as_ref()?;
            issue.pull_request.as_ref()?;
            let repository = issue.repository.as_ref()?;
            let author = issue.user.as_ref()?;
            Some(LinkedPullRequest {
                organization: repository.owner.login.clone(),
                repository: repository.name.clone(),
                number: issue.number,
                href: issue.html_url.clone(),
                author: author.login.clone(),
                body: issue.body.clone(),
                state: issue.state.clone(),
            })
        })
        .collect()
}
