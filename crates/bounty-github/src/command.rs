use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `SlashCommand` values.
pub enum SlashCommand {
    Start { teammates: Vec<String> },
    Stop,
    Unknown { command: String },
}

impl SlashCommand {
    pub fn name(&self) -> &str {
        match self {
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::Unknown { command } => command.as_str(),
        }
    }
}

static MENTION_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn mention_pattern() -> Option<&'static Regex> {
    MENTION_PATTERN
        .get_or_init(|| Regex::new(r"@([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)").ok())
        .as_ref()
}

/// Parses a slash command from an issue-comment body. Returns `None` when
/// the comment does not open with a `/command` token, so ordinary discussion
/// comments are skipped instead of rejected.
pub fn parse_slash_command(body: &str) -> Option<SlashCommand> {
    let trimmed = body.trim();
    let first = trimmed.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    if command.is_empty() {
        return None;
    }
    match command.to_ascii_lowercase().as_str() {
        "start" => Some(SlashCommand::Start {
            teammates: parse_teammates(trimmed),
        }),
        "stop" => Some(SlashCommand::Stop),
        other => Some(SlashCommand::Unknown {
            command: other.to_string(),
        }),
    }
}

/// Collects `@mention`ed logins from a `/start` comment body, deduplicated
/// case-insensitively while preserving first-mention order.
pub fn parse_teammates(body: &str) -> Vec<String> {
    let Some(pattern) = mention_pattern() else {
        return Vec::new();
    };
    let mut teammates: Vec<String> = Vec::new();
    for captures in pattern.captures_iter(body) {
        let Some(login) = captures.get(1) else {
            continue;
        };
        let login = login.as_str();
        if !teammates
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(login))
        {
            teammates.push(login.to_string());
        }
    }
    teammates
}
