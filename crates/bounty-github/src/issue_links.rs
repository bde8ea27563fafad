use std::sync::OnceLock;

use regex::Regex;

static PARENT_CHECKLIST_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static HTML_COMMENT_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static ISSUE_REFERENCE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn parent_checklist_pattern() -> Option<&'static Regex> {
    PARENT_CHECKLIST_PATTERN
        .get_or_init(|| Regex::new(r"-\s+\[( |x)\]\s+#\d+").ok())
        .as_ref()
}

fn html_comment_pattern() -> Option<&'static Regex> {
    HTML_COMMENT_PATTERN
        .get_or_init(|| Regex::new(r"<!-*[\s\S]*?-*>").ok())
        .as_ref()
}

fn issue_reference_pattern() -> Option<&'static Regex> {
    ISSUE_REFERENCE_PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)(?:Resolves|Fixes|Closes|Depends on|Related to) #(\d+)|https://(?:www\.)?github\.com/([^/\s]+)/([^/\s]+)/(?:issue|issues)/(\d+)|#(\d+)",
            )
            .ok()
        })
        .as_ref()
}

/// A parent issue coordinates child issues through a task checklist
/// (`- [ ] #N`). Such issues are never directly workable.
pub fn is_parent_issue(body: &str) -> bool {
    parent_checklist_pattern()
        .map(|pattern| pattern.is_match(body))
        .unwrap_or(false)
}

/// Removes HTML comments so template boilerplate cannot produce false
/// issue-reference matches.
pub fn strip_html_comments(body: &str) -> String {
    match html_comment_pattern() {
        Some(pattern) => pattern.replace_all(body, "").into_owned(),
        None => body.to_string(),
    }
}

/// Whether a pull-request body references the given issue number through a
/// closing keyword, a bare `#N`, or a full issue URL. The last reference in
/// the body is the one that counts.
pub fn issue_linked_via_pr_body(pr_body: Option<&str>, issue_number: u64) -> bool {
    let Some(body) = pr_body else {
        return false;
    };
    let Some(pattern) = issue_reference_pattern() else {
        return false;
    };
    let cleaned = strip_html_comments(body);
    let mut last_reference: Option<u64> = None;
    for captures in pattern.captures_iter(&cleaned) {
        let number = captures
            .get(1)
            .or_else(|| captures.get(4))
            .or_else(|| captures.get(5))
            .and_then(|value| value.as_str().parse::<u64>().ok());
        if let Some(number) = number {
            last_reference = Some(number);
        }
    }
    last_reference == Some(issue_number)
}
