use serde_json::Value;

/// Marker opening every hidden metadata block appended to bot comments.
pub const METADATA_MARKER_PREFIX: &str = "<!-- bounty - ";

pub fn render_diff_block(prefix: char, message: &str) -> String {
    format!("```diff\n{prefix} {message}\n```")
}

pub fn render_error_notice(message: &str) -> String {
    render_diff_block('!', message)
}

pub fn render_info_notice(message: &str) -> String {
    render_diff_block('+', message)
}

pub fn render_header_notice(message: &str) -> String {
    render_diff_block('#', message)
}

#[derive(Debug, Clone)]
/// Rows of the assignment summary table posted after a successful start.
pub struct AssignmentTable<'a> {
    pub deadline: Option<&'a str>,
    pub registered_wallet: &'a str,
    pub is_task_stale: bool,
    pub days_elapsed: i64,
}

pub fn render_assignment_table(table: &AssignmentTable<'_>) -> String {
    let mut rows = String::new();
    if table.is_task_stale {
        rows.push_str(&format!(
            "<tr><td>Warning!</td> <td>This task was created over {} days ago. Please confirm that this issue specification is accurate before starting.</td></tr>\n",
            table.days_elapsed
        ));
    }
    if let Some(deadline) = table.deadline {
        rows.push_str(&format!("<tr><td>Deadline</td><td>{deadline}</td></tr>\n"));
    }
    rows.push_str(&format!(
        "<tr><td>Registered Wallet</td><td>{}</td></tr>",
        table.registered_wallet
    ));
    format!("<code>\n<table>\n{rows}\n</table>\n</code>")
}

pub fn render_assignment_tips() -> String {
    [
        "<h6>Tips:</h6>",
        "<ul>",
        "<li>Use <code>/wallet 0x0000...0000</code> if you want to update your registered payment wallet address.</li>",
        "<li>Be sure to open a draft pull request as soon as possible to communicate updates on your progress.</li>",
        "<li>Be sure to provide timely updates to us when requested, or you will be automatically unassigned from the task.</li>",
        "</ul>",
    ]
    .join("\n")
}

/// Neutralizes comment delimiters so embedded text cannot terminate the
/// hidden block early or open a new one.
pub fn sanitize_for_comment_embed(text: &str) -> String {
    text.replace("<!--", "&lt;!--").replace("-->", "--&gt;")
}

/// Renders the hidden audit block carried at the end of bot comments:
/// the marker line with a kind and revision, pretty-printed JSON, and the
/// closing delimiter.
pub fn render_hidden_metadata(kind: &str, revision: Option<&str>, metadata: &Value) -> String {
    let pretty = serde_json::to_string_pretty(metadata).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}{} - {}\n{}\n-->",
        METADATA_MARKER_PREFIX,
        kind,
        revision.unwrap_or("unknown"),
        sanitize_for_comment_embed(&pretty)
    )
}

/// User-facing rendering of a fatal handler failure: a templated notice
/// plus the sanitized details hidden in the metadata block.
pub fn render_run_error_comment(message: &str, metadata: &Value) -> String {
    format!(
        "{}\n{}",
        render_error_notice(message),
        render_hidden_metadata("Error", None, metadata)
    )
}

pub fn render_deadline_mentions(logins: &[String], deadline: &str) -> String {
    let mentions = logins
        .iter()
        .map(|login| format!("@{login}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{mentions} the deadline is at {deadline}")
}

pub fn render_closed_pull_requests_notice(hrefs: &[String]) -> String {
    render_header_notice(&format!(
        "These linked pull requests are closed: {}",
        hrefs.join(" ")
    ))
}

/// Warning posted on a pull request whose closing references point at tasks
/// the author never claimed.
pub fn render_start_reminder(author: &str, task_urls: &[String]) -> String {
    render_error_notice(&format!(
        "@{author} you are not assigned to {}. Please run /start on the task before opening a pull request.",
        task_urls.join(", ")
    ))
}
