#![no_main]

use bounty_github::issue_links::{is_parent_issue, issue_linked_via_pr_body, strip_html_comments};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);

    let stripped = strip_html_comments(&body);
    assert!(stripped.len() <= body.len());

    let _ = is_parent_issue(&body);
    for issue_number in [0u64, 1, 42, u64::MAX] {
        let _ = issue_linked_via_pr_body(Some(&body), issue_number);
    }
    assert!(!issue_linked_via_pr_body(None, 1));
});
