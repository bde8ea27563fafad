#![no_main]

use bounty_github::duration_labels::{calculate_durations, parse_human_duration, parse_price_label};
use bounty_github::payloads::GithubLabel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let labels: Vec<GithubLabel> = text
        .lines()
        .map(|line| GithubLabel {
            name: line.to_string(),
        })
        .collect();
    let durations = calculate_durations(&labels);
    assert!(durations.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(durations.len() <= labels.len());

    let _ = parse_human_duration(&text);
    if let Some(price) = parse_price_label(&text) {
        assert!(price.amount >= 0.0);
        assert!(!price.currency.is_empty());
    }
});
