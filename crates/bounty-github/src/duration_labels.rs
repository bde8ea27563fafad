use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::payloads::GithubLabel;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// UTC layout matching the assignment-comment deadline rendering, e.g.
/// `Tue, Aug 25, 3:04 PM UTC`.
const DEADLINE_FORMAT: &str = "%a, %b %-d, %-I:%M %p UTC";

static TIME_LABEL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PRICE_LABEL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static HUMAN_DURATION_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn time_label_pattern() -> Option<&'static Regex> {
    TIME_LABEL_PATTERN
        .get_or_init(|| Regex::new(r"<\s*(\d+)\s*([A-Za-z]+)").ok())
        .as_ref()
}

fn price_label_pattern() -> Option<&'static Regex> {
    PRICE_LABEL_PATTERN
        .get_or_init(|| Regex::new(r"Price:\s*([\d.]+)\s+(\w+)").ok())
        .as_ref()
}

fn human_duration_pattern() -> Option<&'static Regex> {
    HUMAN_DURATION_PATTERN
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*([A-Za-z]+)\s*$").ok())
        .as_ref()
}

pub fn duration_unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "d" | "day" | "days" => Some(SECONDS_PER_DAY),
        "w" | "wk" | "wks" | "week" | "weeks" => Some(7 * SECONDS_PER_DAY),
        "mo" | "mos" | "month" | "months" => Some(30 * SECONDS_PER_DAY),
        "y" | "yr" | "yrs" | "year" | "years" => Some(31_557_600),
        _ => None,
    }
}

/// Duration encoded by a single `<N unit>` time label, in seconds.
pub fn time_label_seconds(name: &str) -> Option<u64> {
    let pattern = time_label_pattern()?;
    let captures = pattern.captures(name)?;
    let amount = captures.get(1)?.as_str().parse::<u64>().ok()?;
    let unit_seconds = duration_unit_seconds(captures.get(2)?.as_str())?;
    Some(amount.saturating_mul(unit_seconds))
}

/// Extracts the `<N unit>` durations encoded in time labels, in seconds,
/// sorted ascending. Labels without a recognizable duration contribute
/// nothing; an empty result is a valid outcome, never an error.
pub fn calculate_durations(labels: &[GithubLabel]) -> Vec<u64> {
    let mut durations: Vec<u64> = labels
        .iter()
        .filter_map(|label| time_label_seconds(&label.name))
        .collect();
    durations.sort_unstable();
    durations
}

/// Parses a configuration duration such as `1 day` or `3 weeks` into
/// seconds. Bare numbers are handled by the settings layer before reaching
/// this helper.
pub fn parse_human_duration(text: &str) -> Option<u64> {
    let pattern = human_duration_pattern()?;
    let captures = pattern.captures(text)?;
    let amount = captures.get(1)?.as_str().parse::<u64>().ok()?;
    let unit_seconds = duration_unit_seconds(captures.get(2)?.as_str())?;
    Some(amount.saturating_mul(unit_seconds))
}

#[derive(Debug, Clone, PartialEq)]
/// Public struct `PriceLabel` used across bounty components.
pub struct PriceLabel {
    pub amount: f64,
    pub currency: String,
}

pub fn parse_price_label(name: &str) -> Option<PriceLabel> {
    let pattern = price_label_pattern()?;
    let captures = pattern.captures(name)?;
    let amount = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let currency = captures.get(2)?.as_str().to_string();
    Some(PriceLabel { amount, currency })
}

#[derive(Debug, Clone, PartialEq)]
/// Payment-related label facts for one issue, resolved against the
/// configured time and priority label vocabularies.
pub struct TaskPaymentSnapshot {
    pub eligible_for_payment: bool,
    pub time_label: Option<String>,
    pub priority_label: Option<String>,
    pub price_label: Option<String>,
}

fn label_leading_number(name: &str) -> Option<u64> {
    let digits: String = name
        .chars()
        .skip_while(|value| !value.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// An issue is payment-eligible when it carries at least one recognized time
/// label and one recognized priority label. The returned labels are the
/// shortest time label and the lowest-numbered priority label present.
pub fn task_payment_snapshot(
    time_vocabulary: &[String],
    priority_vocabulary: &[String],
    labels: &[GithubLabel],
) -> TaskPaymentSnapshot {
    let names: Vec<&str> = labels.iter().map(|label| label.name.as_str()).collect();
    let time_labels: Vec<&str> = time_vocabulary
        .iter()
        .map(String::as_str)
        .filter(|candidate| names.contains(candidate))
        .collect();
    let priority_labels: Vec<&str> = priority_vocabulary
        .iter()
        .map(String::as_str)
        .filter(|candidate| names.contains(candidate))
        .collect();
    let time_label = time_labels
        .iter()
        .copied()
        .min_by_key(|name| time_label_seconds(name).unwrap_or(u64::MAX))
        .map(str::to_string);
    let priority_label = priority_labels
        .iter()
        .copied()
        .min_by_key(|name| label_leading_number(name).unwrap_or(u64::MAX))
        .map(str::to_string);
    TaskPaymentSnapshot {
        eligible_for_payment: !time_labels.is_empty() && !priority_labels.is_empty(),
        time_label,
        priority_label,
        price_label: names
            .iter()
            .find(|name| name.contains("Price"))
            .map(|name| name.to_string()),
    }
}

pub fn format_deadline(start: DateTime<Utc>, duration_seconds: u64) -> String {
    let offset = i64::try_from(duration_seconds).unwrap_or(i64::MAX);
    let deadline = start
        .checked_add_signed(Duration::seconds(offset))
        .unwrap_or(start);
    deadline.format(DEADLINE_FORMAT).to_string()
}

/// Whole days elapsed since the issue was created; malformed timestamps
/// count as zero days.
pub fn days_elapsed_since(created_at: &str, now: DateTime<Utc>) -> i64 {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return 0;
    };
    now.signed_duration_since(created.with_timezone(&Utc))
        .num_days()
        .max(0)
}

/// A zero threshold disables staleness. Otherwise the comparison is in
/// whole days, matching the warning copy shown to users.
pub fn is_task_stale(threshold_seconds: u64, created_at: &str, now: DateTime<Utc>) -> bool {
    if threshold_seconds == 0 {
        return false;
    }
    let threshold_days = i64::try_from(threshold_seconds / SECONDS_PER_DAY).unwrap_or(i64::MAX);
    days_elapsed_since(created_at, now) >= threshold_days
}

#[cfg(test)]
mod tests {
    use super::{
        calculate_durations, days_elapsed_since, format_deadline, is_task_stale,
        parse_human_duration, parse_price_label, task_payment_snapshot, SECONDS_PER_DAY,
    };
    use crate::payloads::GithubLabel;
    use chrono::{TimeZone, Utc};

    fn labels(names: &[&str]) -> Vec<GithubLabel> {
        names
            .iter()
            .map(|name| GithubLabel {
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn unit_calculate_durations_returns_empty_for_unmatched_labels() {
        assert!(calculate_durations(&labels(&["Bug", "Price: 100 USD"])).is_empty());
        assert!(calculate_durations(&[]).is_empty());
    }

    #[test]
    fn unit_calculate_durations_sorts_shortest_first() {
        let durations = calculate_durations(&labels(&[
            "Time: <1 week",
            "Time: <2 days",
            "Time: <4 hours",
        ]));
        assert_eq!(durations, vec![4 * 3_600, 2 * SECONDS_PER_DAY, 604_800]);
    }

    #[test]
    fn unit_calculate_durations_skips_unknown_units() {
        let durations = calculate_durations(&labels(&["Time: <2 fortnights", "Time: <1 day"]));
        assert_eq!(durations, vec![SECONDS_PER_DAY]);
    }

    #[test]
    fn regression_calculate_durations_tolerates_spacing_and_case() {
        let durations = calculate_durations(&labels(&["Time: < 2 Days >"]));
        assert_eq!(durations, vec![2 * SECONDS_PER_DAY]);
    }

    #[test]
    fn unit_parse_human_duration_accepts_strings_and_rejects_garbage() {
        assert_eq!(parse_human_duration("1 day"), Some(SECONDS_PER_DAY));
        assert_eq!(parse_human_duration("1 month"), Some(30 * SECONDS_PER_DAY));
        assert_eq!(parse_human_duration("3.5 days"), None);
        assert_eq!(parse_human_duration("soon"), None);
    }

    #[test]
    fn unit_parse_price_label_reads_amount_and_currency() {
        let price = parse_price_label("Price: 100 USD").expect("price");
        assert_eq!(price.amount, 100.0);
        assert_eq!(price.currency, "USD");
        assert!(parse_price_label("Priority: 1").is_none());
    }

    #[test]
    fn functional_format_deadline_uses_short_utc_layout() {
        let start = Utc.with_ymd_and_hms(2026, 8, 25, 13, 4, 0).single().expect("time");
        let rendered = format_deadline(start, 2 * SECONDS_PER_DAY);
        assert_eq!(rendered, "Thu, Aug 27, 1:04 PM UTC");
    }

    #[test]
    fn unit_task_payment_snapshot_requires_both_vocabularies() {
        let time = vec!["Time: <1 Day".to_string(), "Time: <1 Week".to_string()];
        let priority = vec![
            "Priority: 1 (Normal)".to_string(),
            "Priority: 2 (High)".to_string(),
        ];
        let snapshot = task_payment_snapshot(
            &time,
            &priority,
            &labels(&[
                "Time: <1 Week",
                "Time: <1 Day",
                "Priority: 2 (High)",
                "Price: 100 USD",
            ]),
        );
        assert!(snapshot.eligible_for_payment);
        assert_eq!(snapshot.time_label.as_deref(), Some("Time: <1 Day"));
        assert_eq!(snapshot.priority_label.as_deref(), Some("Priority: 2 (High)"));
        assert_eq!(snapshot.price_label.as_deref(), Some("Price: 100 USD"));

        let bare = task_payment_snapshot(&time, &priority, &labels(&["Time: <1 Day"]));
        assert!(!bare.eligible_for_payment);
        assert_eq!(bare.time_label.as_deref(), Some("Time: <1 Day"));
        assert!(bare.priority_label.is_none());
        assert!(bare.price_label.is_none());
    }

    #[test]
    fn unit_is_task_stale_disabled_by_zero_threshold() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).single().expect("time");
        assert!(!is_task_stale(0, "2020-01-01T00:00:00Z", now));
        assert!(is_task_stale(30 * SECONDS_PER_DAY, "2020-01-01T00:00:00Z", now));
        assert!(!is_task_stale(
            30 * SECONDS_PER_DAY,
            "2026-08-20T00:00:00Z",
            now
        ));
    }

    #[test]
    fn unit_days_elapsed_since_floors_and_handles_bad_input() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).single().expect("time");
        assert_eq!(days_elapsed_since("2026-08-20T00:00:00Z", now), 5);
        assert_eq!(days_elapsed_since("not a date", now), 0);
    }
}
