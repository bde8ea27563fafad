use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

const MAX_RETRY_DELAY_MS: u64 = 30_000;
const MAX_RETRY_AFTER_SECS: u64 = 300;

pub fn is_retryable_github_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Reads a seconds-valued `Retry-After` header, capped so a hostile value
/// cannot stall the worker.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = value.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds.min(MAX_RETRY_AFTER_SECS)))
}

/// Exponential backoff from the configured base, unless the server asked
/// for a specific delay.
pub fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after: Option<Duration>) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after;
    }
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(8);
    let scaled = base_delay_ms
        .saturating_mul(1_u64 << exponent)
        .min(MAX_RETRY_DELAY_MS);
    Duration::from_millis(scaled.max(1))
}

pub fn truncate_for_error(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max_chars).collect();
    format!("{head}...")
}
