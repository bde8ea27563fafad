use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use bounty_github::duration_labels::parse_human_duration;

pub const DEFAULT_EMPTY_WALLET_TEXT: &str =
    "Please set your wallet address to use `/wallet 0x0000...0000`";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// Plugin settings as decoded from the kernel payload. `normalize` resolves
/// durations and the task-limit map into the runtime view and rejects
/// contradictory values.
pub struct StartStopSettings {
    #[serde(default)]
    pub disabled_commands: Vec<String>,
    #[serde(default)]
    pub labels: LabelSettings,
    #[serde(default)]
    pub timers: TimerSettings,
    #[serde(default = "default_task_limit_config")]
    pub max_concurrent_tasks: TaskLimitConfig,
    #[serde(default = "default_start_requires_wallet")]
    pub start_requires_wallet: bool,
    #[serde(default = "default_empty_wallet_text")]
    pub empty_wallet_text: String,
}

impl Default for StartStopSettings {
    fn default() -> Self {
        Self {
            disabled_commands: Vec::new(),
            labels: LabelSettings::default(),
            timers: TimerSettings::default(),
            max_concurrent_tasks: default_task_limit_config(),
            start_requires_wallet: true,
            empty_wallet_text: DEFAULT_EMPTY_WALLET_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
/// Recognized label vocabularies for payment-eligibility checks.
pub struct LabelSettings {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub priority: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// Public struct `TimerSettings` used across bounty components.
pub struct TimerSettings {
    #[serde(default)]
    pub review_delay_tolerance: DurationSetting,
    #[serde(default)]
    pub task_stale_timeout_duration: DurationSetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
/// Duration settings accept either a number of seconds or a human duration
/// string such as `"1 day"`. Zero disables the associated check.
pub enum DurationSetting {
    Seconds(u64),
    Text(String),
}

impl Default for DurationSetting {
    fn default() -> Self {
        Self::Seconds(0)
    }
}

impl DurationSetting {
    pub fn resolve_seconds(&self) -> Result<u64> {
        match self {
            Self::Seconds(value) => Ok(*value),
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(0);
                }
                if let Ok(value) = trimmed.parse::<u64>() {
                    return Ok(value);
                }
                parse_human_duration(trimmed)
                    .with_context(|| format!("invalid config time value '{raw}'"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
/// `maxConcurrentTasks` accepts a flat number, a list of role/limit records,
/// or a role-to-limit map. All three forms normalize to one map with
/// lowercase role keys.
pub enum TaskLimitConfig {
    Flat(u32),
    Entries(Vec<RoleLimitEntry>),
    ByRole(BTreeMap<String, u32>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
/// Public struct `RoleLimitEntry` used across bounty components.
pub struct RoleLimitEntry {
    pub role: String,
    pub limit: u32,
}

fn default_task_limit_config() -> TaskLimitConfig {
    TaskLimitConfig::ByRole(BTreeMap::from([
        ("member".to_string(), 10),
        ("contributor".to_string(), 2),
    ]))
}

fn default_start_requires_wallet() -> bool {
    true
}

fn default_empty_wallet_text() -> String {
    DEFAULT_EMPTY_WALLET_TEXT.to_string()
}

impl TaskLimitConfig {
    pub fn normalize(&self) -> Result<TaskLimits> {
        let mut by_role = BTreeMap::new();
        match self {
            Self::Flat(limit) => {
                by_role.insert("member".to_string(), *limit);
                by_role.insert("contributor".to_string(), *limit);
            }
            Self::Entries(entries) => {
                for entry in entries {
                    let role = entry.role.trim().to_ascii_lowercase();
                    if by_role.insert(role, entry.limit).is_some() {
                        bail!("Duplicate roles found in maxConcurrentTasks.");
                    }
                }
            }
            Self::ByRole(limits) => {
                for (role, limit) in limits {
                    let role = role.trim().to_ascii_lowercase();
                    if by_role.insert(role, *limit).is_some() {
                        bail!("Duplicate roles found in maxConcurrentTasks.");
                    }
                }
            }
        }
        Ok(TaskLimits { by_role })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Normalized role-to-limit map. Roles are lowercase; an absent role falls
/// back to the smallest configured limit, except `admin` which is treated as
/// unlimited when not configured.
pub struct TaskLimits {
    by_role: BTreeMap<String, u32>,
}

impl TaskLimits {
    pub fn limit_for(&self, role: &str) -> Option<u32> {
        self.by_role.get(role).copied()
    }

    /// Entry with the smallest limit. Ties resolve to the alphabetically
    /// first role.
    pub fn smallest(&self) -> Option<(String, u32)> {
        self.by_role
            .iter()
            .min_by_key(|(_, limit)| **limit)
            .map(|(role, limit)| (role.clone(), *limit))
    }
}

#[derive(Debug, Clone)]
/// Runtime view of the settings after duration parsing, limit-map
/// normalization, and command-name lowercasing.
pub struct NormalizedSettings {
    pub disabled_commands: Vec<String>,
    pub time_labels: Vec<String>,
    pub priority_labels: Vec<String>,
    pub review_delay_tolerance_seconds: u64,
    pub task_stale_timeout_seconds: u64,
    pub task_limits: TaskLimits,
    pub start_requires_wallet: bool,
    pub empty_wallet_text: String,
}

impl StartStopSettings {
    pub fn normalize(&self) -> Result<NormalizedSettings> {
        let review_delay_tolerance_seconds = self
            .timers
            .review_delay_tolerance
            .resolve_seconds()
            .context("invalid timers.reviewDelayTolerance")?;
        let task_stale_timeout_seconds = self
            .timers
            .task_stale_timeout_duration
            .resolve_seconds()
            .context("invalid timers.taskStaleTimeoutDuration")?;
        let task_limits = self
            .max_concurrent_tasks
            .normalize()
            .context("invalid maxConcurrentTasks")?;
        Ok(NormalizedSettings {
            disabled_commands: self
                .disabled_commands
                .iter()
                .map(|name| name.trim().trim_start_matches('/').to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            time_labels: self.labels.time.clone(),
            priority_labels: self.labels.priority.clone(),
            review_delay_tolerance_seconds,
            task_stale_timeout_seconds,
            task_limits,
            start_requires_wallet: self.start_requires_wallet,
            empty_wallet_text: self.empty_wallet_text.clone(),
        })
    }
}

impl NormalizedSettings {
    pub fn is_command_disabled(&self, name: &str) -> bool {
        self.disabled_commands
            .iter()
            .any(|disabled| disabled == name)
    }
}
