//! Runtime for the bounty assignment bot.
//! This crate wires plugin settings, the GitHub API client, and the user
//! backend into the event handlers behind `/start`, `/stop`, self-assignment
//! notices, and pull-request open checks.

pub mod assignment_history;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod github_client;
pub mod kernel;
pub mod linked_prs;
pub mod pull_request_opened;
pub mod self_assign;
pub mod settings;
pub mod start;
pub mod stop;
pub mod task_limits;
pub mod user_backend;
pub mod workload;

#[cfg(test)]
mod tests;
