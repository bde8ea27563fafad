//! Shared helpers for the bounty assignment bot.
//! This crate provides webhook payload types, slash-command and label
//! parsing, timeline analysis, transport retry helpers, and issue-comment
//! rendering consumed by the runtime crates.

pub mod command;
pub mod duration_labels;
pub mod issue_links;
pub mod payloads;
pub mod render;
pub mod timeline;
pub mod transport;
