use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bounty_runtime::kernel::{KernelEvent, RuntimeOptions};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli_args::Cli;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Reads the raw kernel event, either from the given file or from stdin.
pub(crate) fn read_kernel_event(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read kernel event from {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read kernel event from stdin")?;
            Ok(raw)
        }
    }
}

/// Assembles runtime options from CLI flags and the decoded kernel event.
///
/// The token embedded in the event wins over the CLI/environment one, so the
/// kernel can hand out short-lived installation tokens per run.
pub(crate) fn runtime_options(cli: &Cli, event: &KernelEvent) -> Result<RuntimeOptions> {
    let event_token = event.auth_token.trim();
    let github_token = if !event_token.is_empty() {
        event_token.to_string()
    } else if let Some(token) = cli.github_token.as_deref().map(str::trim) {
        if token.is_empty() {
            bail!("no GitHub token available, pass it in the kernel event or set GITHUB_TOKEN");
        }
        token.to_string()
    } else {
        bail!("no GitHub token available, pass it in the kernel event or set GITHUB_TOKEN");
    };

    Ok(RuntimeOptions {
        github_api_base: cli.github_api_base.clone(),
        github_token,
        backend_url: cli.backend_url.clone(),
        backend_key: cli.backend_key.clone(),
        app_id: cli.app_id,
        bot_logins: cli.bot_logins.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
}
