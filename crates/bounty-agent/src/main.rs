mod bootstrap_helpers;
mod cli_args;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::json;

use bounty_github::render::render_run_error_comment;
use bounty_runtime::context::RuntimeContext;
use bounty_runtime::dispatch::{dispatch_event, ResultReport};
use bounty_runtime::error::StartStopError;
use bounty_runtime::kernel::{build_runtime_context, report_to_kernel, KernelEvent};

use crate::bootstrap_helpers::{init_tracing, read_kernel_event, runtime_options};
use crate::cli_args::Cli;

/// Best-effort comment on the triggering issue when a run dies on an API
/// error. Without it the user sees nothing but a silent timeout.
async fn surface_fatal_error(ctx: &RuntimeContext, event: &KernelEvent, error: &StartStopError) {
    let issue_number = ctx
        .payload
        .issue
        .as_ref()
        .map(|issue| issue.number)
        .or_else(|| {
            ctx.payload
                .pull_request
                .as_ref()
                .map(|pull_request| pull_request.number)
        });
    let Some(issue_number) = issue_number else {
        tracing::warn!("run failed outside an issue context, nothing to comment on");
        return;
    };

    let details = match error {
        StartStopError::Api(inner) => format!("{inner:#}"),
        other => other.to_string(),
    };
    let metadata = json!({
        "event": event.event_name,
        "state_id": event.state_id,
        "error": details,
    });
    let comment = render_run_error_comment(&error.to_string(), &metadata);
    if let Err(post_error) = ctx
        .github
        .create_issue_comment(issue_number, &comment)
        .await
    {
        tracing::warn!(%post_error, "failed to post the run error comment");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let raw = read_kernel_event(cli.event_file.as_deref())?;
    let event = KernelEvent::decode(&raw)?;
    let options = runtime_options(&cli, &event)?;
    let ctx = build_runtime_context(&options, &event)?;

    tracing::info!(
        event = %event.event_name,
        repository = %ctx.repo.as_slug(),
        state_id = %event.state_id,
        "handling kernel event"
    );

    let (report, fatal) = match dispatch_event(&ctx, &event.event_name).await {
        Ok(report) => (report, None),
        Err(error) => {
            surface_fatal_error(&ctx, &event, &error).await;
            (ResultReport::failed(error.to_string()), Some(error))
        }
    };

    report_to_kernel(&ctx.github, &event.state_id, &report)
        .await
        .context("failed to report the run result to the kernel")?;

    println!(
        "{}",
        serde_json::to_string(&report).context("failed to encode the run report")?
    );

    match fatal {
        Some(StartStopError::Api(error)) => Err(error),
        Some(StartStopError::Rejected { message }) => Err(anyhow!(message)),
        None => Ok(()),
    }
}
