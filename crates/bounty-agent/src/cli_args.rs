use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "bounty-agent",
    about = "Issue assignment bot handling /start and /stop commands",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "event-file",
        env = "BOUNTY_EVENT_FILE",
        help = "Path to the kernel event JSON; read from stdin when omitted"
    )]
    pub(crate) event_file: Option<PathBuf>,

    #[arg(
        long = "github-api-base",
        env = "GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "Base URL for the GitHub REST and GraphQL APIs"
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used when the kernel event carries none"
    )]
    pub(crate) github_token: Option<String>,

    #[arg(
        long = "backend-url",
        env = "BACKEND_URL",
        help = "Base URL of the user backend holding wallets and payout multipliers"
    )]
    pub(crate) backend_url: String,

    #[arg(
        long = "backend-key",
        env = "BACKEND_KEY",
        hide_env_values = true,
        help = "API key for the user backend"
    )]
    pub(crate) backend_key: String,

    #[arg(
        long = "app-id",
        env = "APP_ID",
        help = "GitHub App id of this bot, used to recognize its own unassignments in issue history"
    )]
    pub(crate) app_id: Option<u64>,

    #[arg(
        long = "bot-login",
        env = "BOT_LOGINS",
        value_delimiter = ',',
        help = "Login(s) treated as this automation when judging assignment history"
    )]
    pub(crate) bot_logins: Vec<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "BOUNTY_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        help = "Per-request timeout for GitHub and user backend calls, in milliseconds"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "BOUNTY_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        help = "Maximum attempts for retryable GitHub API failures"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "BOUNTY_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base delay between GitHub API retries, in milliseconds"
    )]
    pub(crate) retry_base_delay_ms: u64,
}
