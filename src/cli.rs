use clap::{Parser, Subcommand};

/// phabwatch — watch Phabricator for revisions that need you
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "phabwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Run a single refresh then exit
    #[arg(long)]
    pub once: bool,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Phabricator base URL (e.g. https://phabricator.example.com)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// User PHID to classify revisions for (default: the token's owner)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Refresh interval in seconds
    #[arg(long = "poll-seconds", alias = "refresh-interval")]
    pub poll_seconds: Option<u64>,

    /// Don't raise notifications for newly actionable revisions
    #[arg(long)]
    pub no_notify: bool,

    /// Don't ring the bell with notifications
    #[arg(long)]
    pub no_sound: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Fetch active revisions once and print them by category
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the user the API token belongs to
    Whoami,
}
