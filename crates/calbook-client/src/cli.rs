//! CLI argument definitions using clap.

use std::path::PathBuf;

use calbook_core::TracingOutputFormat;
use clap::{Args, Parser, Subcommand};

/// calbook - check, book and release time on a Google calendar.
#[derive(Debug, Parser)]
#[command(name = "calbook", version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, short = 'c', env = "CALBOOK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Write logs as JSON lines.
    #[arg(long, group = "log_format")]
    pub log_json: bool,

    /// Write logs in the multi-line pretty format.
    #[arg(long, group = "log_format")]
    pub log_pretty: bool,

    /// Calendar to operate on (overrides `[calendar] id`).
    #[arg(long, global = true)]
    pub calendar: Option<String>,

    /// IANA timezone for local times (overrides `[calendar] timezone`).
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Subcommand to run. Without one, the upcoming events are listed.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Log format selected by `--log-json` / `--log-pretty`.
    pub fn log_format(&self) -> TracingOutputFormat {
        if self.log_json {
            TracingOutputFormat::Json
        } else if self.log_pretty {
            TracingOutputFormat::Pretty
        } else {
            TracingOutputFormat::Compact
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate with a calendar provider.
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Check whether a range is free (exit code 3 when busy).
    Free {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// List the events in a range.
    Events {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Book an event over a range.
    Book {
        /// Event title.
        summary: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Book even if the range already holds events.
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Delete the events lying entirely inside a range.
    Release {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// List the next upcoming events.
    Upcoming {
        /// Maximum number of events.
        #[arg(long, short = 'n', default_value_t = DEFAULT_UPCOMING_COUNT)]
        count: usize,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Number of events listed by `upcoming` and by a bare `calbook`.
pub const DEFAULT_UPCOMING_COUNT: usize = 10;

/// Start and end of a range.
///
/// Accepts RFC 3339, a local date-time (`2015-05-22T10:00`,
/// `2015-05-22 10:00:30`) or a date (`2015-05-22`, local midnight).
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// Range start.
    pub start: String,

    /// Range end.
    pub end: String,
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar.
    Google {
        /// OAuth client ID.
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret.
        #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,

        /// Path to a Google Cloud Console credentials JSON file.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Discard the stored token and authorize again.
        #[arg(long, short = 'f')]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Dump,
    /// Validate the configuration.
    Validate,
    /// Show the configuration file path.
    Path,
}
