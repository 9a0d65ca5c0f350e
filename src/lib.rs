pub mod application;
pub mod domain;
pub mod infrastructure;

use anyhow::Context;
use application::commands::{
    AuthOutcome, CommandContext, SettingOverrides, authenticate_impl, config_set_impl,
    sync_board_impl,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "boardcal")]
#[command(version, about = "Sync a monday.com weekday board into a Google Calendar week")]
pub struct Cli {
    /// Path of the JSON config file. Defaults to the user config directory.
    #[arg(long, global = true, value_name = "PATH", env = "BOARDCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log per-day and per-event detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[arg(long, global = true, env = "MONDAY_API_KEY", hide_env_values = true)]
    pub monday_api_key: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_SECRET", hide_env_values = true)]
    pub google_secret: Option<String>,

    /// IANA time zone used for the week, e.g. America/New_York.
    #[arg(long, global = true, env = "BOARDCAL_TIMEZONE")]
    pub timezone: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile this week's board tasks with the board's calendar
    Sync {
        /// Numeric monday.com board id
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        board_id: u64,
    },
    /// Print the Google consent URL, or exchange the code it returned
    Auth {
        #[arg(long, value_name = "CODE")]
        code: Option<String>,
    },
    /// Edit the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Set one or more values, e.g. `config set timezone=Europe/Berlin`
    Set {
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
}

impl From<CredentialArgs> for SettingOverrides {
    fn from(args: CredentialArgs) -> Self {
        Self {
            monday_api_key: args.monday_api_key,
            google_client_id: args.google_client_id,
            google_secret: args.google_secret,
            timezone: args.timezone,
        }
    }
}

/// Logs go to stderr so command output stays clean on stdout.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "boardcal=debug" } else { "boardcal=info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => infrastructure::config::default_config_path()?,
    };

    match cli.command {
        Command::Config {
            action: ConfigAction::Set { assignments },
        } => {
            config_set_impl(&config_path, &assignments)
                .with_context(|| format!("failed to update {}", config_path.display()))?;
            println!("updated {}", config_path.display());
        }
        Command::Auth { code } => {
            let context = CommandContext::new(
                config_path,
                infrastructure::config::default_cache_dir()?,
                cli.credentials.into(),
            );
            match authenticate_impl(&context, code)
                .await
                .context("google authorization failed")?
            {
                AuthOutcome::AuthorizationUrl(url) => {
                    println!("open this url, approve access, then run `boardcal auth --code <CODE>`:");
                    println!("{url}");
                }
                AuthOutcome::Authenticated { expires_at } => {
                    println!("authenticated; access token valid until {}", expires_at.to_rfc3339());
                }
            }
        }
        Command::Sync { board_id } => {
            let context = CommandContext::new(
                config_path,
                infrastructure::config::default_cache_dir()?,
                cli.credentials.into(),
            );
            let summary = sync_board_impl(&context, board_id)
                .await
                .with_context(|| format!("failed to sync board {board_id}"))?;
            if summary.calendar_created {
                println!("created calendar '{}' ({})", summary.board_name, summary.calendar_id);
            }
            println!("done syncing tasks to google calendar: {}", summary.report);
        }
    }
    Ok(())
}
