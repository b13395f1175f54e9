mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use logging::init_logging;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, default_value = "/etc/loginguard.yaml", env = "LOGINGUARD_CONFIG")]
    config: PathBuf,

    /// Increase log verbosity
    #[arg(long, short, action = ArgAction::Count)]
    debug: u8,
}

#[derive(clap::Subcommand)]
pub(crate) enum Commands {
    /// Validate config file and database connection
    Check,
    /// Create a password hash
    Hash,
    /// Create a user
    CreateUser {
        username: String,
        /// Read from the terminal or stdin when omitted
        #[arg(long, short, env = "LOGINGUARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Enable or disable a user
    SetUserStatus {
        username: String,
        #[arg(long, conflicts_with = "active", required_unless_present = "active")]
        disabled: bool,
        #[arg(long)]
        active: bool,
    },
    /// Log in through the brute-force gate
    Login {
        #[arg(long)]
        ip: String,
        username: String,
    },
    /// Feed a single attempt into the detection engine and print the verdict
    Evaluate {
        #[arg(long)]
        ip: String,
        username: String,
        #[arg(long)]
        success: bool,
    },
    /// Manually block an IPv4 address
    Block {
        ip: String,
        #[arg(long)]
        reason: Option<String>,
        /// Minutes
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Remove a block
    Unblock { ip: String },
    /// Make a block permanent, or revoke permanence
    SetPermanent {
        ip: String,
        #[arg(long)]
        revoke: bool,
    },
    /// Show the block state of an IP
    Status { ip: String },
    /// List block records
    Blocked {
        /// Only blocks in effect right now
        #[arg(long)]
        active: bool,
    },
    /// List user accounts
    Users,
    /// Show attempt history
    Attempts {
        #[arg(long, conflicts_with = "recent")]
        limit: Option<u64>,
        /// Everything within the configured recent window
        #[arg(long)]
        recent: bool,
    },
    /// Show security counters
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug)?;

    match &cli.command {
        Commands::Check => commands::check::command(&cli).await,
        Commands::Hash => commands::hash::command().await,
        Commands::CreateUser { username, password } => {
            commands::create_user::command(&cli, username, password.as_deref()).await
        }
        Commands::SetUserStatus {
            username, disabled, ..
        } => commands::set_user_status::command(&cli, username, !*disabled).await,
        Commands::Login { ip, username } => commands::login::command(&cli, ip, username).await,
        Commands::Evaluate {
            ip,
            username,
            success,
        } => commands::evaluate::command(&cli, ip, username, *success).await,
        Commands::Block {
            ip,
            reason,
            duration,
        } => commands::block::command(&cli, ip, reason.as_deref(), *duration).await,
        Commands::Unblock { ip } => commands::unblock::command(&cli, ip).await,
        Commands::SetPermanent { ip, revoke } => {
            commands::set_permanent::command(&cli, ip, !*revoke).await
        }
        Commands::Status { ip } => commands::status::command(&cli, ip).await,
        Commands::Blocked { active } => commands::blocked::command(&cli, *active).await,
        Commands::Users => commands::users::command(&cli).await,
        Commands::Attempts { limit, recent } => {
            commands::attempts::command(&cli, *limit, *recent).await
        }
        Commands::Stats => commands::stats::command(&cli).await,
    }
}
