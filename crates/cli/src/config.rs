use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/twigs.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server used for login; later commands use the stored one.
    pub base_url: String,
    pub username: String,
    pub credentials_path: String,
    pub level: String,
    pub cache: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            credentials_path: "config/twigs_credentials.json".to_string(),
            level: "info".to_string(),
            cache: true,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "twigs", about = "Command line client for a Twigs server")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the server address (e.g. twigs.example.com).
    #[arg(long)]
    base_url: Option<String>,
    /// Override username.
    #[arg(long)]
    username: Option<String>,
    /// Override log level.
    #[arg(long)]
    level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session.
    Login {
        #[arg(long, env = "TWIGS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in with it.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TWIGS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "TWIGS_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    /// Forget the stored token.
    Logout,
    /// Show the logged in user.
    Whoami,
    /// List budgets.
    Budgets {
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// List the categories of a budget.
    Categories {
        budget_id: String,
        /// Show archived categories instead of active ones.
        #[arg(long)]
        archived: bool,
        /// Only expense (true) or income (false) categories.
        #[arg(long)]
        expense: Option<bool>,
    },
    /// List the transactions of a budget.
    Transactions {
        budget_id: String,
        #[arg(long = "category")]
        categories: Vec<String>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        count: Option<u32>,
    },
    /// Sum transaction amounts matching the filters.
    Sum {
        #[arg(long = "budget")]
        budget_id: Option<String>,
        #[arg(long = "category")]
        category_id: Option<String>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// Show the balance of a budget.
    Balance { budget_id: String },
    /// Search users by name.
    Users { username: String },
}

pub fn load() -> Result<(AppConfig, Command)> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("TWIGS"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(username) = args.username {
        settings.username = username;
    }
    if let Some(level) = args.level {
        settings.level = level;
    }

    Ok((settings, args.command))
}
