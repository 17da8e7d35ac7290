use anyhow::Result;
use clap::{Parser, Subcommand};

use hookdash::analytics::activity;
use hookdash::{cli, config, web};

#[derive(Debug, Parser)]
#[command(name = "hookdash")]
#[command(about = "Events dashboard analytics for a webhook gateway project")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch summary counters and the chart series for a date filter
    Summary {
        #[command(flatten)]
        filter: FilterFlags,
        /// Place samples onto every bucket, filling gaps with zero
        #[arg(long)]
        zero_fill: bool,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Preview the chart buckets for a date filter (no backend calls)
    Buckets {
        #[command(flatten)]
        filter: FilterFlags,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Wait for the first deliveries of an incoming project
    Watch {
        /// Give up after this many seconds
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },
    /// Serve the dashboard as a JSON API
    Web {
        /// Address to bind (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show recent background activity (fetch failures, poller lifecycle)
    Activity {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check backend reachability, config and local state
    Health,
    /// Manage hookdash configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Args)]
struct FilterFlags {
    /// Range start (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,
    /// Range end (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,
    /// Named range: last-year, last-month, last-week, yesterday
    #[arg(long, conflicts_with_all = ["start", "end"])]
    preset: Option<String>,
    /// Bucket frequency: daily, weekly, monthly, yearly
    #[arg(long)]
    frequency: Option<String>,
}

impl From<FilterFlags> for cli::FilterArgs {
    fn from(flags: FilterFlags) -> Self {
        Self {
            start: flags.start,
            end: flags.end,
            preset: flags.preset,
            frequency: flags.frequency,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config to ~/.hookdash/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `hookdash config set poller.interval_ms 5000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    let cfg = config::load();
    activity::set_enabled(cfg.logging.enabled);

    match app.command {
        Commands::Summary {
            filter,
            zero_fill,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_summary(&filter.into(), zero_fill, fmt)
        }
        Commands::Buckets { filter, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_buckets(&filter.into(), fmt)
        }
        Commands::Watch { timeout_secs } => cli::run_watch(timeout_secs),
        Commands::Web { addr } => {
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            web::serve(&addr, cli::controller_from_config(&cfg))
        }
        Commands::Activity { limit, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_activity(limit, fmt)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
