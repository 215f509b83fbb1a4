use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capfor", author, version, about = "Regional capacity-factor forecasting", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Path to a TOML configuration file (defaults are used when absent)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the regional weather dataset from the gridded inputs
    Aggregate,
    /// Train per-column models and write quantile prediction tables
    Forecast {
        /// Tune hyper-parameters by cross-validated grid search instead of
        /// early stopping on a held-out split
        #[arg(long)]
        grid_search: bool,
    },
    /// Aggregate (if needed) and then forecast, in one invocation
    Run {
        #[arg(long)]
        grid_search: bool,
    },
    /// List capacity-factor columns whose name contains a pattern
    Columns {
        /// Substring to match, e.g. a country abbreviation like "DE"
        pattern: String,
    },
}
