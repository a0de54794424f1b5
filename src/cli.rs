use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Automated loan selection for peer-to-peer lending accounts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration directory holding config.json and filters.json
    #[arg(short = 'c', long, global = true, env = "LENDERBOT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a filter expression and optionally evaluate it against one loan
    Check {
        /// Filter expression, e.g. "{intRate} > 10 and {term} <= 36"
        expression: String,

        /// Loan as an inline JSON object
        #[arg(short, long)]
        loan: Option<String>,

        /// Treat the expression as an exclusion filter
        #[arg(short = 'x', long)]
        exclusion: bool,
    },
    /// Apply every configured filter to every listed loan and report the results
    TestFilters {
        /// Listing JSON file
        #[arg(short, long)]
        loans: PathBuf,
    },
    /// Print the listed loans that pass all filters
    Select {
        /// Listing JSON file
        #[arg(short, long)]
        loans: PathBuf,

        /// JSON file with notes already owned
        #[arg(long)]
        owned: Option<PathBuf>,

        /// Evaluate filters on a worker pool
        #[arg(short, long)]
        parallel: bool,

        /// Print surviving loans as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan orders for the loans that pass all filters
    Plan {
        /// Listing JSON file
        #[arg(short, long)]
        loans: PathBuf,

        /// Available cash
        #[arg(long)]
        cash: f64,

        /// Sum of pending bank transfers
        #[arg(long, default_value_t = 0.0)]
        pending: f64,

        /// Portfolio id to file the new notes under
        #[arg(long)]
        portfolio_id: Option<String>,

        /// JSON file with notes already owned
        #[arg(long)]
        owned: Option<PathBuf>,

        /// Print the order payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarise the status of owned notes
    Notes {
        /// Detailed owned-notes JSON file
        #[arg(short, long)]
        notes: PathBuf,

        /// Only list notes that are no longer current
        #[arg(long)]
        late_only: bool,

        /// Count closed notes in the average rate and grade breakdown
        #[arg(long)]
        include_closed: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
