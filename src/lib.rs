pub mod cli;
pub mod config;
pub mod filter;
pub mod loan;
pub mod notes;
pub mod planner;
pub mod report;
pub mod source;

use crate::config::{EXECUTION_CFG, FILTERS_CFG};
use crate::filter::{FilterSet, LoanFilter, Polarity};
use anyhow::{Context, bail};
use chrono::Local;
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub use cli::{Cli, Commands, cli_parse};
pub use filter::{FilterExpression, FilterStats};
pub use loan::{FieldValue, LoanRecord, sort_by_quality};

/// Exit status used when the self-test finds suspicious filters
const EXIT_SUSPICIOUS_FILTERS: u8 = 2;

/// Initialise `env_logger`. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

fn load_filters(config_dir: &Path) -> anyhow::Result<FilterSet> {
    let path = config_dir.join(FILTERS_CFG);
    let cfg = config::load_filter_config(&path)
        .with_context(|| format!("Failed to load filters from '{}'", path.display()))?;
    if cfg.is_empty() {
        warn!("No filters configured in '{}'", path.display());
    }
    Ok(config::build_filters(&cfg))
}

fn load_owned(path: Option<&PathBuf>) -> anyhow::Result<HashSet<String>> {
    match path {
        Some(path) => source::load_owned_ids(path)
            .with_context(|| format!("Failed to load owned notes from '{}'", path.display())),
        None => Ok(HashSet::new()),
    }
}

fn load_loans(path: &Path) -> anyhow::Result<Vec<LoanRecord>> {
    source::load_listing(path)
        .with_context(|| format!("Failed to load loans from '{}'", path.display()))
}

fn check_expression(expression: &str, loan: Option<&str>, exclusion: bool) -> anyhow::Result<()> {
    let polarity = if exclusion {
        Polarity::Exclusion
    } else {
        Polarity::Inclusion
    };
    let filter = LoanFilter::try_new(expression, polarity)
        .with_context(|| format!("Invalid filter expression: {expression}"))?;

    if let Some(parsed) = filter.expression() {
        println!("Parsed:  {}", parsed.root());
        let fields: Vec<&str> = parsed.fields().into_iter().collect();
        if !fields.is_empty() {
            println!("Fields:  {}", fields.join(", "));
        }
    }

    if let Some(raw) = loan {
        let loans = source::parse_listing(raw).context("Invalid loan JSON")?;
        let Some(loan) = loans.first() else {
            bail!("Loan JSON contained no loan");
        };
        match filter.evaluate(loan) {
            Ok(true) => println!("Result:  PASS"),
            Ok(false) => println!("Result:  FAIL"),
            Err(err) => println!("Result:  FAIL ({err})"),
        }
    }
    Ok(())
}

fn select_loans(
    filters: &FilterSet,
    loans: &[LoanRecord],
    owned: &HashSet<String>,
    parallel: bool,
) -> Vec<LoanRecord> {
    let mut selected = if parallel {
        filters.select_parallel(loans, owned)
    } else {
        filters.select(loans, owned)
    };
    sort_by_quality(&mut selected);
    selected
}

pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_dir = config::config_dir(cli.config_dir.as_deref());
    info!("Using configuration directory '{}'", config_dir.display());

    match &cli.command {
        Commands::Check {
            expression,
            loan,
            exclusion,
        } => {
            check_expression(expression, loan.as_deref(), *exclusion)?;
        }
        Commands::TestFilters { loans } => {
            let filters = load_filters(&config_dir)?;
            let loans = load_loans(loans)?;
            let report = filters.self_test(&loans);
            report::display_self_test(&report);
            if report.has_suspicious() {
                return Ok(ExitCode::from(EXIT_SUSPICIOUS_FILTERS));
            }
        }
        Commands::Select {
            loans,
            owned,
            parallel,
            json,
        } => {
            let filters = load_filters(&config_dir)?;
            let loans = load_loans(loans)?;
            let owned = load_owned(owned.as_ref())?;
            let selected = select_loans(&filters, &loans, &owned, *parallel);

            if *json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
            } else {
                print!("{}", report::format_selection(&selected, &filters));
            }
        }
        Commands::Plan {
            loans,
            cash,
            pending,
            portfolio_id,
            owned,
            json,
        } => {
            let execution = config::load_execution_config(&config_dir.join(EXECUTION_CFG))
                .context("Failed to load execution config")?;
            let account = &execution.account;
            let filters = load_filters(&config_dir)?;
            let loans = load_loans(loans)?;
            let owned = load_owned(owned.as_ref())?;
            let selected = select_loans(&filters, &loans, &owned, false);

            let portfolio = account
                .portfolio
                .as_deref()
                .map(|pattern| planner::portfolio_name(pattern, &Local::now()))
                .transpose()?;
            let plan = planner::plan_orders(
                &selected,
                *cash,
                account.order_amount,
                portfolio_id.as_deref(),
                account.investor_id.as_ref().map(|id| id.to_string()),
            );
            let transfer = planner::transfer_amount(
                *cash,
                *pending,
                account.min_balance,
                account.transfer_multiple,
            );

            if *json {
                let payload = serde_json::json!({
                    "portfolio": portfolio,
                    "order": plan,
                    "transfer": transfer,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                if let Some(name) = &portfolio {
                    println!("Target portfolio: {name}");
                }
                print!("{}", report::format_plan(&plan, transfer));
            }
        }
        Commands::Notes {
            notes: path,
            late_only,
            include_closed,
            json,
        } => {
            let owned = notes::load_notes(path)
                .with_context(|| format!("Failed to load notes from '{}'", path.display()))?;
            if *late_only {
                let late = notes::late_notes(&owned);
                if *json {
                    println!("{}", serde_json::to_string_pretty(&late)?);
                } else {
                    print!("{}", report::format_late_notes(&late));
                }
            } else {
                let summary = notes::summarize(&owned, *include_closed);
                if *json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print!("{}", report::format_note_summary(&summary));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
