use crate::filter::{FilterSet, LoanFilter, Polarity};
use log::{info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EXECUTION_CFG: &str = "config.json";
pub const FILTERS_CFG: &str = "filters.json";
pub const DEFAULT_CFG_DIR_NAME: &str = ".lenderbot";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },
}

/// One configured filter. Accepts a bare string or `{ "filter": "..." }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterRule {
    Expr(String),
    Object { filter: String },
}

impl FilterRule {
    pub fn expression(&self) -> &str {
        match self {
            FilterRule::Expr(expr) | FilterRule::Object { filter: expr } => expr,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Inclusion filters, in evaluation order
    #[serde(alias = "filters")]
    pub basic: Vec<FilterRule>,
    pub exclusions: Vec<FilterRule>,
}

impl FilterConfig {
    pub fn len(&self) -> usize {
        self.basic.len() + self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Platform account number, written either as a number or a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InvestorId {
    Number(u64),
    Text(String),
}

impl fmt::Display for InvestorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestorId::Number(n) => write!(f, "{n}"),
            InvestorId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub account: AccountConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    #[serde(alias = "iid")]
    pub investor_id: Option<InvestorId>,
    /// Amount invested per note
    #[serde(alias = "orderamnt")]
    pub order_amount: f64,
    /// Cash level below which a top-up transfer is started
    pub min_balance: f64,
    /// Transfers are rounded up to a multiple of this amount
    pub transfer_multiple: f64,
    /// chrono format pattern naming the target portfolio, e.g. `%Y-%m`
    pub portfolio: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            investor_id: None,
            order_amount: 25.0,
            min_balance: 0.0,
            transfer_multiple: 25.0,
            portfolio: None,
        }
    }
}

/// Resolve the configuration directory, defaulting to `$HOME/.lenderbot`
pub fn config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(DEFAULT_CFG_DIR_NAME)
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn parse_config<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T, ConfigError> {
    json5::from_str::<T>(raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

pub fn parse_filter_config(raw: &str) -> Result<FilterConfig, ConfigError> {
    parse_config(raw, Path::new("<inline>"))
}

pub fn load_filter_config(path: &Path) -> Result<FilterConfig, ConfigError> {
    let raw = read_config(path)?;
    parse_config(&raw, path)
}

/// Load `config.json`. A missing file yields the defaults.
pub fn load_execution_config(path: &Path) -> Result<ExecutionConfig, ConfigError> {
    if !path.exists() {
        info!(
            "No execution config at '{}', using defaults",
            path.display()
        );
        return Ok(ExecutionConfig::default());
    }
    let raw = read_config(path)?;
    parse_config(&raw, path)
}

/// Build the filter set: inclusion filters first, then exclusions, each in
/// file order. Filters that do not parse are kept and will reject every loan.
pub fn build_filters(cfg: &FilterConfig) -> FilterSet {
    let rules = cfg
        .basic
        .iter()
        .map(|rule| (rule, Polarity::Inclusion))
        .chain(cfg.exclusions.iter().map(|rule| (rule, Polarity::Exclusion)));

    let filters: FilterSet = rules
        .map(|(rule, polarity)| {
            let filter = LoanFilter::new(rule.expression(), polarity);
            if let Some(err) = filter.parse_error() {
                warn!(
                    "Invalid {} filter ({}): {}. It will reject every loan",
                    polarity,
                    rule.expression(),
                    err
                );
            }
            filter
        })
        .collect();

    info!("Adding {} filter(s)", filters.len());
    filters
}
