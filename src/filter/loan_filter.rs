use super::error::{FilterError, ParseError};
use super::parser::FilterExpression;
use crate::loan::LoanRecord;
use log::warn;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Whether a true evaluation keeps or drops the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Loans must satisfy the expression to pass
    Inclusion,
    /// Loans satisfying the expression are rejected
    Exclusion,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Inclusion => f.write_str("basic"),
            Polarity::Exclusion => f.write_str("exclusion"),
        }
    }
}

/// A reusable admission rule over loans.
///
/// The expression is parsed once at construction. A filter whose source does
/// not parse is still usable: every `apply` fails closed.
#[derive(Debug)]
pub struct LoanFilter {
    source: String,
    compiled: Result<FilterExpression, ParseError>,
    polarity: Polarity,
    pass_count: AtomicU64,
    fail_count: AtomicU64,
    error_count: AtomicU64,
}

impl LoanFilter {
    pub fn new(source: &str, polarity: Polarity) -> Self {
        Self {
            source: source.to_string(),
            compiled: FilterExpression::parse(source),
            polarity,
            pass_count: AtomicU64::new(0),
            fail_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// Like `new`, but rejects expressions that do not parse
    pub fn try_new(source: &str, polarity: Polarity) -> Result<Self, ParseError> {
        let filter = Self::new(source, polarity);
        match filter.parse_error() {
            Some(err) => Err(err.clone()),
            None => Ok(filter),
        }
    }

    /// Inclusion filter: loans must match to pass
    pub fn basic(source: &str) -> Self {
        Self::new(source, Polarity::Inclusion)
    }

    /// Exclusion filter: matching loans are dropped
    pub fn exclusion(source: &str) -> Self {
        Self::new(source, Polarity::Exclusion)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn expression(&self) -> Option<&FilterExpression> {
        self.compiled.as_ref().ok()
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.compiled.as_ref().err()
    }

    /// Verdict for `loan` with polarity applied. Does not touch counters.
    pub fn evaluate(&self, loan: &LoanRecord) -> Result<bool, FilterError> {
        let expression = self.compiled.as_ref().map_err(|e| e.clone())?;
        let matched = expression.evaluate(loan)?;
        Ok(match self.polarity {
            Polarity::Inclusion => matched,
            Polarity::Exclusion => !matched,
        })
    }

    /// Decide whether `loan` passes, counting the outcome.
    ///
    /// Evaluation failures are logged and count as a failed loan.
    pub fn apply(&self, loan: &LoanRecord) -> bool {
        let passed = match self.evaluate(loan) {
            Ok(passed) => passed,
            Err(err) => {
                warn!(
                    "Filter ({}) could not be evaluated for loan {}: {}",
                    self.source,
                    loan.display_id(),
                    err
                );
                self.error_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        };
        self.record(passed);
        passed
    }

    pub(crate) fn record(&self, passed: bool) {
        let counter = if passed {
            &self.pass_count
        } else {
            &self.fail_count
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count.load(Ordering::Relaxed)
    }

    pub fn fail_count(&self) -> u64 {
        self.fail_count.load(Ordering::Relaxed)
    }

    /// Number of failed applications caused by parse or evaluation errors
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.pass_count.store(0, Ordering::Relaxed);
        self.fail_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            filter: self.source.clone(),
            polarity: self.polarity,
            pass_count: self.pass_count(),
            fail_count: self.fail_count(),
            error_count: self.error_count(),
            parse_error: self.parse_error().map(|e| e.to_string()),
        }
    }
}

impl fmt::Display for LoanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Counter snapshot for one filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStats {
    pub filter: String,
    pub polarity: Polarity,
    pub pass_count: u64,
    pub fail_count: u64,
    pub error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}
