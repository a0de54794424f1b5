use super::loan_filter::{LoanFilter, Polarity};
use crate::loan::LoanRecord;
use log::{debug, error, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Ordered list of filters applied with AND logic
#[derive(Debug, Default)]
pub struct FilterSet {
    filters: Vec<LoanFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn push(&mut self, filter: LoanFilter) {
        self.filters.push(filter);
    }

    pub fn with(mut self, filter: LoanFilter) -> Self {
        self.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoanFilter> {
        self.filters.iter()
    }

    /// True when every filter passes `loan`. Stops at the first rejection,
    /// so later filters are not counted for that loan.
    pub fn passes(&self, loan: &LoanRecord) -> bool {
        self.filters.iter().all(|f| f.apply(loan))
    }

    /// Loans that pass every filter, in input order
    pub fn filter(&self, loans: &[LoanRecord]) -> Vec<LoanRecord> {
        loans
            .iter()
            .filter(|loan| self.passes(loan))
            .cloned()
            .collect()
    }

    /// Same result as [`FilterSet::filter`], evaluated on the rayon pool
    pub fn filter_parallel(&self, loans: &[LoanRecord]) -> Vec<LoanRecord> {
        loans
            .par_iter()
            .filter(|loan| self.passes(loan))
            .cloned()
            .collect()
    }

    /// Drop loans already owned, then apply the filters
    pub fn select(&self, loans: &[LoanRecord], owned_ids: &HashSet<String>) -> Vec<LoanRecord> {
        let fresh = drop_owned(loans, owned_ids);
        let selected = self.filter(&fresh);
        self.log_selection(selected.len(), fresh.len());
        selected
    }

    /// [`FilterSet::select`] with filters evaluated on the rayon pool
    pub fn select_parallel(
        &self,
        loans: &[LoanRecord],
        owned_ids: &HashSet<String>,
    ) -> Vec<LoanRecord> {
        let fresh = drop_owned(loans, owned_ids);
        let selected = self.filter_parallel(&fresh);
        self.log_selection(selected.len(), fresh.len());
        selected
    }

    fn log_selection(&self, selected: usize, candidates: usize) {
        info!(
            "{} of {} loan(s) pass {} filter(s)",
            selected,
            candidates,
            self.len()
        );
    }

    /// Apply every filter to every loan, without short-circuiting, and report
    /// how each filter behaved.
    pub fn self_test(&self, loans: &[LoanRecord]) -> SelfTestReport {
        info!("Testing {} loan filter(s) against {} loan(s)", self.len(), loans.len());
        let mut results = Vec::with_capacity(self.filters.len());

        for filter in &self.filters {
            info!("Testing filter: {}", filter);
            let before = filter.stats();
            for loan in loans {
                filter.apply(loan);
            }
            let after = filter.stats();

            let passed = after.pass_count - before.pass_count;
            let failed = after.fail_count - before.fail_count;
            let errors = after.error_count - before.error_count;
            let always_fails = !loans.is_empty() && passed == 0;

            if let Some(err) = filter.parse_error() {
                error!("Filter ({}) FAILED to parse: {}", filter, err);
            } else if always_fails {
                error!(
                    "Filter ({}) FAILED every one of {} loan(s), check for a typo",
                    filter,
                    loans.len()
                );
            }

            results.push(SelfTestResult {
                filter: filter.source().to_string(),
                polarity: filter.polarity(),
                passed,
                failed,
                errors,
                parse_error: after.parse_error,
                always_fails,
            });
        }

        info!("Loan filter testing complete");
        SelfTestReport {
            loans_tested: loans.len(),
            results,
        }
    }
}

fn drop_owned(loans: &[LoanRecord], owned_ids: &HashSet<String>) -> Vec<LoanRecord> {
    let fresh: Vec<LoanRecord> = loans
        .iter()
        .filter(|loan| loan.id().is_none_or(|id| !owned_ids.contains(&id)))
        .cloned()
        .collect();
    let skipped = loans.len() - fresh.len();
    if skipped > 0 {
        debug!("Skipping {} already owned loan(s)", skipped);
    }
    fresh
}

impl FromIterator<LoanFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = LoanFilter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a LoanFilter;
    type IntoIter = std::slice::Iter<'a, LoanFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

/// Outcome of one filter during a self-test
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestResult {
    pub filter: String,
    pub polarity: Polarity,
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub always_fails: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub loans_tested: usize,
    pub results: Vec<SelfTestResult>,
}

impl SelfTestReport {
    /// Filters that look misconfigured: unparseable, or rejecting every loan
    pub fn suspicious(&self) -> impl Iterator<Item = &SelfTestResult> {
        self.results
            .iter()
            .filter(|r| r.always_fails || r.parse_error.is_some())
    }

    pub fn has_suspicious(&self) -> bool {
        self.suspicious().next().is_some()
    }
}
