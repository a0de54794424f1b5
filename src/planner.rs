use crate::loan::LoanRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use log::{info, warn};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Invalid portfolio name pattern '{0}'")]
    InvalidPortfolioPattern(String),
}

/// One note purchase in the platform order payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub loan_id: String,
    pub requested_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<String>,
}

/// Order payload: `{"aid": .., "orders": [..]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
    pub orders: Vec<OrderRequest>,
}

impl OrderPlan {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_amount(&self) -> f64 {
        self.orders.iter().map(|o| o.requested_amount).sum()
    }
}

/// Buy as many of `candidates` as the cash covers, best first.
///
/// Candidates are expected in purchase priority order. Loans without an id
/// cannot be ordered and are skipped.
pub fn plan_orders(
    candidates: &[LoanRecord],
    available_cash: f64,
    order_amount: f64,
    portfolio_id: Option<&str>,
    aid: Option<String>,
) -> OrderPlan {
    let affordable = if order_amount > 0.0 && available_cash > 0.0 {
        (available_cash / order_amount).floor() as usize
    } else {
        0
    };

    let orders: Vec<OrderRequest> = candidates
        .iter()
        .filter_map(|loan| {
            let id = loan.id();
            if id.is_none() {
                warn!("Skipping loan without an id:\n{}", loan);
            }
            id
        })
        .take(affordable)
        .map(|loan_id| OrderRequest {
            loan_id,
            requested_amount: order_amount,
            portfolio_id: portfolio_id.map(str::to_string),
        })
        .collect();

    info!(
        "Planning {} order(s) of ${} from {} candidate loan(s) with ${} available",
        orders.len(),
        order_amount,
        candidates.len(),
        available_cash
    );
    OrderPlan { aid, orders }
}

/// Amount to transfer so that cash plus pending transfers reaches
/// `min_balance`, rounded up to `multiple`. `None` when no transfer is needed.
pub fn transfer_amount(cash: f64, pending: f64, min_balance: f64, multiple: f64) -> Option<f64> {
    if cash >= min_balance {
        return None;
    }
    let total = cash + pending;
    if total >= min_balance {
        return None;
    }

    let shortfall = min_balance - total;
    let amount = if multiple > 0.0 {
        ((shortfall + (multiple - 0.01)) / multiple).floor() * multiple
    } else {
        shortfall
    };
    info!(
        "Transferring ${} to meet minimum balance requirement of ${}",
        amount, min_balance
    );
    Some(amount)
}

/// Format the target portfolio name from a strftime pattern
pub fn portfolio_name<Tz>(pattern: &str, now: &DateTime<Tz>) -> Result<String, PlanError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(PlanError::InvalidPortfolioPattern(pattern.to_string()));
    }
    Ok(now.format(pattern).to_string())
}
