use super::error::EvalError;
use super::parser::{CmpOp, Expr};
use crate::loan::{FieldValue, LoanRecord};
use std::cmp::Ordering;

/// Reduce an expression to a single boolean for `loan`
pub fn evaluate(expr: &Expr, loan: &LoanRecord) -> Result<bool, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.truthy()),
        Expr::Field(name) => Ok(loan.get(name).truthy()),
        Expr::Compare { op, left, right } => {
            let left = value_of(left, loan)?;
            let right = value_of(right, loan)?;
            compare(*op, &left, &right)
        }
        Expr::Not(inner) => Ok(!evaluate(inner, loan)?),
        Expr::And(terms) => {
            for term in terms {
                if !evaluate(term, loan)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Or(terms) => {
            for term in terms {
                if evaluate(term, loan)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Operand value. Boolean sub-expressions yield `Boolean`.
fn value_of(expr: &Expr, loan: &LoanRecord) -> Result<FieldValue, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(name) => Ok(loan.get(name).clone()),
        other => evaluate(other, loan).map(FieldValue::Boolean),
    }
}

/// Compare two operands.
///
/// `==`/`!=` against `None` test for null. Ordering against `None` is an
/// error. Otherwise numbers compare numerically when both sides read as
/// numbers, and as text when either does not.
pub fn compare(op: CmpOp, left: &FieldValue, right: &FieldValue) -> Result<bool, EvalError> {
    if left.is_null() || right.is_null() {
        let both_null = left.is_null() && right.is_null();
        return match op {
            CmpOp::Eq => Ok(both_null),
            CmpOp::Ne => Ok(!both_null),
            _ => Err(EvalError::TypeComparison {
                op,
                left: left.to_string(),
                right: right.to_string(),
            }),
        };
    }

    let ordering = match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => None,
    }
    .unwrap_or_else(|| left.to_string().cmp(&right.to_string()));

    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
    })
}
