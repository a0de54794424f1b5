//! Loan filter expressions
//!
//! A filter is a small boolean expression evaluated against every listed
//! loan. Field values are referenced with `{fieldName}` placeholders and are
//! read from the loan at evaluation time, so an expression is parsed once and
//! reused across poll cycles.
//!
//! # Syntax
//!
//! ```text
//! {field} op literal      Compare a loan field, op is one of < <= > >= == !=
//! a and b / a or b        Boolean combinators, `and` binds tighter than `or`
//! not a                   Negation
//! ( ... )                 Grouping
//! {field}                 Truthiness check (non-zero, non-empty, non-null)
//! ```
//!
//! Literals are numbers, quoted strings, bare words (`C4`), `None`, `True`
//! and `False`. Fields missing from a loan read as `None`.
//!
//! # Examples
//!
//! ```text
//! {intRate} > 10 and {term} <= 36
//! {grade} == C or {grade} == D
//! {mthsSinceLastDelinq} == None
//! not ({purpose} == 'small_business')
//! ```

pub mod error;
mod eval;
pub mod lexer;
pub mod loan_filter;
pub mod parser;
pub mod pool;
pub mod set;

pub use error::{EvalError, FilterError, ParseError};
pub use eval::compare;
pub use loan_filter::{FilterStats, LoanFilter, Polarity};
pub use parser::{CmpOp, Expr, FilterExpression};
pub use pool::{EvaluationPool, PendingVerdict};
pub use set::{FilterSet, SelfTestReport, SelfTestResult};
