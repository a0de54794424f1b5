use super::parser::CmpOp;
use thiserror::Error;

/// Errors raised while turning a filter string into an expression tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty filter expression")]
    Empty,

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unknown operator '{op}' at offset {offset}. Valid operators are: < <= > >= == !=")]
    UnknownOperator { op: String, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unclosed field placeholder starting at offset {offset}")]
    UnclosedPlaceholder { offset: usize },

    #[error("invalid field name '{name}' at offset {offset}")]
    InvalidFieldName { name: String, offset: usize },

    #[error("unbalanced parenthesis at offset {offset}")]
    UnbalancedParen { offset: usize },

    #[error("expected an operand at offset {offset}, found {found}")]
    ExpectedOperand { found: String, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("unexpected trailing {found} at offset {offset}")]
    TrailingInput { found: String, offset: usize },
}

/// Errors raised while evaluating a parsed expression against a loan
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot compare {left} {op} {right}: ordering against None is undefined")]
    TypeComparison {
        op: CmpOp,
        left: String,
        right: String,
    },
}

/// Any failure a filter can hit for a single loan
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}
