use super::error::{EvalError, ParseError};
use super::eval;
use super::lexer::{Token, TokenKind, tokenize};
use crate::loan::{FieldValue, LoanRecord};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Nesting limit for `not` chains and parentheses
pub const MAX_DEPTH: usize = 64;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }

    /// True for `<`, `<=`, `>`, `>=`
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Expression tree. Field placeholders stay as leaves and are resolved
/// against the loan at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(FieldValue),
    Field(String),
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// Two or more conjuncts
    And(Vec<Expr>),
    /// Two or more disjuncts
    Or(Vec<Expr>),
}

impl Expr {
    fn is_leaf(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Field(_))
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(name) => {
                out.insert(name);
            }
            Expr::Compare { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Expr::Not(inner) => inner.collect_fields(out),
            Expr::And(terms) | Expr::Or(terms) => {
                for term in terms {
                    term.collect_fields(out);
                }
            }
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &FieldValue) -> fmt::Result {
    match value {
        FieldValue::Text(s) => {
            write!(f, "'")?;
            for c in s.chars() {
                if c == '\'' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "'")
        }
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write_literal(f, value),
            Expr::Field(name) => write!(f, "{{{name}}}"),
            Expr::Compare { op, left, right } => {
                for (i, side) in [left, right].into_iter().enumerate() {
                    if i == 1 {
                        write!(f, " {op} ")?;
                    }
                    if side.is_leaf() {
                        write!(f, "{side}")?;
                    } else {
                        write!(f, "({side})")?;
                    }
                }
                Ok(())
            }
            Expr::Not(inner) => match inner.as_ref() {
                Expr::And(..) | Expr::Or(..) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
            Expr::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    if matches!(term, Expr::Or(..)) {
                        write!(f, "({term})")?;
                    } else {
                        write!(f, "{term}")?;
                    }
                }
                Ok(())
            }
            Expr::Or(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

/// A parsed filter expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    source: String,
    root: Expr,
}

impl FilterExpression {
    /// Parse a filter expression
    ///
    /// ```text
    /// expr       := or_expr
    /// or_expr    := and_expr ( 'or' and_expr )*
    /// and_expr   := not_expr ( 'and' not_expr )*
    /// not_expr   := 'not' not_expr | comparison
    /// comparison := operand ( cmp_op operand )?
    /// operand    := '(' expr ')' | literal | '{' field '}'
    /// ```
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(s)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or()?;

        if let Some(token) = parser.peek() {
            return Err(match token.kind {
                TokenKind::RParen => ParseError::UnbalancedParen {
                    offset: token.offset,
                },
                ref kind => ParseError::TrailingInput {
                    found: kind.describe(),
                    offset: token.offset,
                },
            });
        }

        Ok(Self {
            source: s.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Field names referenced by `{placeholder}` leaves
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.root.collect_fields(&mut out);
        out
    }

    /// Evaluate against a loan, resolving placeholders from its fields
    pub fn evaluate(&self, loan: &LoanRecord) -> Result<bool, EvalError> {
        eval::evaluate(&self.root, loan)
    }
}

impl FromStr for FilterExpression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Chains stay flat so tree depth is bounded by MAX_DEPTH alone.
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.swap_remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_not()?];
        while self.eat(&TokenKind::And) {
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 {
            terms.swap_remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_operand()?;
        if let Some(Token {
            kind: TokenKind::Cmp(op),
            ..
        }) = self.peek()
        {
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(Expr::Compare {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let token = self.next().ok_or(ParseError::UnexpectedEnd)?;
        let expr = match &token.kind {
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.leave();
                if !self.eat(&TokenKind::RParen) {
                    return Err(ParseError::UnbalancedParen {
                        offset: token.offset,
                    });
                }
                inner
            }
            TokenKind::Field(name) => Expr::Field(name.clone()),
            TokenKind::Number(n) => Expr::Literal(FieldValue::Number(*n)),
            TokenKind::Str(s) | TokenKind::Word(s) => Expr::Literal(FieldValue::Text(s.clone())),
            TokenKind::None => Expr::Literal(FieldValue::Null),
            TokenKind::True => Expr::Literal(FieldValue::Boolean(true)),
            TokenKind::False => Expr::Literal(FieldValue::Boolean(false)),
            other => {
                return Err(ParseError::ExpectedOperand {
                    found: other.describe(),
                    offset: token.offset,
                });
            }
        };
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FilterExpression {
        FilterExpression::parse(s).expect("valid expression")
    }

    #[test]
    fn test_or_binds_loosest() {
        let expr = parse("{a} > 1 and {b} < 5 or {c} == 2");
        assert!(matches!(expr.root(), Expr::Or(terms) if matches!(terms[0], Expr::And(..))));
        assert_eq!(expr.root().to_string(), "{a} > 1 and {b} < 5 or {c} == 2");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("{a} > 1 and ({b} < 5 or {c} == 2)");
        assert!(matches!(expr.root(), Expr::And(terms) if matches!(terms[1], Expr::Or(..))));
        assert_eq!(
            expr.root().to_string(),
            "{a} > 1 and ({b} < 5 or {c} == 2)"
        );
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse("not {a} == 1 and {b}");
        assert!(matches!(expr.root(), Expr::And(terms) if matches!(terms[0], Expr::Not(..))));
    }

    #[test]
    fn test_bare_operand_is_valid() {
        assert_eq!(parse("{loanId}").root(), &Expr::Field("loanId".to_string()));
    }

    #[test]
    fn test_words_become_text_literals() {
        let expr = parse("{grade} == C");
        assert_eq!(expr.root().to_string(), "{grade} == 'C'");
    }

    #[test]
    fn test_fields_are_collected() {
        let expr = parse("{term} <= 36 and not ({grade} == A or {term} > 12)");
        let fields: Vec<&str> = expr.fields().into_iter().collect();
        assert_eq!(fields, vec!["grade", "term"]);
    }

    #[test]
    fn test_display_keeps_source_text() {
        let expr = parse("  {a}>1 ");
        assert_eq!(expr.to_string(), "  {a}>1 ");
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(FilterExpression::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(
            FilterExpression::parse("({a} > 1"),
            Err(ParseError::UnbalancedParen { offset: 0 })
        );
        assert_eq!(
            FilterExpression::parse("{a} > 1)"),
            Err(ParseError::UnbalancedParen { offset: 7 })
        );
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(matches!(
            FilterExpression::parse("{a} > 1 2"),
            Err(ParseError::TrailingInput { offset: 8, .. })
        ));
        assert!(matches!(
            FilterExpression::parse("1 < 2 < 3"),
            Err(ParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(
            FilterExpression::parse("{a} >"),
            Err(ParseError::UnexpectedEnd)
        );
        assert!(matches!(
            FilterExpression::parse("{a} > and 1"),
            Err(ParseError::ExpectedOperand { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(
            FilterExpression::parse(&deep),
            Err(ParseError::TooDeep { max: MAX_DEPTH })
        );
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(FilterExpression::parse(&ok).is_ok());
    }

    #[test]
    fn test_chains_are_flat() {
        let expr = parse("{a} and {b} and {c} or {d}");
        match expr.root() {
            Expr::Or(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(&terms[0], Expr::And(inner) if inner.len() == 3));
            }
            other => panic!("expected or, got {other:?}"),
        }
        assert_eq!(expr.root().to_string(), "{a} and {b} and {c} or {d}");
    }

    #[test]
    fn test_long_chain_parses_and_renders() {
        let src = format!("{}1", "1 and ".repeat(50_000));
        let expr = parse(&src);
        assert!(matches!(expr.root(), Expr::And(terms) if terms.len() == 50_001));
        assert_eq!(expr.root().to_string().len(), src.len());
        assert_eq!(expr.fields().len(), 0);
    }
}
