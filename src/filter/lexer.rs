use super::error::ParseError;
use super::parser::CmpOp;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Cmp(CmpOp),
    And,
    Or,
    Not,
    Number(f64),
    /// Quoted string literal
    Str(String),
    /// Unquoted word that is neither a keyword nor a number, e.g. `C4`
    Word(String),
    None,
    True,
    False,
    /// `{fieldName}` placeholder
    Field(String),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Cmp(op) => format!("operator '{op}'"),
            TokenKind::And => "'and'".to_string(),
            TokenKind::Or => "'or'".to_string(),
            TokenKind::Not => "'not'".to_string(),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Str(s) => format!("string {s:?}"),
            TokenKind::Word(w) => format!("word '{w}'"),
            TokenKind::None => "'None'".to_string(),
            TokenKind::True => "'True'".to_string(),
            TokenKind::False => "'False'".to_string(),
            TokenKind::Field(name) => format!("field {{{name}}}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source expression
    pub offset: usize,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '<' | '>' | '=' | '!' | '{' | '}' | '"' | '\'')
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn classify_word(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "None" | "null" => TokenKind::None,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        _ => match word.parse::<f64>() {
            Ok(n) if n.is_finite() => TokenKind::Number(n),
            _ => TokenKind::Word(word.to_string()),
        },
    }
}

/// Split a filter expression into tokens
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '<' | '>' | '=' | '!' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                let op = match (c, followed_by_eq) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    ('>', true) => CmpOp::Ge,
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    _ => {
                        return Err(ParseError::UnknownOperator {
                            op: c.to_string(),
                            offset,
                        });
                    }
                };
                TokenKind::Cmp(op)
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                text.push(escaped);
                            }
                        }
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => text.push(ch),
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { offset });
                }
                TokenKind::Str(text)
            }
            '{' => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    name.push(ch);
                }
                if !closed {
                    return Err(ParseError::UnclosedPlaceholder { offset });
                }
                if name.is_empty() || !name.chars().all(is_field_char) {
                    return Err(ParseError::InvalidFieldName { name, offset });
                }
                TokenKind::Field(name)
            }
            c if is_word_char(c) => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                classify_word(&src[offset..end])
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, offset }),
        };

        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("{intRate} >= 10.5"),
            vec![
                TokenKind::Field("intRate".to_string()),
                TokenKind::Cmp(CmpOp::Ge),
                TokenKind::Number(10.5),
            ]
        );
    }

    #[test]
    fn test_operators_without_spaces() {
        assert_eq!(
            kinds("1<2!=3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Cmp(CmpOp::Lt),
                TokenKind::Number(2.0),
                TokenKind::Cmp(CmpOp::Ne),
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_keywords_and_words() {
        assert_eq!(
            kinds("not None and C4 or True"),
            vec![
                TokenKind::Not,
                TokenKind::None,
                TokenKind::And,
                TokenKind::Word("C4".to_string()),
                TokenKind::Or,
                TokenKind::True,
            ]
        );
    }

    #[test]
    fn test_negative_number_and_quoted_string() {
        assert_eq!(
            kinds(r#"-1 == 'debt consolidation' "a\"b""#),
            vec![
                TokenKind::Number(-1.0),
                TokenKind::Cmp(CmpOp::Eq),
                TokenKind::Str("debt consolidation".to_string()),
                TokenKind::Str("a\"b".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_equals_is_unknown_operator() {
        assert_eq!(
            tokenize("{a} = 1"),
            Err(ParseError::UnknownOperator {
                op: "=".to_string(),
                offset: 4
            })
        );
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert_eq!(
            tokenize("{term > 36"),
            Err(ParseError::UnclosedPlaceholder { offset: 0 })
        );
    }

    #[test]
    fn test_invalid_field_name() {
        assert!(matches!(
            tokenize("{} > 1"),
            Err(ParseError::InvalidFieldName { .. })
        ));
        assert!(matches!(
            tokenize("{a b} > 1"),
            Err(ParseError::InvalidFieldName { .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("{grade} == 'C"),
            Err(ParseError::UnterminatedString { offset: 11 })
        );
    }
}
