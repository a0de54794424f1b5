use serde_json::Value;
use std::fmt;

/// A single loan field value.
///
/// Listing JSON is flat, so nested arrays and objects are kept as their JSON
/// text rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view used by comparisons. Text that reads as a finite number
    /// counts as numeric, booleans count as 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            FieldValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Null => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Boolean(b) => *b,
            FieldValue::Null => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Boolean(true) => write!(f, "True"),
            FieldValue::Boolean(false) => write!(f, "False"),
            FieldValue::Null => write!(f, "None"),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_text_is_numeric() {
        assert_eq!(FieldValue::from("36").as_number(), Some(36.0));
        assert_eq!(FieldValue::from(" -1.5 ").as_number(), Some(-1.5));
        assert_eq!(FieldValue::from("C4").as_number(), None);
        assert_eq!(FieldValue::from("NaN").as_number(), None);
        assert_eq!(FieldValue::Null.as_number(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(FieldValue::Number(0.5).truthy());
        assert!(!FieldValue::Number(0.0).truthy());
        assert!(!FieldValue::from("").truthy());
        assert!(FieldValue::from("x").truthy());
        assert!(!FieldValue::Null.truthy());
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FieldValue::from(&json!(15.5)), FieldValue::Number(15.5));
        assert_eq!(FieldValue::from(&json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from(&json!(true)), FieldValue::Boolean(true));
        assert_eq!(
            FieldValue::from(&json!([1, 2])),
            FieldValue::Text("[1,2]".to_string())
        );
    }

    #[test]
    fn test_display_matches_literal_spelling() {
        assert_eq!(FieldValue::Number(36.0).to_string(), "36");
        assert_eq!(FieldValue::Number(15.5).to_string(), "15.5");
        assert_eq!(FieldValue::Null.to_string(), "None");
        assert_eq!(FieldValue::Boolean(false).to_string(), "False");
    }
}
