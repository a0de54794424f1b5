use crate::loan::LoanRecord;
use log::debug;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a listing dump
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected listing shape: {0}")]
    Shape(String),
}

/// Parse a listing response into loan records.
///
/// Accepts the platform response `{"loans": [...]}`, a bare array of loan
/// objects, or a single loan object. A response without a `loans` key (an
/// empty listing) yields no loans.
pub fn parse_listing(raw: &str) -> Result<Vec<LoanRecord>, SourceError> {
    let value: Value = serde_json::from_str(raw)?;
    let items: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("loans") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) => &[],
            Some(other) => {
                return Err(SourceError::Shape(format!(
                    "'loans' must be an array, found {}",
                    json_type(other)
                )));
            }
            None if map.contains_key("asOfDate") || map.is_empty() => &[],
            None => return Ok(vec![LoanRecord::from_json_map(map)]),
        },
        other => {
            return Err(SourceError::Shape(format!(
                "expected an object or array, found {}",
                json_type(other)
            )));
        }
    };

    let mut loans = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => loans.push(LoanRecord::from_json_map(map)),
            other => {
                return Err(SourceError::Shape(format!(
                    "loan #{index} must be an object, found {}",
                    json_type(other)
                )));
            }
        }
    }
    debug!("Parsed {} loan(s) from listing", loans.len());
    Ok(loans)
}

pub fn load_listing(path: &Path) -> Result<Vec<LoanRecord>, SourceError> {
    let raw = read(path)?;
    parse_listing(&raw)
}

/// Parse owned note ids from `{"myNotes": [{"loanId": ..}]}`, an array of
/// note objects, or an array of plain ids.
pub fn parse_owned_ids(raw: &str) -> Result<HashSet<String>, SourceError> {
    let value: Value = serde_json::from_str(raw)?;
    let notes: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("myNotes") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Err(SourceError::Shape("missing 'myNotes' array".to_string())),
        },
        other => {
            return Err(SourceError::Shape(format!(
                "expected an object or array, found {}",
                json_type(other)
            )));
        }
    };

    Ok(notes
        .iter()
        .filter_map(|note| match note {
            Value::Object(map) => map.get("loanId").or_else(|| map.get("id")),
            other => Some(other),
        })
        .filter_map(|id| match id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect())
}

pub fn load_owned_ids(path: &Path) -> Result<HashSet<String>, SourceError> {
    let raw = read(path)?;
    parse_owned_ids(&raw)
}

pub(crate) fn read(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::FieldValue;

    #[test]
    fn test_parse_platform_listing() {
        let loans = parse_listing(
            r#"{"asOfDate": "2017-01-01", "loans": [
                {"id": 1, "intRate": 15.5, "grade": "C", "mthsSinceLastDelinq": null},
                {"id": 2, "intRate": 5, "grade": "A"}
            ]}"#,
        )
        .expect("valid listing");
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].get("intRate"), &FieldValue::Number(15.5));
        assert!(loans[0].get("mthsSinceLastDelinq").is_null());
        assert_eq!(loans[1].display_id(), "2");
    }

    #[test]
    fn test_listing_without_loans_is_empty() {
        let loans = parse_listing(r#"{"asOfDate": "2017-01-01"}"#).expect("valid listing");
        assert!(loans.is_empty());
    }

    #[test]
    fn test_bare_array_and_single_object() {
        assert_eq!(parse_listing(r#"[{"id": 1}, {"id": 2}]"#).unwrap().len(), 2);
        assert_eq!(parse_listing(r#"{"id": 9, "term": 36}"#).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_object_loans() {
        assert!(matches!(
            parse_listing(r#"{"loans": [1, 2]}"#),
            Err(SourceError::Shape(_))
        ));
        assert!(matches!(parse_listing("not json"), Err(SourceError::Json(_))));
    }

    #[test]
    fn test_owned_ids() {
        let ids = parse_owned_ids(r#"{"myNotes": [{"loanId": 11}, {"loanId": "12"}]}"#)
            .expect("valid notes");
        assert!(ids.contains("11"));
        assert!(ids.contains("12"));
        assert_eq!(parse_owned_ids("[1, 2, 2]").unwrap().len(), 2);
    }
}
