use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

mod value;

pub use value::FieldValue;

pub const DEFAULT_QUALITY: i64 = 100;

static NULL_FIELD: FieldValue = FieldValue::Null;

/// One marketplace listing as seen at poll time.
///
/// Fields are read-only once constructed. The only mutable part is the
/// `quality` score, which is used for ranking and never takes part in
/// filter evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    fields: BTreeMap<String, FieldValue>,
    quality: i64,
}

impl LoanRecord {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            fields,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Build a record from a listing JSON object.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let fields = map
            .iter()
            .map(|(key, value)| (key.clone(), FieldValue::from(value)))
            .collect();
        Self::new(fields)
    }

    /// Look up a field. Absent keys read as `Null`.
    pub fn get(&self, key: &str) -> &FieldValue {
        self.fields.get(key).unwrap_or(&NULL_FIELD)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Identifier used in logs and order payloads: `id`, then `loanId`.
    pub fn id(&self) -> Option<String> {
        ["id", "loanId"]
            .iter()
            .map(|key| self.get(key))
            .find(|value| !value.is_null())
            .map(|value| value.to_string())
    }

    pub fn display_id(&self) -> String {
        self.id().unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn quality(&self) -> i64 {
        self.quality
    }

    pub fn set_quality(&mut self, quality: i64) {
        self.quality = quality;
    }

    /// Ranking order. Only `quality` is compared.
    pub fn cmp_quality(&self, other: &Self) -> Ordering {
        self.quality.cmp(&other.quality)
    }
}

impl<K, V> FromIterator<(K, V)> for LoanRecord
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Sort highest quality first. Equal scores keep listing order.
pub fn sort_by_quality(loans: &mut [LoanRecord]) {
    loans.sort_by(|a, b| b.cmp_quality(a));
}

impl Serialize for LoanRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = Map::new();
        for (key, value) in &self.fields {
            let json = match value {
                FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                FieldValue::Text(s) => Value::String(s.clone()),
                FieldValue::Boolean(b) => Value::Bool(*b),
                FieldValue::Null => Value::Null,
            };
            map.insert(key.clone(), json);
        }
        map.insert("quality".to_string(), Value::from(self.quality));
        map.serialize(serializer)
    }
}

impl fmt::Display for LoanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |key: &str| -> String {
            match self.get(key) {
                FieldValue::Null => "-".to_string(),
                value => value.to_string(),
            }
        };
        let whole = |key: &str| -> String {
            match self.get(key) {
                FieldValue::Null => "-".to_string(),
                value => match value.as_number() {
                    Some(n) => format!("{:.0}", n.trunc()),
                    None => value.to_string(),
                },
            }
        };
        let rate = match self.get("intRate").as_number() {
            Some(rate) => format!("{rate:.2}"),
            None => "-".to_string(),
        };

        writeln!(f, "Loan ID: {}", self.display_id())?;
        writeln!(f, "Amount Requested: ${}", whole("loanAmount"))?;
        writeln!(f, "Loan purpose: {}", show("purpose"))?;
        writeln!(f, "Loan grade: {}", show("subGrade"))?;
        writeln!(f, "Interest rate: {rate}")?;
        writeln!(f, "Loan length: {} months", whole("term"))?;
        write!(f, "Monthly payment: ${}", whole("installment"))
    }
}
