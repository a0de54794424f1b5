use crate::source::{self, SourceError};
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Letter grades reported in the per-grade breakdown
pub const GRADES: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];

/// Platform loan status of an owned note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    Current,
    InGracePeriod,
    Late,
    Default,
    FullyPaid,
    ChargedOff,
    Issued,
    Issuing,
    InFunding,
    InReview,
    Other,
}

impl NoteStatus {
    /// Map a `loanStatus` string. Policy-prefixed statuses such as
    /// "Does not meet the credit policy. Status: Fully Paid" map to their tail.
    pub fn parse(raw: &str) -> Self {
        let status = raw.trim().to_ascii_lowercase();
        let status = status.rsplit("status:").next().unwrap_or_default().trim();
        match status {
            "current" => NoteStatus::Current,
            "in grace period" => NoteStatus::InGracePeriod,
            "default" => NoteStatus::Default,
            "fully paid" => NoteStatus::FullyPaid,
            "charged off" => NoteStatus::ChargedOff,
            "issued" => NoteStatus::Issued,
            "issuing" => NoteStatus::Issuing,
            "in funding" => NoteStatus::InFunding,
            "in review" => NoteStatus::InReview,
            s if s.starts_with("late") => NoteStatus::Late,
            _ => NoteStatus::Other,
        }
    }

    pub fn is_current(self) -> bool {
        self == NoteStatus::Current
    }

    /// Behind on payments, including the grace period and default
    pub fn is_late(self) -> bool {
        matches!(
            self,
            NoteStatus::InGracePeriod | NoteStatus::Late | NoteStatus::Default
        )
    }

    pub fn is_open(self) -> bool {
        !matches!(self, NoteStatus::FullyPaid | NoteStatus::ChargedOff)
    }

    /// False while the loan is still being reviewed or funded
    pub fn is_issued(self) -> bool {
        !matches!(
            self,
            NoteStatus::InReview | NoteStatus::InFunding | NoteStatus::Issuing
        )
    }
}

/// One entry of the detailed owned-notes response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNote {
    #[serde(default, deserialize_with = "id_text")]
    pub loan_id: Option<String>,
    #[serde(default, deserialize_with = "id_text")]
    pub note_id: Option<String>,
    #[serde(default)]
    pub loan_status: Option<String>,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub principal_pending: Option<f64>,
}

impl OwnedNote {
    pub fn status(&self) -> NoteStatus {
        self.loan_status
            .as_deref()
            .map(NoteStatus::parse)
            .unwrap_or(NoteStatus::Other)
    }
}

impl fmt::Display for OwnedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loan {} (note {}): {}, grade {}",
            self.loan_id.as_deref().unwrap_or("-"),
            self.note_id.as_deref().unwrap_or("-"),
            self.loan_status.as_deref().unwrap_or("-"),
            self.grade.as_deref().unwrap_or("-"),
        )?;
        if let Some(rate) = self.interest_rate {
            write!(f, ", {rate:.2}%")?;
        }
        Ok(())
    }
}

fn id_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Status counts over a set of owned notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSummary {
    /// Notes the average and grade breakdown cover
    pub counted: usize,
    /// Mean interest rate of counted notes that report one
    pub average_rate: Option<f64>,
    pub open: usize,
    pub current: usize,
    pub late: usize,
    pub closed: usize,
    pub in_review: usize,
    pub include_closed: bool,
    pub grades: BTreeMap<char, usize>,
}

/// Summarise owned notes. Closed notes only enter the average and grade
/// breakdown when `include_closed` is set.
pub fn summarize(notes: &[OwnedNote], include_closed: bool) -> NoteSummary {
    let counted: Vec<&OwnedNote> = notes
        .iter()
        .filter(|note| include_closed || note.status().is_open())
        .collect();

    let rates: Vec<f64> = counted.iter().filter_map(|note| note.interest_rate).collect();
    let average_rate = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    let grades = GRADES
        .iter()
        .map(|&grade| {
            let count = counted
                .iter()
                .filter(|note| note.grade.as_deref().is_some_and(|g| g.contains(grade)))
                .count();
            (grade, count)
        })
        .collect();

    let count = |pred: fn(NoteStatus) -> bool| notes.iter().filter(|n| pred(n.status())).count();
    let summary = NoteSummary {
        counted: counted.len(),
        average_rate,
        open: count(NoteStatus::is_open),
        current: count(NoteStatus::is_current),
        late: count(NoteStatus::is_late),
        closed: count(|status| !status.is_open()),
        in_review: count(|status| !status.is_issued()),
        include_closed,
        grades,
    };
    info!(
        "{} note(s) owned, {} open, {} late",
        notes.len(),
        summary.open,
        summary.late
    );
    summary
}

/// Notes that are no longer current
pub fn late_notes(notes: &[OwnedNote]) -> Vec<&OwnedNote> {
    let late: Vec<&OwnedNote> = notes.iter().filter(|note| note.status().is_late()).collect();
    info!("{} late note(s)", late.len());
    late
}

/// Parse the detailed notes response `{"myNotes": [...]}` or a bare array.
/// A null `myNotes` means the account holds no notes.
pub fn parse_notes(raw: &str) -> Result<Vec<OwnedNote>, SourceError> {
    let value: Value = serde_json::from_str(raw)?;
    let items: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("myNotes") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) => &[],
            _ => return Err(SourceError::Shape("missing 'myNotes' array".to_string())),
        },
        other => {
            return Err(SourceError::Shape(format!(
                "expected an object or array, found {}",
                source::json_type(other)
            )));
        }
    };

    let mut notes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(SourceError::Shape(format!(
                "note #{index} must be an object, found {}",
                source::json_type(item)
            )));
        }
        notes.push(OwnedNote::deserialize(item)?);
    }
    debug!("Parsed {} owned note(s)", notes.len());
    Ok(notes)
}

pub fn load_notes(path: &Path) -> Result<Vec<OwnedNote>, SourceError> {
    let raw = source::read(path)?;
    parse_notes(&raw)
}
