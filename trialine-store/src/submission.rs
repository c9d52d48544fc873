use crate::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trialine_core::RecordedTrial;

/// Column that carries the serialized trials.
pub const DATA_COLUMN: &str = "json";

/// Fixed per-session fields stored next to the trial data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub exp_id: String,
    pub subject_id: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl SessionMetadata {
    pub fn new(exp_id: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            exp_id: exp_id.into(),
            subject_id: subject_id.into(),
            condition: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Flattens into the optional columns of a submission.
    pub fn opt_data(&self) -> BTreeMap<String, String> {
        let mut columns = self.extra.clone();
        columns.insert("exp_id".to_string(), self.exp_id.clone());
        columns.insert("subject_id".to_string(), self.subject_id.clone());
        if let Some(condition) = &self.condition {
            columns.insert("condition".to_string(), condition.clone());
        }
        columns
    }
}

/// One append-only insert: a JSON array of trials plus metadata columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub table: String,
    pub json: String,
    #[serde(default)]
    pub opt_data: BTreeMap<String, String>,
}

impl Submission {
    /// Whole run as a single blob.
    pub fn from_run(
        table: impl Into<String>,
        metadata: &SessionMetadata,
        records: &[RecordedTrial],
    ) -> Result<Self, StoreError> {
        let json = serde_json::to_string(records).map_err(StoreError::Serialize)?;
        Ok(Self {
            table: table.into(),
            json,
            opt_data: metadata.opt_data(),
        })
    }

    /// A single trial, wrapped in a one-element array.
    pub fn per_trial(
        table: impl Into<String>,
        metadata: &SessionMetadata,
        record: &RecordedTrial,
    ) -> Result<Self, StoreError> {
        Self::from_run(table, metadata, std::slice::from_ref(record))
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !is_identifier(&self.table) {
            return Err(StoreError::InvalidTable(self.table.clone()));
        }
        for column in self.opt_data.keys() {
            if column == DATA_COLUMN {
                return Err(StoreError::ReservedColumn(column.clone()));
            }
            if !is_identifier(column) {
                return Err(StoreError::InvalidColumn(column.clone()));
            }
        }
        match serde_json::from_str::<Value>(&self.json) {
            Ok(Value::Array(_)) => Ok(()),
            Ok(_) => Err(StoreError::NotAnArray),
            Err(e) => Err(StoreError::MalformedJson(e)),
        }
    }

    /// Number of trials in the payload, or `None` if it does not parse.
    pub fn trial_count(&self) -> Option<usize> {
        match serde_json::from_str::<Value>(&self.json).ok()? {
            Value::Array(trials) => Some(trials.len()),
            _ => None,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
