use crate::StoreError;
use crate::submission::{DATA_COLUMN, Submission};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One stored row: the data column plus metadata columns.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    Inserted,
}

impl fmt::Display for InsertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertStatus::Inserted => f.write_str("Successful insert!"),
        }
    }
}

/// Append-only storage keyed by table name.
///
/// Implementations validate the submission first and report malformed input
/// as an error; nothing is retried or buffered.
pub trait DataStore {
    fn insert(&mut self, submission: &Submission) -> Result<InsertStatus, StoreError>;
}

impl<D: DataStore + ?Sized> DataStore for &mut D {
    fn insert(&mut self, submission: &Submission) -> Result<InsertStatus, StoreError> {
        (**self).insert(submission)
    }
}

fn to_row(submission: &Submission) -> Row {
    let mut row = Row::new();
    row.insert(DATA_COLUMN.to_string(), Value::String(submission.json.clone()));
    for (column, value) in &submission.opt_data {
        row.insert(column.clone(), Value::String(value.clone()));
    }
    row
}

/// Keeps rows in memory, per table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }
}

impl DataStore for MemoryStore {
    fn insert(&mut self, submission: &Submission) -> Result<InsertStatus, StoreError> {
        submission.validate()?;
        self.tables
            .entry(submission.table.clone())
            .or_default()
            .push(to_row(submission));
        Ok(InsertStatus::Inserted)
    }
}

/// Appends one JSON line per insert to `<dir>/<table>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads back every row of `table`; a table never written to is empty.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let path = self.table_path(table);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(serde_json::from_str(&line).map_err(StoreError::MalformedJson)?);
        }
        Ok(rows)
    }
}

impl DataStore for JsonlStore {
    fn insert(&mut self, submission: &Submission) -> Result<InsertStatus, StoreError> {
        submission.validate()?;
        let path = self.table_path(&submission.table);
        let line = serde_json::to_string(&to_row(submission)).map_err(StoreError::Serialize)?;

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)?;

        info!(
            table = %submission.table,
            trials = submission.trial_count().unwrap_or_default(),
            "submission stored"
        );
        Ok(InsertStatus::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionMetadata;
    use tempfile::TempDir;
    use trialine_core::{BlockKind, KeyCode, RecordedTrial, TrialInstance, TrialResult};

    fn record(rep: u32) -> RecordedTrial {
        let result = TrialResult {
            instance: TrialInstance::new(1, rep),
            trial_type: BlockKind::Trial,
            key_press: Some(KeyCode::SPACE),
            rt_ms: Some(250),
            time_elapsed_ms: 1000,
            data: Map::new(),
        };
        RecordedTrial::new(result, 1500, u64::from(rep))
    }

    fn submission() -> Submission {
        let meta = SessionMetadata::new("simple_rt", "s07");
        Submission::from_run("rt_data", &meta, &[record(0), record(1)]).unwrap()
    }

    #[test]
    fn memory_store_appends_rows() {
        let mut store = MemoryStore::new();
        assert_eq!(store.insert(&submission()).unwrap(), InsertStatus::Inserted);
        store.insert(&submission()).unwrap();
        assert_eq!(store.rows("rt_data").len(), 2);
        assert!(store.rows("other").is_empty());
        assert_eq!(store.rows("rt_data")[0]["subject_id"], "s07");
    }

    #[test]
    fn jsonl_store_round_trips_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::open(dir.path().join("data")).unwrap();
        store.insert(&submission()).unwrap();
        store.insert(&submission()).unwrap();

        let rows = store.rows("rt_data").unwrap();
        assert_eq!(rows.len(), 2);
        let trials: Vec<RecordedTrial> =
            serde_json::from_str(rows[1]["json"].as_str().unwrap()).unwrap();
        assert_eq!(trials, vec![record(0), record(1)]);
        assert_eq!(rows[1]["exp_id"], "simple_rt");
    }

    #[test]
    fn rejected_submission_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::open(dir.path()).unwrap();
        let mut bad = submission();
        bad.json = "not json".into();
        assert!(store.insert(&bad).is_err());
        assert!(store.rows("rt_data").unwrap().is_empty());
        assert!(!store.table_path("rt_data").exists());
    }

    #[test]
    fn status_reads_like_a_confirmation() {
        assert_eq!(InsertStatus::Inserted.to_string(), "Successful insert!");
    }
}
