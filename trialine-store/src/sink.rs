use crate::{DataStore, SessionMetadata, StoreError, Submission};
use trialine_core::{RecordSink, RecordedTrial, SinkError};

/// Collects a whole run in memory; submitted as one blob at the end.
#[derive(Debug, Clone, Default)]
pub struct RunBuffer {
    records: Vec<RecordedTrial>,
}

impl RunBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RecordedTrial] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_submission(
        self,
        table: impl Into<String>,
        metadata: &SessionMetadata,
    ) -> Result<Submission, StoreError> {
        Submission::from_run(table, metadata, &self.records)
    }
}

impl RecordSink for RunBuffer {
    fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }
}

/// Inserts each record into a store as soon as it is finalized.
#[derive(Debug)]
pub struct ForwardingSink<D: DataStore> {
    store: D,
    table: String,
    metadata: SessionMetadata,
    forwarded: usize,
}

impl<D: DataStore> ForwardingSink<D> {
    pub fn new(store: D, table: impl Into<String>, metadata: SessionMetadata) -> Self {
        Self {
            store,
            table: table.into(),
            metadata,
            forwarded: 0,
        }
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn into_store(self) -> D {
        self.store
    }
}

impl<D: DataStore> RecordSink for ForwardingSink<D> {
    fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError> {
        let submission = Submission::per_trial(self.table.as_str(), &self.metadata, &record)
            .map_err(|e| SinkError::with_source("could not encode trial", e))?;
        self.store
            .insert(&submission)
            .map_err(|e| SinkError::with_source(format!("insert into {} failed", self.table), e))?;
        self.forwarded += 1;
        Ok(())
    }
}
