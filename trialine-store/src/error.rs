use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid table name {0:?}")]
    InvalidTable(String),

    #[error("invalid column name {0:?}")]
    InvalidColumn(String),

    #[error("column {0:?} is reserved for the trial data")]
    ReservedColumn(String),

    #[error("trial data is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("trial data must be a JSON array of trials")]
    NotAnArray,

    #[error("failed to serialize trial data: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
