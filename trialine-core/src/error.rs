//! Error taxonomy shared by the timeline crates.

use crate::{BlockKind, TrialInstance};
use thiserror::Error;

/// Invalid block definitions, detected when a timeline is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("block {index} ({kind}) has zero repetitions")]
    ZeroRepetitions { index: usize, kind: BlockKind },

    /// Trial blocks advance on a response; dismiss keys would add a second
    /// advance condition.
    #[error("trial block {index} declares dismiss keys but advances on response")]
    AmbiguousAdvance { index: usize },

    #[error("trial block {index} has neither response choices nor a timeout")]
    NoAdvanceCondition { index: usize },

    #[error("trial block {index} uses a fixed post-trial delay; trials draw from the timing policy")]
    FixedTrialDelay { index: usize },

    #[error("reset block {index} must use a fixed delay")]
    PolicyDelayOnReset { index: usize },

    #[error("reset block {index} repeats {repetitions} times; it runs once per session")]
    RepeatedReset { index: usize, repetitions: u32 },

    #[error("reset block {index} duplicates the reset at block {first}")]
    DuplicateReset { first: usize, index: usize },

    #[error("reset block {index} has no trial block before it")]
    ResetBeforeTrials { index: usize },

    #[error("reset block {index} has no trial block after it")]
    ResetAfterTrials { index: usize },
}

/// Invalid timing bounds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid timing range: min {min_ms} ms exceeds max {max_ms} ms")]
pub struct RangeError {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// The recorder was driven out of the expected order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencingViolation {
    #[error("{attempted} completed after {last}; each trial completes once, in order")]
    OutOfOrder {
        last: TrialInstance,
        attempted: TrialInstance,
    },

    #[error("{instance} is a {kind} block, not a trial")]
    NotATrial {
        instance: TrialInstance,
        kind: BlockKind,
    },

    #[error("reset already ran in this session")]
    AlreadyReset,
}

/// A downstream sink refused a record.
#[derive(Error, Debug)]
#[error("record sink failed: {message}")]
pub struct SinkError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Any failure surfaced while building or running a timeline.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("range error: {0}")]
    Range(#[from] RangeError),

    #[error("sequencing violation: {0}")]
    Sequencing(#[from] SequencingViolation),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
