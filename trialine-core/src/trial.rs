use crate::{BlockKind, KeyCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifies one repetition of one block in a timeline. Ordered in timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialInstance {
    pub block: usize,
    pub repetition: u32,
}

impl TrialInstance {
    pub fn new(block: usize, repetition: u32) -> Self {
        Self { block, repetition }
    }
}

impl fmt::Display for TrialInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} rep {}", self.block, self.repetition)
    }
}

/// Raw result the host produces for a single trial instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub instance: TrialInstance,
    pub trial_type: BlockKind,
    pub key_press: Option<KeyCode>,
    pub rt_ms: Option<u64>,
    /// Session time at which the trial was finalized.
    pub time_elapsed_ms: u64,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TrialResult {
    pub fn timed_out(&self) -> bool {
        self.key_press.is_none()
    }
}

/// A `TrialResult` stamped with the inter-trial interval and trial number.
///
/// Fields are only readable; once built the record is never changed again.
/// Serialized field names (`ITT`, `trial_num`) match what the analysis side
/// already expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTrial {
    #[serde(flatten)]
    result: TrialResult,
    #[serde(rename = "ITT")]
    inter_trial_interval_ms: u64,
    #[serde(rename = "trial_num")]
    trial_number: u64,
}

impl RecordedTrial {
    pub fn new(result: TrialResult, inter_trial_interval_ms: u64, trial_number: u64) -> Self {
        Self {
            result,
            inter_trial_interval_ms,
            trial_number,
        }
    }

    pub fn result(&self) -> &TrialResult {
        &self.result
    }

    pub fn instance(&self) -> TrialInstance {
        self.result.instance
    }

    pub fn inter_trial_interval_ms(&self) -> u64 {
        self.inter_trial_interval_ms
    }

    pub fn trial_number(&self) -> u64 {
        self.trial_number
    }
}
