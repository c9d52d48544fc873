use tracing::{debug, info};
use trialine_core::{RecordedTrial, SequencingViolation, TrialInstance, TrialResult};

/// Per-session counters. Created at session start, dropped at session end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    current_trial_index: u64,
    last_gap_ms: Option<u64>,
    last_completed: Option<TrialInstance>,
    reset_done: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_trial_index(&self) -> u64 {
        self.current_trial_index
    }

    pub fn last_gap_ms(&self) -> Option<u64> {
        self.last_gap_ms
    }

    pub fn last_completed(&self) -> Option<TrialInstance> {
        self.last_completed
    }

    pub fn has_reset(&self) -> bool {
        self.reset_done
    }
}

/// Stamps `result` with `gap_ms` and the state's current trial number.
pub fn augment(result: TrialResult, state: &RunState, gap_ms: u64) -> RecordedTrial {
    RecordedTrial::new(result, gap_ms, state.current_trial_index)
}

/// Owns a session's [`RunState`] and is the only thing that mutates it.
#[derive(Debug, Clone, Default)]
pub struct TrialRecorder {
    state: RunState,
}

impl TrialRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Finalizes one trial: the returned record carries `gap_ms` and the
    /// pre-increment trial number, then the counter advances by one.
    ///
    /// Precondition: called exactly once per completed trial, in timeline
    /// order, before the next trial's gap is drawn. Repeated or earlier
    /// instances are rejected without touching the state.
    pub fn on_trial_complete(
        &mut self,
        result: TrialResult,
        gap_ms: u64,
    ) -> Result<RecordedTrial, SequencingViolation> {
        let attempted = result.instance;
        if !result.trial_type.is_trial() {
            return Err(SequencingViolation::NotATrial {
                instance: attempted,
                kind: result.trial_type,
            });
        }
        if let Some(last) = self.state.last_completed {
            if attempted <= last {
                return Err(SequencingViolation::OutOfOrder { last, attempted });
            }
        }

        let record = augment(result, &self.state, gap_ms);
        self.state.current_trial_index += 1;
        self.state.last_gap_ms = Some(gap_ms);
        self.state.last_completed = Some(attempted);

        debug!(
            instance = %attempted,
            trial_num = record.trial_number(),
            itt_ms = gap_ms,
            "trial recorded"
        );
        Ok(record)
    }

    /// Restarts trial numbering at zero. Runs once per session; the gap
    /// distribution is untouched.
    pub fn reset(&mut self) -> Result<(), SequencingViolation> {
        if self.state.reset_done {
            return Err(SequencingViolation::AlreadyReset);
        }
        info!(
            completed = self.state.current_trial_index,
            "resetting trial counter"
        );
        self.state.current_trial_index = 0;
        self.state.reset_done = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use trialine_core::{BlockKind, KeyCode};

    fn result(block: usize, repetition: u32) -> TrialResult {
        TrialResult {
            instance: TrialInstance::new(block, repetition),
            trial_type: BlockKind::Trial,
            key_press: Some(KeyCode::SPACE),
            rt_ms: Some(280),
            time_elapsed_ms: 0,
            data: Map::new(),
        }
    }

    #[test]
    fn first_trial_is_numbered_zero() {
        let mut recorder = TrialRecorder::new();
        let record = recorder.on_trial_complete(result(1, 0), 1234).unwrap();
        assert_eq!(record.trial_number(), 0);
        assert_eq!(record.inter_trial_interval_ms(), 1234);
        assert_eq!(recorder.state().current_trial_index(), 1);
        assert_eq!(recorder.state().last_gap_ms(), Some(1234));
    }

    #[test]
    fn each_completion_increments_by_one() {
        let mut recorder = TrialRecorder::new();
        for rep in 0..10 {
            let before = recorder.state().current_trial_index();
            let record = recorder.on_trial_complete(result(1, rep), 1000).unwrap();
            assert_eq!(record.trial_number(), before);
            assert_eq!(recorder.state().current_trial_index(), before + 1);
        }
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut recorder = TrialRecorder::new();
        for rep in 0..5 {
            recorder.on_trial_complete(result(1, rep), 1500).unwrap();
        }
        recorder.reset().unwrap();
        assert_eq!(recorder.state().current_trial_index(), 0);
        assert_eq!(recorder.state().last_gap_ms(), Some(1500));

        let record = recorder.on_trial_complete(result(3, 0), 2000).unwrap();
        assert_eq!(record.trial_number(), 0);
    }

    #[test]
    fn reset_on_fresh_state_is_zero() {
        let mut recorder = TrialRecorder::new();
        recorder.reset().unwrap();
        assert_eq!(recorder.state().current_trial_index(), 0);
    }

    #[test]
    fn second_reset_is_a_violation() {
        let mut recorder = TrialRecorder::new();
        recorder.reset().unwrap();
        assert_eq!(recorder.reset(), Err(SequencingViolation::AlreadyReset));
    }

    #[test]
    fn double_completion_is_rejected_without_counting() {
        let mut recorder = TrialRecorder::new();
        recorder.on_trial_complete(result(1, 0), 1000).unwrap();
        let err = recorder.on_trial_complete(result(1, 0), 1000).unwrap_err();
        assert_eq!(
            err,
            SequencingViolation::OutOfOrder {
                last: TrialInstance::new(1, 0),
                attempted: TrialInstance::new(1, 0)
            }
        );
        assert_eq!(recorder.state().current_trial_index(), 1);

        assert!(recorder.on_trial_complete(result(0, 4), 1000).is_err());
    }

    #[test]
    fn non_trial_results_are_rejected() {
        let mut recorder = TrialRecorder::new();
        let mut r = result(0, 0);
        r.trial_type = BlockKind::Message;
        assert!(matches!(
            recorder.on_trial_complete(r, 0),
            Err(SequencingViolation::NotATrial { .. })
        ));
        assert_eq!(recorder.state(), &RunState::new());
    }

    #[test]
    fn augment_is_pure() {
        let state = RunState::new();
        let a = augment(result(1, 0), &state, 1100);
        let b = augment(result(1, 0), &state, 1100);
        assert_eq!(a, b);
        assert_eq!(state.current_trial_index(), 0);
    }

    #[test]
    fn returned_records_do_not_change_later() {
        let mut recorder = TrialRecorder::new();
        let first = recorder.on_trial_complete(result(1, 0), 1111).unwrap();
        let snapshot = first.clone();
        recorder.on_trial_complete(result(1, 1), 2222).unwrap();
        recorder.reset().unwrap();
        recorder.on_trial_complete(result(3, 0), 1333).unwrap();
        assert_eq!(first, snapshot);
        assert_eq!(first.trial_number(), 0);
        assert_eq!(first.inter_trial_interval_ms(), 1111);
    }
}
