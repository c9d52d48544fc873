use crate::host::{Host, Outcome};
use crate::recorder::{RunState, TrialRecorder};
use crate::timeline::{BlockInstance, Timeline};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};
use trialine_core::{
    BlockKind, PostTrialDelay, RecordSink, TimelineError, TrialInstance, TrialResult,
};
use trialine_timing::{Timer, TimingPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BlockShown {
        instance: TrialInstance,
        kind: BlockKind,
        outcome: Outcome,
    },
    TrialRecorded {
        instance: TrialInstance,
        trial_number: u64,
        gap_ms: u64,
    },
    CounterReset {
        instance: TrialInstance,
    },
    Finished {
        trials_recorded: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub trials_recorded: u64,
    pub elapsed_ms: u64,
}

/// Drives one participant through a timeline, one block instance per `step`.
///
/// Owns the session's [`TrialRecorder`]; nothing is shared with other sessions.
pub struct Session<P, T, R, H, S>
where
    P: TimingPolicy,
    T: Timer,
    R: Rng,
    H: Host,
    S: RecordSink,
{
    timeline: Timeline,
    policy: P,
    timer: T,
    rng: R,
    host: H,
    sink: S,
    recorder: TrialRecorder,
    cursor: Option<TrialInstance>,
    trials_recorded: u64,
    started_ms: u64,
    finished: bool,
}

impl<P, T, R, H, S> Session<P, T, R, H, S>
where
    P: TimingPolicy,
    T: Timer,
    R: Rng,
    H: Host,
    S: RecordSink,
{
    pub fn new(timeline: Timeline, policy: P, timer: T, rng: R, host: H, sink: S) -> Self {
        let cursor = timeline.instances().next().map(|i| i.instance());
        let started_ms = timer.now_ms();
        Self {
            timeline,
            policy,
            timer,
            rng,
            host,
            sink,
            recorder: TrialRecorder::new(),
            cursor,
            trials_recorded: 0,
            started_ms,
            finished: false,
        }
    }

    /// Runs the next block instance. Returns `Finished` once after the last
    /// instance, then `None`.
    pub fn step(&mut self) -> Result<Option<SessionEvent>, TimelineError> {
        let timeline = self.timeline.clone();
        let Some(shown) = self.cursor.and_then(|at| timeline.get(at)) else {
            if self.finished {
                return Ok(None);
            }
            self.finished = true;
            info!(
                trials = self.trials_recorded,
                counter_reset = self.recorder.state().has_reset(),
                elapsed_ms = self.timer.elapsed_ms(self.started_ms),
                "session finished"
            );
            return Ok(Some(SessionEvent::Finished {
                trials_recorded: self.trials_recorded,
            }));
        };

        let event = match shown.block.kind {
            BlockKind::Trial => self.run_trial(&shown)?,
            BlockKind::Reset => {
                self.recorder.reset()?;
                let delay_ms = self.resolve_delay(shown.block.post_trial_delay);
                self.timer.sleep(Duration::from_millis(delay_ms));
                SessionEvent::CounterReset {
                    instance: shown.instance(),
                }
            }
            BlockKind::Message | BlockKind::Instructions => {
                let outcome = self.host.present(&shown, &mut self.timer);
                debug!(
                    instance = %shown.instance(),
                    kind = %shown.block.kind,
                    content = %shown.block.content.describe(),
                    ?outcome,
                    "block shown"
                );
                let delay_ms = self.resolve_delay(shown.block.post_trial_delay);
                self.timer.sleep(Duration::from_millis(delay_ms));
                SessionEvent::BlockShown {
                    instance: shown.instance(),
                    kind: shown.block.kind,
                    outcome,
                }
            }
        };

        self.cursor = timeline.successor(shown.instance());
        Ok(Some(event))
    }

    /// Steps until the timeline is exhausted.
    pub fn run(&mut self) -> Result<SessionSummary, TimelineError> {
        while let Some(event) = self.step()? {
            if let SessionEvent::Finished { trials_recorded } = event {
                return Ok(SessionSummary {
                    trials_recorded,
                    elapsed_ms: self.timer.elapsed_ms(self.started_ms),
                });
            }
        }
        Ok(SessionSummary {
            trials_recorded: self.trials_recorded,
            elapsed_ms: self.timer.elapsed_ms(self.started_ms),
        })
    }

    fn run_trial(&mut self, shown: &BlockInstance<'_>) -> Result<SessionEvent, TimelineError> {
        let started_ms = self.timer.now_ms();
        let outcome = self.host.present(shown, &mut self.timer);
        let (key_press, rt_ms) = match outcome {
            Outcome::Responded { key, rt_ms } => (Some(key), Some(rt_ms)),
            Outcome::TimedOut => (None, None),
            Outcome::Advanced { key } => (key, Some(self.timer.elapsed_ms(started_ms))),
        };

        let result = TrialResult {
            instance: shown.instance(),
            trial_type: shown.block.kind,
            key_press,
            rt_ms,
            time_elapsed_ms: self.timer.elapsed_ms(self.started_ms),
            data: shown.block.data.clone(),
        };

        // Drawn only now that the trial is final, right before it is applied
        let gap_ms = self.resolve_delay(shown.block.post_trial_delay);
        let record = self.recorder.on_trial_complete(result, gap_ms)?;
        let trial_number = record.trial_number();

        // The trial is final once recorded; move on even if the sink refuses it
        self.cursor = self.timeline.successor(shown.instance());
        self.trials_recorded += 1;
        self.sink.accept(record)?;

        self.timer.sleep(Duration::from_millis(gap_ms));

        Ok(SessionEvent::TrialRecorded {
            instance: shown.instance(),
            trial_number,
            gap_ms,
        })
    }

    fn resolve_delay(&mut self, delay: PostTrialDelay) -> u64 {
        match delay {
            PostTrialDelay::Fixed(ms) => ms,
            PostTrialDelay::Policy => self.policy.next_delay(&mut self.rng),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn run_state(&self) -> &RunState {
        self.recorder.state()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Ends the session, dropping its run state, and hands back the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockSequence;
    use crate::host::SimulatedParticipant;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use trialine_core::{Block, KeyCode, RecordedTrial, SequencingViolation, SinkError};
    use trialine_timing::{FixedGap, ManualTimer, UniformGap};

    fn timeline() -> Timeline {
        BlockSequence::new()
            .push(
                Block::message("welcome")
                    .with_dismiss_keys([KeyCode::ENTER])
                    .with_delay(PostTrialDelay::Fixed(0)),
            )
            .push(Block::trial("X", 2).with_choices([KeyCode::SPACE]))
            .push(Block::reset())
            .push(
                Block::trial("X", 3)
                    .with_choices([KeyCode::SPACE])
                    .with_data("trial_id", "test"),
            )
            .build()
            .unwrap()
    }

    fn participant() -> SimulatedParticipant<StdRng> {
        SimulatedParticipant::new(StdRng::seed_from_u64(11))
    }

    #[test]
    fn steps_emit_events_in_order() {
        let mut session = Session::new(
            timeline(),
            FixedGap(1000),
            ManualTimer::new(),
            StdRng::seed_from_u64(1),
            participant(),
            Vec::<RecordedTrial>::new(),
        );

        let mut events = Vec::new();
        while let Some(event) = session.step().unwrap() {
            events.push(event);
        }

        assert!(matches!(events[0], SessionEvent::BlockShown { .. }));
        assert!(matches!(
            events[1],
            SessionEvent::TrialRecorded { trial_number: 0, gap_ms: 1000, .. }
        ));
        assert!(matches!(events[2], SessionEvent::TrialRecorded { trial_number: 1, .. }));
        assert!(matches!(events[3], SessionEvent::CounterReset { .. }));
        assert!(matches!(events[4], SessionEvent::TrialRecorded { trial_number: 0, .. }));
        assert_eq!(events.last(), Some(&SessionEvent::Finished { trials_recorded: 5 }));
        assert_eq!(events.len(), 8);
        assert!(session.is_finished());
        assert_eq!(session.step().unwrap(), None);
    }

    #[test]
    fn gaps_are_slept_after_each_trial() {
        let mut session = Session::new(
            timeline(),
            UniformGap::default(),
            ManualTimer::new(),
            StdRng::seed_from_u64(5),
            participant(),
            Vec::<RecordedTrial>::new(),
        );
        session.run().unwrap();

        let gaps: Vec<Duration> = session
            .sink()
            .iter()
            .map(|r| Duration::from_millis(r.inter_trial_interval_ms()))
            .collect();
        let slept = session.timer().sleeps();
        for gap in &gaps {
            assert!(slept.contains(gap));
        }
        assert!(session.sink().iter().all(|r| (1000..=2999).contains(&r.inter_trial_interval_ms())));
    }

    #[test]
    fn block_data_is_copied_into_results() {
        let mut session = Session::new(
            timeline(),
            FixedGap(1000),
            ManualTimer::new(),
            StdRng::seed_from_u64(1),
            participant(),
            Vec::<RecordedTrial>::new(),
        );
        session.run().unwrap();
        let records = session.into_sink();
        assert!(records[..2].iter().all(|r| r.result().data.is_empty()));
        assert!(records[2..].iter().all(|r| r.result().data["trial_id"] == "test"));
    }

    #[test]
    fn run_state_is_per_session() {
        let make = || {
            Session::new(
                timeline(),
                FixedGap(1000),
                ManualTimer::new(),
                StdRng::seed_from_u64(1),
                participant(),
                Vec::<RecordedTrial>::new(),
            )
        };
        let mut a = make();
        let mut b = make();
        a.run().unwrap();
        assert_eq!(a.run_state().current_trial_index(), 3);
        assert!(a.run_state().has_reset());
        assert!(!b.run_state().has_reset());
        assert_eq!(b.run_state().current_trial_index(), 0);
        b.step().unwrap();
        b.step().unwrap();
        assert_eq!(b.run_state().current_trial_index(), 1);
    }

    struct Refusing;

    impl RecordSink for Refusing {
        fn accept(&mut self, _record: RecordedTrial) -> Result<(), SinkError> {
            Err(SinkError::new("storage unavailable"))
        }
    }

    #[test]
    fn sink_failures_surface_to_the_caller() {
        let mut session = Session::new(
            timeline(),
            FixedGap(1000),
            ManualTimer::new(),
            StdRng::seed_from_u64(1),
            participant(),
            Refusing,
        );
        let err = session.run().unwrap_err();
        assert!(matches!(err, TimelineError::Sink(_)));
    }

    struct FailsOnce {
        failed: bool,
        delivered: Vec<RecordedTrial>,
    }

    impl RecordSink for FailsOnce {
        fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError> {
            if !self.failed {
                self.failed = true;
                return Err(SinkError::new("transient outage"));
            }
            self.delivered.push(record);
            Ok(())
        }
    }

    #[test]
    fn session_moves_past_a_refused_record() {
        let timeline = BlockSequence::new()
            .push(Block::trial("X", 3).with_choices([KeyCode::SPACE]))
            .build()
            .unwrap();
        let mut session = Session::new(
            timeline,
            FixedGap(1000),
            ManualTimer::new(),
            StdRng::seed_from_u64(1),
            participant(),
            FailsOnce {
                failed: false,
                delivered: Vec::new(),
            },
        );

        assert!(matches!(session.step(), Err(TimelineError::Sink(_))));
        assert_eq!(session.run_state().current_trial_index(), 1);

        let summary = session.run().unwrap();
        assert_eq!(summary.trials_recorded, 3);
        assert!(session.is_finished());

        let numbers: Vec<u64> = session
            .sink()
            .delivered
            .iter()
            .map(|r| r.trial_number())
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn sequencing_errors_are_distinguishable() {
        let err: TimelineError = SequencingViolation::AlreadyReset.into();
        assert!(matches!(err, TimelineError::Sequencing(SequencingViolation::AlreadyReset)));
    }
}
