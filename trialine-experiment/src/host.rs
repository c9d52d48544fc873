use crate::timeline::BlockInstance;
use rand::Rng;
use std::time::Duration;
use trialine_core::{BlockKind, Content, KeyCode};
use trialine_timing::Timer;

/// How a presented block instance ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A message or instructions screen was left, with the key if one was needed.
    Advanced { key: Option<KeyCode> },
    Responded { key: KeyCode, rt_ms: u64 },
    TimedOut,
}

/// The runtime that renders blocks and collects input.
///
/// `present` returns once the instance is finished; time spent waiting on the
/// participant passes through `timer`.
pub trait Host {
    fn present<T: Timer>(&mut self, shown: &BlockInstance<'_>, timer: &mut T) -> Outcome;
}

/// Headless participant that answers with random reaction times.
#[derive(Debug, Clone)]
pub struct SimulatedParticipant<R: Rng> {
    pub rng: R,
    pub rt_range_ms: (u64, u64),
    pub reading_ms_per_page: u64,
    /// Probability of not answering a trial that has a timeout.
    pub miss_rate: f64,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            rt_range_ms: (200, 600),
            reading_ms_per_page: 1500,
            miss_rate: 0.0,
        }
    }

    /// Values outside `[0, 1]` are clamped; NaN counts as never missing.
    pub fn with_miss_rate(mut self, miss_rate: f64) -> Self {
        self.miss_rate = miss_rate;
        self.miss_rate = self.miss_probability();
        self
    }

    fn miss_probability(&self) -> f64 {
        if self.miss_rate.is_nan() {
            0.0
        } else {
            self.miss_rate.clamp(0.0, 1.0)
        }
    }

    fn reaction_time(&mut self) -> u64 {
        let (lo, hi) = self.rt_range_ms;
        self.rng.random_range(lo..=hi.max(lo))
    }
}

impl<R: Rng> Host for SimulatedParticipant<R> {
    fn present<T: Timer>(&mut self, shown: &BlockInstance<'_>, timer: &mut T) -> Outcome {
        let block = shown.block;
        match block.kind {
            BlockKind::Trial => {
                let misses = block.timeout_ms.is_some() && self.rng.random_bool(self.miss_probability());
                let rt_ms = self.reaction_time();
                let key = block.choices.iter().next().copied();
                match (key, block.timeout_ms) {
                    (Some(key), Some(timeout)) if !misses && rt_ms < timeout => {
                        timer.sleep(Duration::from_millis(rt_ms));
                        Outcome::Responded { key, rt_ms }
                    }
                    (Some(key), None) => {
                        timer.sleep(Duration::from_millis(rt_ms));
                        Outcome::Responded { key, rt_ms }
                    }
                    (_, timeout) => {
                        timer.sleep(Duration::from_millis(timeout.unwrap_or_default()));
                        Outcome::TimedOut
                    }
                }
            }
            BlockKind::Message | BlockKind::Instructions => {
                let pages = match &block.content {
                    Content::None => 1,
                    content => content.page_count() as u64,
                };
                timer.sleep(Duration::from_millis(self.reading_ms_per_page * pages));
                Outcome::Advanced {
                    key: block.dismiss_keys.iter().next().copied(),
                }
            }
            BlockKind::Reset => Outcome::Advanced { key: None },
        }
    }
}
