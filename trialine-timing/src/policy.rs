use rand::Rng;
use serde::{Deserialize, Serialize};
use trialine_core::RangeError;

/// Produces the post-trial gap for the trial instance about to be delayed.
///
/// Called once per instance, immediately before its delay is applied. The
/// randomness source is passed in so that sessions stay reproducible.
pub trait TimingPolicy {
    fn next_delay<R: Rng>(&self, rng: &mut R) -> u64;
}

/// Uniform integer gap in `[min_ms, max_ms]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u64, u64)", into = "(u64, u64)")]
pub struct UniformGap {
    min_ms: u64,
    max_ms: u64,
}

impl UniformGap {
    pub const DEFAULT_MIN_MS: u64 = 1000;
    pub const DEFAULT_MAX_MS: u64 = 2999;

    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, RangeError> {
        if min_ms > max_ms {
            return Err(RangeError { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    pub fn contains(&self, ms: u64) -> bool {
        (self.min_ms..=self.max_ms).contains(&ms)
    }
}

impl Default for UniformGap {
    /// 1000..=2999 ms: `floor(random * 2000) + 1000`.
    fn default() -> Self {
        Self {
            min_ms: Self::DEFAULT_MIN_MS,
            max_ms: Self::DEFAULT_MAX_MS,
        }
    }
}

impl TryFrom<(u64, u64)> for UniformGap {
    type Error = RangeError;

    fn try_from((min_ms, max_ms): (u64, u64)) -> Result<Self, Self::Error> {
        Self::new(min_ms, max_ms)
    }
}

impl From<UniformGap> for (u64, u64) {
    fn from(gap: UniformGap) -> Self {
        (gap.min_ms, gap.max_ms)
    }
}

impl TimingPolicy for UniformGap {
    fn next_delay<R: Rng>(&self, rng: &mut R) -> u64 {
        rng.random_range(self.min_ms..=self.max_ms)
    }
}

/// Same gap every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedGap(pub u64);

impl TimingPolicy for FixedGap {
    fn next_delay<R: Rng>(&self, _rng: &mut R) -> u64 {
        self.0
    }
}
