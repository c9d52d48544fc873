pub mod policy;
pub mod timer;

pub use policy::{FixedGap, TimingPolicy, UniformGap};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
