pub mod config;
pub mod host;
pub mod manifest;
pub mod recorder;
pub mod sequence;
pub mod session;
pub mod template;
pub mod timeline;
pub use config::{ConfigError, ExperimentConfig};
pub use host::{Host, Outcome, SimulatedParticipant};
pub use manifest::{ExperimentManifest, ManifestError, ManifestWarning};
pub use recorder::{RunState, TrialRecorder, augment};
pub use sequence::BlockSequence;
pub use session::{Session, SessionEvent, SessionSummary};
pub use timeline::{BlockInstance, Instances, Timeline};
