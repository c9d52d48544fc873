pub mod block;
pub mod content;
pub mod error;
pub mod key;
pub mod sink;
pub mod trial;

pub use block::{Block, BlockKind, PostTrialDelay};
pub use content::Content;
pub use error::{ConfigurationError, RangeError, SequencingViolation, SinkError, TimelineError};
pub use key::KeyCode;
pub use sink::RecordSink;
pub use trial::{RecordedTrial, TrialInstance, TrialResult};
