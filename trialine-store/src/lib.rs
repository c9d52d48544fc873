pub mod error;
pub mod sink;
pub mod store;
pub mod submission;

pub use error::StoreError;
pub use sink::{ForwardingSink, RunBuffer};
pub use store::{DataStore, InsertStatus, JsonlStore, MemoryStore, Row};
pub use submission::{SessionMetadata, Submission};
