use crate::{RecordedTrial, SinkError};

/// Downstream consumer of finalized trial records.
///
/// The sink takes ownership; records are append-only from here on.
pub trait RecordSink {
    fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError>;
}

impl RecordSink for Vec<RecordedTrial> {
    fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn accept(&mut self, record: RecordedTrial) -> Result<(), SinkError> {
        (**self).accept(record)
    }
}
