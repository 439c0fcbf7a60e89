//! Receiver side of the monitoring batch protocol.

use c32_core::{FunctionId, TaskId};

use crate::io::IoValue;

/// Collects monitoring snapshots for one task run.
///
/// The runtime calls [`begin`](Self::begin) once per task run, then
/// [`report`](Self::report) for every armed block, then
/// [`finish`](Self::finish).
pub trait MonitoringSink {
    fn begin(&mut self, task: TaskId, max_items: usize);

    /// One block's snapshot: inputs as read, followed by outputs.
    fn report(&mut self, function: FunctionId, values: &[IoValue]);

    fn finish(&mut self);
}

/// Sink that keeps every reported snapshot. Used by tests and the CLI.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub batches: Vec<(TaskId, Vec<(FunctionId, Vec<IoValue>)>)>,
    open: Option<(TaskId, Vec<(FunctionId, Vec<IoValue>)>)>,
}

impl MonitoringSink for RecordingSink {
    fn begin(&mut self, task: TaskId, max_items: usize) {
        self.open = Some((task, Vec::with_capacity(max_items)));
    }

    fn report(&mut self, function: FunctionId, values: &[IoValue]) {
        if let Some((_, items)) = self.open.as_mut() {
            items.push((function, values.to_vec()));
        }
    }

    fn finish(&mut self) {
        if let Some(batch) = self.open.take() {
            if !batch.1.is_empty() {
                self.batches.push(batch);
            }
        }
    }
}
