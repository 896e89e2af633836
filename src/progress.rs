// src/progress.rs
use crate::errors::TaskError;

/// Lightweight progress reporting used by the runner.
/// Frontends implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the total number of tasks.
    fn begin(&mut self, _total: usize) {}

    /// A task finished and its rows were accepted.
    fn task_done(&mut self, _name: &str, _rows: usize) {}

    /// A task's contribution was dropped.
    fn task_failed(&mut self, _name: &str, _err: &TaskError) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// Progress through the log macros, with a running `n/total` count.
#[derive(Default)]
pub struct LogProgress {
    total: usize,
    seen: usize,
}

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.seen = 0;
        logf!("Running {total} tasks");
    }

    fn task_done(&mut self, name: &str, rows: usize) {
        self.seen += 1;
        logd!("[{}/{}] {name}: {rows} rows", self.seen, self.total);
    }

    fn task_failed(&mut self, name: &str, err: &TaskError) {
        self.seen += 1;
        logd!("[{}/{}] {name} dropped ({:?})", self.seen, self.total, err.kind());
    }

    fn finish(&mut self) {
        logd!("Finished {} of {} tasks", self.seen, self.total);
    }
}
