use crate::model::JobStatus;

/// A persisted change in a run's state.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Status, progress or step label changed.
    Stage {
        job_id: String,
        status: JobStatus,
        progress: i64,
        step: String,
    },
    /// The run ended; `status` is terminal unless the run was cancelled
    /// and superseded.
    Finished {
        job_id: String,
        status: JobStatus,
        error: Option<String>,
    },
}

impl ProgressEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ProgressEvent::Stage { job_id, .. } | ProgressEvent::Finished { job_id, .. } => job_id,
        }
    }
}

/// Observer of run progress. Called after the change is persisted.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Discards all events.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: &ProgressEvent) {}
}
