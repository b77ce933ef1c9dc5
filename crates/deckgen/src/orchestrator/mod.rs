//! Generation lifecycle: background runs, their registry and progress.

mod error;
mod progress;
mod registry;
mod service;

pub use error::GenerationError;
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter};
pub use registry::{JobRegistry, Ticket};
pub use service::{
    GenerationService, GenerationStatus, NewPresentation, ServiceSettings, CANCELLED_MESSAGE,
};
