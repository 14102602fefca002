//! Service layer for I/O and progress reporting
//!
//! These services sit next to the orchestrator, not inside it: the core
//! never touches the filesystem or a terminal directly.

pub mod io;
pub mod progress;

pub use io::{InputLoader, InputPreview, OutputWriter, PREFERRED_EXTENSIONS};
#[cfg(feature = "cli")]
pub use progress::SpinnerStageReporter;
pub use progress::{
    LoggingStageReporter, NoOpStageReporter, StageReporter, StageTracker, StageUpdate,
};
