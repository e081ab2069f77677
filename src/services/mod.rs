pub mod detector;
pub mod driver;
pub mod progress;
pub mod warn_writer;

pub use detector::{Capture, CompletionDetector, DetectorState, LivePageObserver, PageObserver};
pub use driver::{InteractionDriver, SubmissionReceipt};
pub use progress::{spawn_progress_logger, ProgressEvent, ProgressSender};
pub use warn_writer::WarnWriter;
