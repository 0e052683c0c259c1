/// Run configuration.
pub mod options;
/// The `compose` entry point and frame plan.
pub mod orchestrator;
/// Wall-clock frame pacing.
pub mod pacing;
/// Progress notifications.
pub mod progress;

pub use options::{ComposeOptions, Pacing};
pub use orchestrator::{CompositionPlan, compose};
pub use progress::{NoProgress, ProgressReporter, ProgressUpdate, Status};
