//! Round-based training orchestration
//!
//! - `RoundController`: epoch/step loop for one round at a time
//! - `TrainingState`: monotonic counters and metric history
//! - `WorkerContext`: metric reduction across data-parallel workers

mod context;
mod round;
mod state;

pub use context::{LocalContext, WorkerContext};
pub use round::{RoundController, RoundReport, StepMetrics};
pub use state::TrainingState;
