//! Datasets and batching
//!
//! Knowledge-probing examples, an ordered dataset over them, and
//! just-in-time batch encoding through the active codec.

mod batch;
mod dataset;
mod example;

pub use batch::Batch;
pub use dataset::Dataset;
pub use example::Example;

/// Label value masked out of the loss (padding positions)
pub const IGNORE_INDEX: i64 = -100;
