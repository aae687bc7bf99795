//! Worker coordination boundary
//!
//! Data-parallel replication is driven externally; the harness only
//! needs metric reduction across workers and a primary-worker flag for
//! authoritative reporting. A single-process run uses [`LocalContext`].

/// Capabilities exposed by the external data-parallel driver
pub trait WorkerContext {
    /// Number of lockstep workers
    fn world_size(&self) -> usize;

    /// Whether this worker is the primary reporting worker
    fn is_primary(&self) -> bool;

    /// Gather a scalar metric from every worker
    fn all_gather(&self, value: f32) -> Vec<f32>;

    /// Mean of a scalar metric across workers
    fn reduce_mean(&self, value: f32) -> f32 {
        let gathered = self.all_gather(value);
        if gathered.is_empty() {
            value
        } else {
            gathered.iter().sum::<f32>() / gathered.len() as f32
        }
    }
}

/// Single-worker context: reductions are identities
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalContext;

impl WorkerContext for LocalContext {
    fn world_size(&self) -> usize {
        1
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn all_gather(&self, value: f32) -> Vec<f32> {
        vec![value]
    }
}
