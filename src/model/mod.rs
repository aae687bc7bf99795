//! Model capability boundary
//!
//! The harness never looks inside a model: anything that can run a
//! forward pass, generate constrained text and expose its named
//! parameters is trainable. Architecture variants are produced by a
//! factory registry keyed on the configured method.

mod registry;
mod stub;

pub use registry::{apply_freeze_policy, ModelFactory, ModelRegistry};
pub use stub::StubModel;

use crate::data::Batch;
use crate::tensor::Tensor;
use ndarray::Array2;

/// Output of a forward (plus backward) pass
pub struct ForwardOutput {
    /// Scalar training loss for the batch
    pub loss: f32,
    /// Per-position logits `[batch * tgt_len, vocab]`, row-aligned with
    /// the flattened label block
    pub logits: Array2<f32>,
}

/// Constraints for the generation step
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Maximum generated length in tokens
    pub max_length: usize,
    /// Beam width
    pub num_beams: usize,
    /// Stop beams early once finished
    pub early_stopping: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        // validation-time constraints for short answer probes
        Self {
            max_length: 10,
            num_beams: 2,
            early_stopping: true,
        }
    }
}

/// A trainable sequence-to-sequence model
///
/// `forward` is expected to run the full forward/backward computation
/// synchronously: it returns the loss and logits and accumulates
/// gradients into every parameter with `requires_grad` set, so
/// successive calls sum their contributions until the optimizer clears
/// them. Label positions equal to [`crate::data::IGNORE_INDEX`] are
/// masked from the loss.
pub trait Seq2SeqModel: std::fmt::Debug {
    /// Forward/backward pass over one batch
    fn forward(&mut self, batch: &Batch, labels: &Array2<i64>) -> ForwardOutput;

    /// Constrained generation, one id sequence per batch row
    fn generate(&self, batch: &Batch, options: &GenerateOptions) -> Vec<Vec<i64>>;

    /// All parameters
    fn parameters(&self) -> Vec<Tensor>;

    /// All parameters with their names
    fn named_parameters(&self) -> Vec<(String, Tensor)>;

    /// Parameters belonging to the encoder
    fn encoder_parameters(&self) -> Vec<Tensor>;

    /// Namespace tag of the core architecture (used for group partitioning)
    fn backbone(&self) -> &str;

    /// Independent deep copy of the model and its weights
    fn snapshot(&self) -> Box<dyn Seq2SeqModel>;

    /// Shallow copy sharing parameter storage with `self`
    ///
    /// Weight updates through either copy are visible in both. Used to
    /// keep a handle on a model whose ownership moves elsewhere.
    fn alias(&self) -> Box<dyn Seq2SeqModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_options_defaults() {
        let options = GenerateOptions::default();
        assert_eq!(options.max_length, 10);
        assert_eq!(options.num_beams, 2);
        assert!(options.early_stopping);
    }
}
