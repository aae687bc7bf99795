//! Deterministic stand-in model
//!
//! Real architectures live behind the [`Seq2SeqModel`] boundary and are
//! supplied by the embedding application. `StubModel` implements the
//! full capability surface with a deterministic pseudo-loss (quadratic
//! in the parameters) and echo generation, so orchestration, freezing,
//! grouping and distillation can be exercised end to end.

use super::{ForwardOutput, GenerateOptions, Seq2SeqModel};
use crate::data::{Batch, IGNORE_INDEX};
use crate::tensor::Tensor;
use ndarray::Array2;

/// Parameter sizes for the stub's weight/bias tensors
const WEIGHT_LEN: usize = 8;
const BIAS_LEN: usize = 4;

/// Deterministic sequence-to-sequence stand-in
#[derive(Debug)]
pub struct StubModel {
    backbone: String,
    vocab_size: usize,
    params: Vec<(String, Tensor)>,
}

impl StubModel {
    /// Base model under the given architecture namespace
    pub fn new(backbone: impl Into<String>, vocab_size: usize) -> Self {
        let backbone = backbone.into();
        let names: [(String, usize); 9] = [
            (format!("{backbone}.encoder.embed.weight"), WEIGHT_LEN),
            (format!("{backbone}.encoder.attn.weight"), WEIGHT_LEN),
            (format!("{backbone}.encoder.attn.bias"), BIAS_LEN),
            (format!("{backbone}.encoder.layer_norm.weight"), BIAS_LEN),
            (format!("{backbone}.decoder.embed.weight"), WEIGHT_LEN),
            (format!("{backbone}.decoder.attn.bias"), BIAS_LEN),
            (format!("{backbone}.decoder.layer_norm.weight"), BIAS_LEN),
            ("lm_head.weight".to_string(), WEIGHT_LEN),
            ("lm_head.bias".to_string(), BIAS_LEN),
        ];
        let params = names
            .into_iter()
            .enumerate()
            .map(|(i, (name, len))| (name, seeded_tensor(i, len)))
            .collect();
        Self {
            backbone,
            vocab_size,
            params,
        }
    }

    /// Add an adapter block whose parameter names carry `tag`
    #[must_use]
    pub fn with_adapter(mut self, tag: &str) -> Self {
        let offset = self.params.len();
        self.params
            .push((format!("{tag}.down.weight"), seeded_tensor(offset, WEIGHT_LEN)));
        self.params.push((
            format!("{tag}.up.weight"),
            seeded_tensor(offset + 1, WEIGHT_LEN),
        ));
        self
    }

    fn trainable(&self) -> impl Iterator<Item = &Tensor> {
        self.params
            .iter()
            .map(|(_, t)| t)
            .filter(|t| t.requires_grad())
    }
}

/// Small deterministic initialization, distinct per parameter index
fn seeded_tensor(index: usize, len: usize) -> Tensor {
    let data: Vec<f32> = (0..len)
        .map(|j| ((index * 13 + j) as f32 * 0.37).sin() * 0.1)
        .collect();
    Tensor::from_vec(data, true)
}

impl Seq2SeqModel for StubModel {
    fn forward(&mut self, batch: &Batch, labels: &Array2<i64>) -> ForwardOutput {
        // Quadratic pseudo-loss over trainable parameters plus a small
        // data-dependent term; gradient of the quadratic part is the
        // parameter itself.
        let mut loss = 1e-3;
        for param in self.trainable() {
            let (term, grad) = {
                let data = param.data();
                let n = data.len().max(1) as f32;
                (0.5 * data.iter().map(|x| x * x).sum::<f32>() / n, &*data / n)
            };
            loss += term;
            param.accumulate_grad(&grad);
        }
        let id_sum: i64 = batch.source_ids.iter().map(|&id| id.abs()).sum();
        loss += (id_sum as f32 / batch.source_ids.len().max(1) as f32) * 1e-3;

        // Logits peak at the label so decoded predictions stay coherent;
        // a parameter-dependent bias makes distinct weights distinguishable.
        let positions = labels.len();
        let mut logits = Array2::zeros((positions, self.vocab_size));
        let bias = self.params[0].1.data()[0] * 0.01;
        for (row, &label) in labels.iter().enumerate() {
            logits[[row, 0]] = bias;
            if label != IGNORE_INDEX && (label as usize) < self.vocab_size {
                logits[[row, label as usize]] = 4.0;
            }
        }
        ForwardOutput { loss, logits }
    }

    fn generate(&self, batch: &Batch, options: &GenerateOptions) -> Vec<Vec<i64>> {
        // Echo generation: repeat the source ids up to the length cap.
        batch
            .source_rows()
            .into_iter()
            .map(|row| row.into_iter().take(options.max_length).collect())
            .collect()
    }

    fn parameters(&self) -> Vec<Tensor> {
        self.params.iter().map(|(_, t)| t.clone()).collect()
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        self.params.clone()
    }

    fn encoder_parameters(&self) -> Vec<Tensor> {
        self.params
            .iter()
            .filter(|(name, _)| name.contains("encoder"))
            .map(|(_, t)| t.clone())
            .collect()
    }

    fn backbone(&self) -> &str {
        &self.backbone
    }

    fn snapshot(&self) -> Box<dyn Seq2SeqModel> {
        Box::new(StubModel {
            backbone: self.backbone.clone(),
            vocab_size: self.vocab_size,
            params: self
                .params
                .iter()
                .map(|(name, t)| (name.clone(), t.detached()))
                .collect(),
        })
    }

    fn alias(&self) -> Box<dyn Seq2SeqModel> {
        Box::new(StubModel {
            backbone: self.backbone.clone(),
            vocab_size: self.vocab_size,
            params: self.params.clone(),
        })
    }
}
