//! Ordered example collection with split and batching support

use super::{Batch, Example};
use crate::codec::Codec;
use rand::seq::SliceRandom;
use rand::Rng;
use std::rc::Rc;

/// An ordered sequence of examples bound to the active codec
#[derive(Clone)]
pub struct Dataset {
    examples: Vec<Example>,
    codec: Rc<dyn Codec>,
}

impl Dataset {
    /// Create a dataset over the given examples
    pub fn new(examples: Vec<Example>, codec: Rc<dyn Codec>) -> Self {
        Self { examples, codec }
    }

    /// Number of examples
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the dataset holds no examples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Borrow the examples
    #[must_use]
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Handle to the active codec
    #[must_use]
    pub fn codec(&self) -> Rc<dyn Codec> {
        Rc::clone(&self.codec)
    }

    /// Concatenate with another dataset (keeps this dataset's codec)
    #[must_use]
    pub fn concat(&self, other: &Dataset) -> Dataset {
        let mut examples = self.examples.clone();
        examples.extend_from_slice(&other.examples);
        Dataset::new(examples, Rc::clone(&self.codec))
    }

    /// Examples whose relation label is in the given set
    #[must_use]
    pub fn filter_by_relations(&self, relations: &[&str]) -> Vec<Example> {
        self.examples
            .iter()
            .filter(|e| relations.contains(&e.relation.as_str()))
            .cloned()
            .collect()
    }

    /// Random split into disjoint subsets covering the full set
    ///
    /// The first subset holds `round(ratio * len)` examples.
    pub fn random_split(&self, ratio: f64, rng: &mut impl Rng) -> (Dataset, Dataset) {
        let mut indices: Vec<usize> = (0..self.examples.len()).collect();
        indices.shuffle(rng);
        let n_first = ((self.examples.len() as f64) * ratio).round() as usize;
        let first: Vec<Example> = indices[..n_first]
            .iter()
            .map(|&i| self.examples[i].clone())
            .collect();
        let second: Vec<Example> = indices[n_first..]
            .iter()
            .map(|&i| self.examples[i].clone())
            .collect();
        (
            Dataset::new(first, Rc::clone(&self.codec)),
            Dataset::new(second, Rc::clone(&self.codec)),
        )
    }

    /// Shuffled fixed-size batches, dropping the trailing partial batch
    pub fn train_batches(&self, batch_size: usize, rng: &mut impl Rng) -> Vec<Batch> {
        let mut shuffled = self.examples.clone();
        shuffled.shuffle(rng);
        shuffled
            .chunks(batch_size.max(1))
            .filter(|chunk| chunk.len() == batch_size.max(1))
            .map(|chunk| Batch::from_examples(chunk, self.codec.as_ref()))
            .collect()
    }

    /// In-order batches, keeping the trailing partial batch
    #[must_use]
    pub fn val_batches(&self, batch_size: usize) -> Vec<Batch> {
        self.examples
            .chunks(batch_size.max(1))
            .map(|chunk| Batch::from_examples(chunk, self.codec.as_ref()))
            .collect()
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("len", &self.examples.len())
            .finish()
    }
}
