//! Replay buffer for rehearsal against catastrophic forgetting
//!
//! A bounded FIFO memory of past examples, refreshed once per round
//! from a stratified sample of time-invariant relations. The first
//! refresh only seeds the buffer; later refreshes return the current
//! dataset augmented with a draw from memory.

use crate::data::{Dataset, Example};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Default buffer capacity
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Relations whose answers do not drift over time and are therefore
/// safe to rehearse across rounds (Wikidata property ids)
pub const TIME_INVARIANT_RELATIONS: [&str; 28] = [
    "P19", "P20", "P279", "P37", "P449", "P47", "P138", "P364", "P527", "P176", "P27", "P407",
    "P30", "P178", "P1376", "P131", "P1412", "P17", "P276", "P937", "P140", "P103", "P190",
    "P1001", "P495", "P36", "P740", "P361",
];

/// Bounded FIFO memory of past training examples
pub struct ReplayBuffer {
    buf: VecDeque<Example>,
    capacity: usize,
    mem_ratio: f64,
    rng: StdRng,
}

impl ReplayBuffer {
    /// Buffer with the default capacity and memory ratio, entropy-seeded
    #[must_use]
    pub fn new(mem_ratio: f64) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, mem_ratio)
    }

    /// Buffer with an explicit capacity, entropy-seeded
    #[must_use]
    pub fn with_capacity(capacity: usize, mem_ratio: f64) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            mem_ratio,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sampling for reproducible rounds
    #[must_use]
    pub fn with_seed(capacity: usize, mem_ratio: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::with_capacity(capacity, mem_ratio)
        }
    }

    /// Current number of buffered examples
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer holds no examples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of buffered examples
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refresh memory from `dataset` and build the round's training set
    ///
    /// Seeds the buffer with a `mem_ratio` sample of the dataset's
    /// time-invariant examples (FIFO eviction keeps size <= capacity).
    /// On the first-ever refresh the dataset is returned unchanged; on
    /// later refreshes it is concatenated with a without-replacement
    /// draw of `min(buffer_len, mem_ratio * dataset_len)` examples.
    pub fn refresh(&mut self, dataset: &Dataset) -> Dataset {
        let eligible = dataset.filter_by_relations(&TIME_INVARIANT_RELATIONS);
        let sample = self.sample_fraction(&eligible);

        let first_refresh = self.buf.is_empty();
        self.insert(sample);

        if first_refresh || self.buf.is_empty() {
            return dataset.clone();
        }

        let draw_len = self
            .buf
            .len()
            .min((self.mem_ratio * dataset.len() as f64) as usize);
        if draw_len == 0 {
            return dataset.clone();
        }

        let drawn: Vec<Example> = index::sample(&mut self.rng, self.buf.len(), draw_len)
            .into_iter()
            .map(|i| self.buf[i].clone())
            .collect();
        dataset.concat(&Dataset::new(drawn, dataset.codec()))
    }

    /// Append at the tail, evicting from the head past capacity
    fn insert(&mut self, examples: Vec<Example>) {
        for example in examples {
            if self.buf.len() == self.capacity {
                self.buf.pop_front();
            }
            self.buf.push_back(example);
        }
    }

    /// Random `mem_ratio` fraction of the slice, rounded to nearest
    fn sample_fraction(&mut self, examples: &[Example]) -> Vec<Example> {
        let k = ((examples.len() as f64) * self.mem_ratio).round() as usize;
        if k == 0 {
            return Vec::new();
        }
        index::sample(&mut self.rng, examples.len(), k)
            .into_iter()
            .map(|i| examples[i].clone())
            .collect()
    }

    /// Direct insertion, bypassing stratified sampling (tests, tooling)
    pub fn extend(&mut self, examples: impl IntoIterator<Item = Example>) {
        self.insert(examples.into_iter().collect());
    }

    #[cfg(test)]
    fn buffered(&self) -> impl Iterator<Item = &Example> {
        self.buf.iter()
    }
}

impl std::fmt::Debug for ReplayBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayBuffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("mem_ratio", &self.mem_ratio)
            .finish()
    }
}
