//! Optimizers over parameter groups
//!
//! - `groups`: decay/no-decay and backbone-namespace partitioning
//! - `Adafactor`: memory-efficient adaptive optimizer (standard path)
//! - `RecAdam`: Adam with an annealed pull toward pretrained anchors
//! - `OneCycleLR`: single-cycle linear learning rate schedule

mod adafactor;
mod groups;
mod one_cycle;
mod recadam;

pub use adafactor::Adafactor;
pub use groups::{anchored_groups, standard_groups, ParamGroup, NO_DECAY_PATTERNS};
pub use one_cycle::OneCycleLR;
pub use recadam::{
    RecAdam, DEFAULT_ANNEAL_K, DEFAULT_ANNEAL_T0, DEFAULT_ANNEAL_W, DEFAULT_PRETRAIN_COF,
};

/// Optimization algorithm over its parameter groups
pub trait Optimizer: std::fmt::Debug {
    /// Perform a single optimization step over all groups
    fn step(&mut self);

    /// Clear gradients on every grouped parameter
    fn zero_grad(&mut self);

    /// Get the learning rate
    fn lr(&self) -> f32;

    /// Set the learning rate
    fn set_lr(&mut self, lr: f32);
}

/// Learning rate schedule stepped once per optimizer step
pub trait LRScheduler {
    /// Learning rate at the current step
    fn get_lr(&self) -> f32;

    /// Advance one step
    fn step(&mut self);

    /// Push the current learning rate into an optimizer
    fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
    }
}
