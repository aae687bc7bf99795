//! Single-cycle linear learning rate schedule
//!
//! Linear warmup from a reduced initial rate to the peak over the first
//! tenth of the run, then linear decay down to a small final rate for
//! the remainder. Steps past the configured total hold the final rate.

use super::LRScheduler;

const DIV_FACTOR: f32 = 25.0;
const FINAL_DIV_FACTOR: f32 = 1e4;
const PCT_START: f64 = 0.1;

/// One-cycle schedule with linear ramps
#[derive(Debug)]
pub struct OneCycleLR {
    max_lr: f32,
    initial_lr: f32,
    final_lr: f32,
    total_steps: u64,
    rise_steps: u64,
    t: u64,
}

impl OneCycleLR {
    /// Schedule peaking at `max_lr` over `total_steps` optimizer steps
    #[must_use]
    pub fn new(max_lr: f32, total_steps: u64) -> Self {
        let initial_lr = max_lr / DIV_FACTOR;
        let rise_steps = (total_steps as f64 * PCT_START).round() as u64;
        Self {
            max_lr,
            initial_lr,
            final_lr: initial_lr / FINAL_DIV_FACTOR,
            total_steps: total_steps.max(1),
            rise_steps: rise_steps.max(1),
            t: 0,
        }
    }

    /// Total steps in the cycle
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Steps taken so far
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    fn interpolate(from: f32, to: f32, frac: f32) -> f32 {
        from + (to - from) * frac
    }
}

impl LRScheduler for OneCycleLR {
    fn get_lr(&self) -> f32 {
        if self.t >= self.total_steps {
            return self.final_lr;
        }
        if self.t <= self.rise_steps {
            let frac = self.t as f32 / self.rise_steps as f32;
            Self::interpolate(self.initial_lr, self.max_lr, frac)
        } else {
            let fall_steps = self.total_steps - self.rise_steps;
            let frac = (self.t - self.rise_steps) as f32 / fall_steps as f32;
            Self::interpolate(self.max_lr, self.final_lr, frac)
        }
    }

    fn step(&mut self) {
        self.t = self.t.saturating_add(1);
    }
}
