//! RecAdam: anchored Adam (regularized path)
//!
//! Adam with bias correction, plus a quadratic penalty pulling weights
//! toward their pretrained values. The penalty strength is annealed
//! over steps with a sigmoid: early steps stay close to the anchor,
//! late steps optimize the task objective almost exclusively.
//!
//! Objective per annealed group at step t:
//!
//! ```text
//! L(t) = λ(t) · L_task + (anneal_w - λ(t)) · pretrain_cof · ||θ - θ_pre||²
//! λ(t) = anneal_w · σ(k · (t - t0))
//! ```

use super::{Optimizer, ParamGroup};
use crate::error::{Error, Result};
use ndarray::Array1;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;

/// Default anneal weight for backbone groups
pub const DEFAULT_ANNEAL_W: f32 = 1.0;
/// Default sigmoid steepness
pub const DEFAULT_ANNEAL_K: f32 = 0.5;
/// Default sigmoid midpoint step
pub const DEFAULT_ANNEAL_T0: u64 = 250;
/// Default anchor penalty coefficient
pub const DEFAULT_PRETRAIN_COF: f32 = 5000.0;

/// Anchored Adam over parameter groups
#[derive(Debug)]
pub struct RecAdam {
    groups: Vec<ParamGroup>,
    lr: f32,
    eps: f32,
    anneal_k: f32,
    anneal_t0: u64,
    pretrain_cof: f32,
    t: u64,
    m: Vec<Vec<Option<Array1<f32>>>>,
    v: Vec<Vec<Option<Array1<f32>>>>,
}

impl RecAdam {
    /// Create a RecAdam optimizer
    ///
    /// # Errors
    ///
    /// `Error::AnchorMismatch` if any group with a nonzero anneal weight
    /// lacks index-aligned pretrained anchor parameters.
    pub fn new(groups: Vec<ParamGroup>, lr: f32, eps: f32) -> Result<Self> {
        for group in &groups {
            if group.anneal_w > 0.0 && group.pretrain_params.len() != group.params.len() {
                return Err(Error::AnchorMismatch {
                    detail: format!(
                        "group '{}': {} params but {} anchors",
                        group.name,
                        group.params.len(),
                        group.pretrain_params.len()
                    ),
                });
            }
        }
        let m = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        let v = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        Ok(Self {
            groups,
            lr,
            eps,
            anneal_k: DEFAULT_ANNEAL_K,
            anneal_t0: DEFAULT_ANNEAL_T0,
            pretrain_cof: DEFAULT_PRETRAIN_COF,
            t: 0,
            m,
            v,
        })
    }

    /// Override the sigmoid anneal schedule
    #[must_use]
    pub fn with_anneal(mut self, k: f32, t0: u64) -> Self {
        self.anneal_k = k;
        self.anneal_t0 = t0;
        self
    }

    /// Override the anchor penalty coefficient
    #[must_use]
    pub fn with_pretrain_cof(mut self, cof: f32) -> Self {
        self.pretrain_cof = cof;
        self
    }

    /// Annealed task weight at a step, scaled by the group's anneal weight
    fn anneal_lambda(&self, anneal_w: f32, step: u64) -> f32 {
        let x = self.anneal_k * (step as f32 - self.anneal_t0 as f32);
        anneal_w / (1.0 + (-x).exp())
    }

    /// Optimization step counter
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for RecAdam {
    fn step(&mut self) {
        self.t += 1;
        let bias_correction1 = 1.0 - BETA1.powi(self.t as i32);
        let bias_correction2 = 1.0 - BETA2.powi(self.t as i32);
        let step_size = self.lr * bias_correction2.sqrt() / bias_correction1;

        for (gi, group) in self.groups.iter().enumerate() {
            for (pi, param) in group.params.iter().enumerate() {
                if !param.requires_grad() {
                    continue;
                }
                let Some(grad) = param.grad() else { continue };

                let m_t = match &self.m[gi][pi] {
                    Some(m) => m * BETA1 + &grad * (1.0 - BETA1),
                    None => &grad * (1.0 - BETA1),
                };
                let grad_sq = &grad * &grad;
                let v_t = match &self.v[gi][pi] {
                    Some(v) => v * BETA2 + &grad_sq * (1.0 - BETA2),
                    None => grad_sq * (1.0 - BETA2),
                };
                let denom = v_t.mapv(f32::sqrt) + self.eps;

                {
                    let mut data = param.data_mut();
                    if group.anneal_w > 0.0 {
                        let lambda = self.anneal_lambda(group.anneal_w, self.t);
                        *data = &*data - &(&m_t / &denom * (step_size * lambda));
                        // pull toward the pretrained anchor with the
                        // complementary weight
                        let anchor = group.pretrain_params[pi].data();
                        let pull = (&*data - &*anchor)
                            * (self.lr * (group.anneal_w - lambda) * self.pretrain_cof);
                        *data = &*data - &pull;
                    } else {
                        *data = &*data - &(&m_t / &denom * step_size);
                    }
                    if group.weight_decay > 0.0 {
                        *data = &*data * (1.0 - self.lr * group.weight_decay);
                    }
                }

                self.m[gi][pi] = Some(m_t);
                self.v[gi][pi] = Some(v_t);
            }
        }
    }

    fn zero_grad(&mut self) {
        for group in &self.groups {
            for param in &group.params {
                param.zero_grad();
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
