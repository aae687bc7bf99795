//! Adafactor optimizer (standard path)
//!
//! Memory-efficient adaptive optimizer with a single accumulated second
//! moment per parameter, update clipping by RMS, and a fixed external
//! learning rate: relative step sizing and parameter scaling are
//! disabled, matching how the harness configures it.

use super::{Optimizer, ParamGroup};
use ndarray::Array1;

const EPS_SQ: f32 = 1e-30;
const CLIP_THRESHOLD: f32 = 1.0;
const DECAY_EXPONENT: f64 = -0.8;

/// Adafactor over parameter groups
#[derive(Debug)]
pub struct Adafactor {
    groups: Vec<ParamGroup>,
    lr: f32,
    t: u64,
    // second moment per group per parameter
    v: Vec<Vec<Option<Array1<f32>>>>,
}

impl Adafactor {
    /// Create an Adafactor optimizer with a fixed learning rate
    pub fn new(groups: Vec<ParamGroup>, lr: f32) -> Self {
        let v = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        Self {
            groups,
            lr,
            t: 0,
            v,
        }
    }

    /// Optimization step counter
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Groups being optimized
    #[must_use]
    pub fn groups(&self) -> &[ParamGroup] {
        &self.groups
    }
}

impl Optimizer for Adafactor {
    fn step(&mut self) {
        self.t += 1;
        // decaying second-moment coefficient: 1 - t^-0.8
        let beta2_t = 1.0 - (self.t as f64).powf(DECAY_EXPONENT) as f32;

        for (gi, group) in self.groups.iter().enumerate() {
            for (pi, param) in group.params.iter().enumerate() {
                if !param.requires_grad() {
                    continue;
                }
                let Some(grad) = param.grad() else { continue };

                let grad_sq = &grad * &grad + EPS_SQ;
                let v_t = match &self.v[gi][pi] {
                    Some(v) => v * beta2_t + &grad_sq * (1.0 - beta2_t),
                    None => grad_sq,
                };

                // u = g / sqrt(v), clipped so RMS(u) <= threshold
                let mut update = &grad / &v_t.mapv(f32::sqrt);
                let rms =
                    (update.iter().map(|u| u * u).sum::<f32>() / update.len().max(1) as f32).sqrt();
                if rms > CLIP_THRESHOLD {
                    update.mapv_inplace(|u| u / (rms / CLIP_THRESHOLD));
                }

                {
                    let mut data = param.data_mut();
                    *data = &*data - &(update * self.lr);
                    if group.weight_decay > 0.0 {
                        *data = &*data * (1.0 - self.lr * group.weight_decay);
                    }
                }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn single_group(params: Vec<Tensor>, weight_decay: f32) -> Vec<ParamGroup> {
        vec![ParamGroup::plain("all", params, weight_decay)]
    }

    #[test]
    fn test_quadratic_convergence() {
        let param = Tensor::from_vec(vec![5.0, -3.0, 2.0], true);
        let mut optimizer = Adafactor::new(single_group(vec![param.clone()], 0.0), 0.1);

        for _ in 0..200 {
            let grad = param.data().mapv(|x| 2.0 * x);
            param.set_grad(grad);
            optimizer.step();
        }

        for &val in param.data().iter() {
            assert!(val.abs() < 0.5, "value {val} did not converge");
        }
    }

    #[test]
    fn test_update_clipped_to_lr_magnitude() {
        // With a fresh second moment, |u| == 1 per element, so the first
        // step moves each weight by exactly lr.
        let param = Tensor::from_vec(vec![1.0], true);
        let mut optimizer = Adafactor::new(single_group(vec![param.clone()], 0.0), 0.01);
        param.set_grad(arr1(&[100.0]));
        optimizer.step();
        assert_abs_diff_eq!(param.data()[0], 0.99, epsilon = 1e-5);
    }

    #[test]
    fn test_weight_decay_applies_per_group() {
        let decayed = Tensor::from_vec(vec![1.0], true);
        let plain = Tensor::from_vec(vec![1.0], true);
        let groups = vec![
            ParamGroup::plain("decay", vec![decayed.clone()], 0.5),
            ParamGroup::plain("no_decay", vec![plain.clone()], 0.0),
        ];
        let mut optimizer = Adafactor::new(groups, 0.1);
        decayed.set_grad(arr1(&[0.0]));
        plain.set_grad(arr1(&[0.0]));
        optimizer.step();
        assert!(decayed.data()[0] < plain.data()[0]);
    }

    #[test]
    fn test_skips_frozen_and_gradless_params() {
        let frozen = Tensor::from_vec(vec![1.0], false);
        let gradless = Tensor::from_vec(vec![2.0], true);
        let mut optimizer =
            Adafactor::new(single_group(vec![frozen.clone(), gradless.clone()], 0.0), 0.1);
        frozen.set_grad(arr1(&[1.0]));
        optimizer.step();
        assert_eq!(frozen.data()[0], 1.0);
        assert_eq!(gradless.data()[0], 2.0);
    }

    #[test]
    fn test_zero_grad_clears_all_groups() {
        let a = Tensor::from_vec(vec![1.0], true);
        let b = Tensor::from_vec(vec![1.0], true);
        let groups = vec![
            ParamGroup::plain("a", vec![a.clone()], 0.0),
            ParamGroup::plain("b", vec![b.clone()], 0.0),
        ];
        let mut optimizer = Adafactor::new(groups, 0.1);
        a.set_grad(arr1(&[1.0]));
        b.set_grad(arr1(&[1.0]));
        optimizer.zero_grad();
        assert!(a.grad().is_none());
        assert!(b.grad().is_none());
    }

    #[test]
    fn test_lr_getter_setter() {
        let mut optimizer = Adafactor::new(Vec::new(), 0.1);
        assert_abs_diff_eq!(optimizer.lr(), 0.1);
        optimizer.set_lr(0.02);
        assert_abs_diff_eq!(optimizer.lr(), 0.02);
    }

    #[test]
    fn test_updates_stay_finite_for_extreme_gradients() {
        let param = Tensor::from_vec(vec![1e6, -1e-6], true);
        let mut optimizer = Adafactor::new(single_group(vec![param.clone()], 0.01), 0.001);
        param.set_grad(arr1(&[1e8, 1e-8]));
        optimizer.step();
        for &val in param.data().iter() {
            assert!(val.is_finite());
        }
    }
}
