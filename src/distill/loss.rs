//! Distillation loss

use crate::data::IGNORE_INDEX;
use ndarray::{Array2, Axis};

/// Knowledge distillation loss
///
/// Combines soft targets from the frozen teacher (temperature-scaled KL
/// divergence) with hard targets from the ground-truth labels
/// (cross-entropy):
///
/// ```text
/// L = α * T² * KL(softmax(teacher/T) || softmax(student/T))
///   + (1-α) * CE(student, labels)
/// ```
///
/// Logit rows are aligned with the flattened label block; rows whose
/// label is the ignore sentinel (masked padding) contribute to neither
/// term.
#[derive(Debug, Clone)]
pub struct DistillLoss {
    /// Temperature for softening probability distributions
    pub temperature: f32,
    /// Weight for the soft-target term; hard-target weight is `1 - alpha`
    pub alpha: f32,
}

impl DistillLoss {
    /// Create a distillation loss function
    ///
    /// # Panics
    ///
    /// Panics if `temperature <= 0` or `alpha` is outside `[0, 1]`.
    pub fn new(temperature: f32, alpha: f32) -> Self {
        assert!(
            temperature > 0.0,
            "Temperature must be positive, got {temperature}"
        );
        assert!(
            (0.0..=1.0).contains(&alpha),
            "Alpha must be in [0, 1], got {alpha}"
        );
        Self { temperature, alpha }
    }

    /// Combined loss over one batch of row-aligned logits
    ///
    /// # Panics
    ///
    /// Panics if the logit shapes differ or the label count does not
    /// match the number of logit rows.
    pub fn forward(
        &self,
        student_logits: &Array2<f32>,
        teacher_logits: &Array2<f32>,
        labels: &Array2<i64>,
    ) -> f32 {
        assert_eq!(
            student_logits.shape(),
            teacher_logits.shape(),
            "Student and teacher logits must have same shape"
        );
        assert_eq!(
            student_logits.nrows(),
            labels.len(),
            "Label count must match number of logit rows"
        );

        let kept: Vec<(usize, usize)> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label != IGNORE_INDEX)
            .map(|(row, &label)| (row, label as usize))
            .collect();
        if kept.is_empty() {
            return 0.0;
        }

        let kl_loss = self.kl_divergence_loss(student_logits, teacher_logits, &kept);
        let ce_loss = cross_entropy_loss(student_logits, &kept);

        self.alpha * kl_loss * self.temperature * self.temperature + (1.0 - self.alpha) * ce_loss
    }

    /// Temperature-scaled KL(teacher || student) over the unmasked rows
    fn kl_divergence_loss(
        &self,
        student_logits: &Array2<f32>,
        teacher_logits: &Array2<f32>,
        kept: &[(usize, usize)],
    ) -> f32 {
        let student_soft = softmax_2d(&(student_logits / self.temperature));
        let teacher_soft = softmax_2d(&(teacher_logits / self.temperature));

        let mut total_kl = 0.0;
        for &(row, _) in kept {
            let p_row = teacher_soft.row(row);
            let q_row = student_soft.row(row);
            let mut kl = 0.0;
            for (&p_i, &q_i) in p_row.iter().zip(q_row.iter()) {
                if p_i > 1e-10 {
                    kl += p_i * (p_i / q_i.max(1e-10)).ln();
                }
            }
            total_kl += kl;
        }
        total_kl / kept.len() as f32
    }
}

/// Cross-entropy with hard labels over the unmasked rows
fn cross_entropy_loss(logits: &Array2<f32>, kept: &[(usize, usize)]) -> f32 {
    let probs = softmax_2d(logits);
    let mut loss = 0.0;
    for &(row, label) in kept {
        let prob = probs[[row, label.min(probs.ncols() - 1)]].max(1e-10);
        loss -= prob.max(f32::MIN_POSITIVE).ln();
    }
    loss / kept.len().max(1) as f32
}

/// Row-wise softmax with max-subtraction for numerical stability
fn softmax_2d(x: &Array2<f32>) -> Array2<f32> {
    let mut result = x.clone();
    for mut row in result.axis_iter_mut(Axis(0)) {
        let max_val = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max_val).exp());
        let sum: f32 = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    result
}
