//! Teacher/student lifecycle across training rounds

use super::Student;
use crate::error::Result;
use crate::model::Seq2SeqModel;
use crate::train::{RoundController, RoundReport};

/// Distillation never nests deeper than one level: the nested job runs
/// with an inert controller.
const MAX_DEPTH: u8 = 1;

/// Owns the teacher across rounds and drives the distillation lifecycle
///
/// Round 1 under the distillation method only bootstraps the teacher
/// from the round's final model. Every later round ends with exactly
/// one nested training job: the current model becomes a [`Student`]
/// trained against the previous teacher on a replay-augmented dataset,
/// and the pre-distillation model is promoted to be the next teacher.
pub struct DistillationController {
    teacher: Option<Box<dyn Seq2SeqModel>>,
    nested_jobs: usize,
    nested_report: Option<RoundReport>,
}

impl DistillationController {
    /// Controller with no teacher yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            teacher: None,
            nested_jobs: 0,
            nested_report: None,
        }
    }

    /// Whether a teacher has been bootstrapped
    #[must_use]
    pub fn has_teacher(&self) -> bool {
        self.teacher.is_some()
    }

    /// Detached copy of the current teacher's weights
    #[must_use]
    pub fn teacher_snapshot(&self) -> Option<Box<dyn Seq2SeqModel>> {
        self.teacher.as_ref().map(|teacher| teacher.snapshot())
    }

    /// Nested training jobs run so far
    #[must_use]
    pub fn nested_jobs(&self) -> usize {
        self.nested_jobs
    }

    /// Report from the most recent nested training job
    #[must_use]
    pub fn last_nested_report(&self) -> Option<RoundReport> {
        self.nested_report
    }

    /// Round-start hook: under the distillation method, restart from the
    /// frozen teacher's weights instead of the previous student's
    pub fn on_round_start(&mut self, round: &mut RoundController) {
        if round.depth() >= MAX_DEPTH || !round.config().method.is_distillation() {
            return;
        }
        if let Some(teacher) = &self.teacher {
            drop(round.replace_model(teacher.snapshot()));
        }
    }

    /// Round-end hook: bootstrap the teacher on the first round, run the
    /// nested distillation job on every later round
    ///
    /// # Errors
    ///
    /// Any fatal error in the nested job aborts the outer round.
    pub fn on_round_end(&mut self, round: &mut RoundController) -> Result<()> {
        if round.depth() >= MAX_DEPTH || !round.config().method.is_distillation() {
            return Ok(());
        }
        let Some(teacher) = self.teacher.take() else {
            self.teacher = Some(round.model().snapshot());
            return Ok(());
        };

        // replay augmentation forced on for the distillation dataset
        let dataset = round.refresh_dataset_forced()?;
        let promoted = round.model().snapshot();
        let handle = round.model().alias();
        let current = round.replace_model(handle);
        let student = Student::new(
            current,
            teacher,
            round.config().temperature,
            round.config().alpha,
        );
        self.teacher = Some(promoted);

        let mut nested_config = round.config().clone();
        nested_config.num_train_epochs = nested_config.distil_epoch;
        let mut nested =
            RoundController::nested(nested_config, round.codec(), Box::new(student));
        nested.set_dataset(dataset, false)?;
        let report = nested.fit(&mut Self::new())?;
        self.nested_report = Some(report);
        self.nested_jobs += 1;
        // the round's model aliases the student's inner model, so the
        // trained weights are already in place
        Ok(())
    }
}

impl Default for DistillationController {
    fn default() -> Self {
        Self::new()
    }
}
