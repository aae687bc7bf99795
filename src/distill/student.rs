//! Student model wrapper

use super::DistillLoss;
use crate::data::Batch;
use crate::model::{ForwardOutput, GenerateOptions, Seq2SeqModel};
use crate::tensor::Tensor;
use ndarray::Array2;

/// A model being distilled against a frozen teacher
///
/// Implements the model capability surface so the same round controller
/// that trains a plain model can train a student: `forward` runs both
/// models and replaces the task loss with the combined distillation
/// loss, while generation and the parameter surface delegate to the
/// inner model. Teacher parameters are frozen at construction and never
/// appear in the trainable set.
#[derive(Debug)]
pub struct Student {
    model: Box<dyn Seq2SeqModel>,
    teacher: Box<dyn Seq2SeqModel>,
    loss: DistillLoss,
}

impl Student {
    /// Wrap a model and its frozen teacher
    pub fn new(
        model: Box<dyn Seq2SeqModel>,
        teacher: Box<dyn Seq2SeqModel>,
        temperature: f32,
        alpha: f32,
    ) -> Self {
        for param in teacher.parameters() {
            param.set_requires_grad(false);
        }
        Self {
            model,
            teacher,
            loss: DistillLoss::new(temperature, alpha),
        }
    }

    /// Storage-sharing handle on the inner model being trained
    #[must_use]
    pub fn model_alias(&self) -> Box<dyn Seq2SeqModel> {
        self.model.alias()
    }

    /// Unwrap the trained inner model, dropping the teacher
    #[must_use]
    pub fn into_model(self) -> Box<dyn Seq2SeqModel> {
        self.model
    }
}

impl Seq2SeqModel for Student {
    fn forward(&mut self, batch: &Batch, labels: &Array2<i64>) -> ForwardOutput {
        let teacher_out = self.teacher.forward(batch, labels);
        let student_out = self.model.forward(batch, labels);
        let loss = self
            .loss
            .forward(&student_out.logits, &teacher_out.logits, labels);
        ForwardOutput {
            loss,
            logits: student_out.logits,
        }
    }

    fn generate(&self, batch: &Batch, options: &GenerateOptions) -> Vec<Vec<i64>> {
        self.model.generate(batch, options)
    }

    fn parameters(&self) -> Vec<Tensor> {
        self.model.parameters()
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        self.model.named_parameters()
    }

    fn encoder_parameters(&self) -> Vec<Tensor> {
        self.model.encoder_parameters()
    }

    fn backbone(&self) -> &str {
        self.model.backbone()
    }

    fn snapshot(&self) -> Box<dyn Seq2SeqModel> {
        self.model.snapshot()
    }

    fn alias(&self) -> Box<dyn Seq2SeqModel> {
        self.model.alias()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, VocabCodec};
    use crate::data::Example;
    use crate::model::StubModel;

    fn setup() -> (Student, Batch, Array2<i64>) {
        let codec = VocabCodec::from_corpus(["capital of france paris"]);
        let model = StubModel::new("s2s", codec.vocab_size());
        let teacher = StubModel::new("s2s", codec.vocab_size());
        let student = Student::new(Box::new(model), Box::new(teacher), 2.0, 0.5);
        let batch = Batch::from_examples(
            &[Example::new("capital of france", "paris", "P36")],
            &codec,
        );
        let labels = batch.masked_labels(codec.pad_token_id());
        (student, batch, labels)
    }

    #[test]
    fn test_teacher_params_are_frozen() {
        let (student, _, _) = setup();
        assert!(student.teacher.parameters().iter().all(|p| !p.requires_grad()));
        assert!(student.parameters().iter().all(Tensor::requires_grad));
    }

    #[test]
    fn test_forward_combines_losses() {
        let (mut student, batch, labels) = setup();
        let out = student.forward(&batch, &labels);
        assert!(out.loss >= 0.0);
        assert!(out.loss.is_finite());
        // gradients land on the inner model only
        assert!(student.model.parameters().iter().all(|p| p.grad().is_some()));
        assert!(student.teacher.parameters().iter().all(|p| p.grad().is_none()));
    }

    #[test]
    fn test_alias_sees_training_updates() {
        let (student, _, _) = setup();
        let handle = student.model_alias();
        student.parameters()[0].data_mut()[0] = 42.0;
        assert_eq!(handle.parameters()[0].data()[0], 42.0);
    }

    #[test]
    fn test_into_model_returns_inner() {
        let (student, _, _) = setup();
        let handle = student.model_alias();
        let inner = student.into_model();
        assert!(handle.parameters()[0].same_storage(&inner.parameters()[0]));
    }
}
