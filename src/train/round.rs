//! Training round orchestration
//!
//! One round: split the dataset, optionally augment it from the replay
//! buffer, run the epoch loop with gradient accumulation and learning
//! rate scheduling, validate with constrained generation and scoring,
//! then hand control to the distillation lifecycle hooks.

use crate::codec::{ids_to_clean_text, Codec};
use crate::config::{Method, TrainConfig};
use crate::data::{Batch, Dataset};
use crate::distill::DistillationController;
use crate::error::{Error, Result};
use crate::eval::score;
use crate::model::{GenerateOptions, Seq2SeqModel};
use crate::optim::{
    anchored_groups, standard_groups, Adafactor, LRScheduler, OneCycleLR, Optimizer, RecAdam,
    DEFAULT_ANNEAL_W,
};
use crate::replay::ReplayBuffer;
use crate::train::{LocalContext, TrainingState, WorkerContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

/// Train/validation split ratio
const TRAIN_SPLIT: f64 = 0.8;

/// Metrics from one validation step, reduced across workers
#[derive(Debug, Clone, Copy)]
pub struct StepMetrics {
    /// Batch loss
    pub loss: f32,
    /// Exact-match percentage over the batch
    pub em_score: f32,
    /// Strict accuracy percentage over the batch
    pub accuracy: f32,
}

/// Summary of a completed round
#[derive(Debug, Clone, Copy)]
pub struct RoundReport {
    /// Mean training loss over the round
    pub loss: f32,
    /// Mean validation loss
    pub val_loss: f32,
    /// Mean exact-match percentage
    pub em_score: f32,
    /// Mean strict accuracy percentage
    pub accuracy: f32,
    /// Epoch counter after the round
    pub epoch: u64,
}

/// Drives epochs and steps for one training round at a time
///
/// Owns the model, the replay buffer and the per-round state. Repeated
/// `set_dataset` / `fit` invocations form the continual-learning stream;
/// the replay buffer and epoch counter persist across rounds.
pub struct RoundController {
    config: TrainConfig,
    codec: Rc<dyn Codec>,
    model: Box<dyn Seq2SeqModel>,
    pretrained: Option<Box<dyn Seq2SeqModel>>,
    replay: ReplayBuffer,
    base: Option<Dataset>,
    train_set: Option<Dataset>,
    val_set: Option<Dataset>,
    dataset_len: usize,
    state: TrainingState,
    context: Box<dyn WorkerContext>,
    rng: StdRng,
    depth: u8,
}

impl RoundController {
    /// Controller over a freshly built model
    pub fn new(config: TrainConfig, codec: Rc<dyn Codec>, model: Box<dyn Seq2SeqModel>) -> Self {
        let replay = ReplayBuffer::new(config.mem_ratio);
        Self {
            config,
            codec,
            model,
            pretrained: None,
            replay,
            base: None,
            train_set: None,
            val_set: None,
            dataset_len: 0,
            state: TrainingState::new(),
            context: Box::new(LocalContext),
            rng: StdRng::from_entropy(),
            depth: 0,
        }
    }

    /// Seed the controller's data-order randomness
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.replay = ReplayBuffer::with_seed(self.replay.capacity(), self.config.mem_ratio, seed);
        self
    }

    /// Supply the frozen pretrained anchor required by the anchored
    /// optimizer path
    #[must_use]
    pub fn with_pretrained(mut self, pretrained: Box<dyn Seq2SeqModel>) -> Self {
        self.pretrained = Some(pretrained);
        self
    }

    /// Attach an external worker context for metric reduction
    #[must_use]
    pub fn with_context(mut self, context: Box<dyn WorkerContext>) -> Self {
        self.context = context;
        self
    }

    /// Nested controller for the distillation sub-invocation; the depth
    /// marker stops the recursion at one level
    pub(crate) fn nested(
        config: TrainConfig,
        codec: Rc<dyn Codec>,
        model: Box<dyn Seq2SeqModel>,
    ) -> Self {
        let mut controller = Self::new(config, codec, model);
        controller.depth = 1;
        controller
    }

    /// Install a dataset for the upcoming round
    ///
    /// Refreshes the replay buffer (when `use_replay` is set or the
    /// method forces it) and performs the random train/validation
    /// split.
    ///
    /// # Errors
    ///
    /// `Error::EmptyDataset` if the dataset has no examples.
    pub fn set_dataset(&mut self, dataset: Dataset, use_replay: bool) -> Result<()> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }
        self.base = Some(dataset.clone());
        let active = if use_replay || self.config.method.forces_replay() {
            self.replay.refresh(&dataset)
        } else {
            dataset
        };
        self.dataset_len = active.len();
        let (train, val) = active.random_split(TRAIN_SPLIT, &mut self.rng);
        self.train_set = Some(train);
        self.val_set = Some(val);
        Ok(())
    }

    /// Build the optimizer and optional schedule for the configured method
    ///
    /// The anchored path requires a pretrained reference model; every
    /// other method takes the standard two-group path.
    ///
    /// # Errors
    ///
    /// `Error::DatasetNotSet` before `set_dataset`; `Error::MissingAnchor`
    /// for the anchored method without a pretrained model;
    /// `Error::AnchorMismatch` if the anchor's parameter names differ.
    pub fn configure_optimizer(&self) -> Result<(Box<dyn Optimizer>, Option<OneCycleLR>)> {
        if self.train_set.is_none() {
            return Err(Error::DatasetNotSet {
                operation: "configure_optimizer",
            });
        }

        let optimizer: Box<dyn Optimizer> = if self.config.method == Method::Recadam {
            let pretrained = self.pretrained.as_deref().ok_or_else(|| Error::MissingAnchor {
                method: self.config.method.tag().to_string(),
            })?;
            let groups = anchored_groups(
                self.model.as_ref(),
                pretrained,
                self.config.weight_decay,
                DEFAULT_ANNEAL_W,
            )?;
            Box::new(RecAdam::new(
                groups,
                self.config.learning_rate,
                self.config.adam_epsilon,
            )?)
        } else {
            let groups = standard_groups(self.model.as_ref(), self.config.weight_decay);
            Box::new(Adafactor::new(groups, self.config.learning_rate))
        };

        let scheduler = if self.config.use_lr_scheduling {
            Some(OneCycleLR::new(
                self.config.learning_rate,
                self.total_scheduler_steps(),
            ))
        } else {
            None
        };
        Ok((optimizer, scheduler))
    }

    /// Scheduler horizon: per-epoch step estimate over the full dataset
    /// length (not the train subset), scaled by the epoch count
    fn total_scheduler_steps(&self) -> u64 {
        let workers = self.config.n_gpu.max(1) * self.config.gradient_accumulation_steps.max(1);
        let divisor = (workers / 3).max(1);
        let steps_per_epoch = (self.dataset_len / divisor) as u64 + 1;
        steps_per_epoch * self.config.num_train_epochs.max(1) as u64
    }

    /// Forward/backward over one batch, returning the masked loss
    pub fn train_step(&mut self, batch: &Batch) -> f32 {
        let labels = batch.masked_labels(self.codec.pad_token_id());
        self.model.forward(batch, &labels).loss
    }

    /// Generation, decoding and scoring over one validation batch
    ///
    /// # Errors
    ///
    /// `Error::BatchMismatch` if generation produced a different number
    /// of rows than the batch has references.
    pub fn validation_step(&mut self, batch: &Batch) -> Result<StepMetrics> {
        let loss = self.train_step(batch);
        let generated = self.model.generate(batch, &GenerateOptions::default());
        let predictions = ids_to_clean_text(self.codec.as_ref(), &generated);
        let references = ids_to_clean_text(self.codec.as_ref(), &batch.target_rows());
        let (em_score, accuracy) = score(&predictions, &references)?;
        Ok(StepMetrics {
            loss: self.context.reduce_mean(loss),
            em_score: self.context.reduce_mean(em_score),
            accuracy: self.context.reduce_mean(accuracy),
        })
    }

    /// Run the full round: epoch loop, validation, lifecycle hooks
    ///
    /// # Errors
    ///
    /// Propagates hyperparameter range errors, configuration and data
    /// errors from optimizer construction, validation scoring and the
    /// nested distillation job.
    pub fn fit(&mut self, distiller: &mut DistillationController) -> Result<RoundReport> {
        self.config.validate()?;
        distiller.on_round_start(self);
        let (mut optimizer, mut scheduler) = self.configure_optimizer()?;

        let mut round_losses = Vec::new();
        for _ in 0..self.config.num_train_epochs {
            self.state.new_epoch();
            let batches = self.train_batches()?;
            let mut pending = false;
            for (i, batch) in batches.iter().enumerate() {
                let loss = self.train_step(batch);
                self.state.record_step(loss);
                round_losses.push(loss);
                pending = true;
                if (i + 1) % self.config.gradient_accumulation_steps.max(1) == 0 {
                    self.apply_step(&mut *optimizer, scheduler.as_mut());
                    pending = false;
                }
            }
            if pending {
                self.apply_step(&mut *optimizer, scheduler.as_mut());
            }
        }

        let validation = self.validate()?;
        distiller.on_round_end(self)?;

        let loss = if round_losses.is_empty() {
            0.0
        } else {
            round_losses.iter().sum::<f32>() / round_losses.len() as f32
        };
        Ok(RoundReport {
            loss,
            val_loss: validation.loss,
            em_score: validation.em_score,
            accuracy: validation.accuracy,
            epoch: self.state.epoch(),
        })
    }

    fn apply_step(&mut self, optimizer: &mut dyn Optimizer, scheduler: Option<&mut OneCycleLR>) {
        if let Some(scheduler) = scheduler {
            scheduler.apply(optimizer);
            optimizer.step();
            scheduler.step();
        } else {
            optimizer.step();
        }
        optimizer.zero_grad();
    }

    /// Full validation pass over the held-out split
    fn validate(&mut self) -> Result<StepMetrics> {
        let batches = self
            .val_set
            .as_ref()
            .ok_or(Error::DatasetNotSet {
                operation: "validate",
            })?
            .val_batches(self.config.train_batch_size);
        let mut loss = 0.0;
        let mut em_score = 0.0;
        let mut accuracy = 0.0;
        let count = batches.len().max(1) as f32;
        for batch in &batches {
            let metrics = self.validation_step(batch)?;
            loss += metrics.loss;
            em_score += metrics.em_score;
            accuracy += metrics.accuracy;
        }
        let metrics = StepMetrics {
            loss: loss / count,
            em_score: em_score / count,
            accuracy: accuracy / count,
        };
        self.state.record_validation(metrics.loss, metrics.em_score);
        Ok(metrics)
    }

    fn train_batches(&mut self) -> Result<Vec<Batch>> {
        let train = self.train_set.as_ref().ok_or(Error::DatasetNotSet {
            operation: "fit",
        })?;
        Ok(train.train_batches(self.config.train_batch_size, &mut self.rng))
    }

    /// Replay-augmented copy of the round's base dataset, augmentation
    /// forced on regardless of method
    ///
    /// # Errors
    ///
    /// `Error::DatasetNotSet` before any `set_dataset` call.
    pub fn refresh_dataset_forced(&mut self) -> Result<Dataset> {
        let base = self.base.clone().ok_or(Error::DatasetNotSet {
            operation: "refresh_dataset_forced",
        })?;
        Ok(self.replay.refresh(&base))
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Active text codec
    #[must_use]
    pub fn codec(&self) -> Rc<dyn Codec> {
        Rc::clone(&self.codec)
    }

    /// Active model
    #[must_use]
    pub fn model(&self) -> &dyn Seq2SeqModel {
        self.model.as_ref()
    }

    /// Swap in a different model, returning the previous one
    pub fn replace_model(&mut self, model: Box<dyn Seq2SeqModel>) -> Box<dyn Seq2SeqModel> {
        std::mem::replace(&mut self.model, model)
    }

    /// Round state: epoch counter and metric history
    #[must_use]
    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Replay buffer fill level
    #[must_use]
    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub(crate) fn depth(&self) -> u8 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VocabCodec;
    use crate::config::FreezeLevel;
    use crate::data::Example;
    use crate::model::ModelRegistry;

    fn codec() -> Rc<VocabCodec> {
        Rc::new(VocabCodec::from_corpus([
            "capital of france germany japan paris berlin tokyo birthplace einstein ulm",
        ]))
    }

    fn dataset(codec: Rc<VocabCodec>, n: usize) -> Dataset {
        let examples: Vec<Example> = (0..n)
            .map(|i| match i % 3 {
                0 => Example::new("capital of france", "paris", "P36"),
                1 => Example::new("capital of japan", "tokyo", "P36"),
                _ => Example::new("birthplace einstein", "ulm", "P19"),
            })
            .collect();
        Dataset::new(examples, codec)
    }

    fn controller(config: TrainConfig) -> RoundController {
        let codec = codec();
        let registry = ModelRegistry::with_builtins("s2s", codec.vocab_size());
        let model = registry.build(&config).unwrap();
        RoundController::new(config, codec, model).with_seed(7)
    }

    #[test]
    fn test_set_dataset_rejects_empty() {
        let mut round = controller(TrainConfig::default());
        let err = round.set_dataset(dataset(codec(), 0), false).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn test_configure_optimizer_requires_dataset() {
        let round = controller(TrainConfig::default());
        let err = round.configure_optimizer().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_anchored_method_without_pretrained_fails_fast() {
        let config = TrainConfig::for_method(Method::Recadam);
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        let err = round.configure_optimizer().unwrap_err();
        assert!(matches!(err, Error::MissingAnchor { .. }));
    }

    #[test]
    fn test_anchored_method_with_pretrained_builds() {
        let config = TrainConfig::for_method(Method::Recadam);
        let codec = codec();
        let registry = ModelRegistry::with_builtins("s2s", codec.vocab_size());
        let model = registry.build(&config).unwrap();
        let anchor = model.snapshot();
        let mut round = RoundController::new(config, codec.clone(), model)
            .with_seed(7)
            .with_pretrained(anchor);
        round.set_dataset(dataset(codec, 10), false).unwrap();
        assert!(round.configure_optimizer().is_ok());
    }

    #[test]
    fn test_fit_reduces_loss_and_counts_epochs() {
        let config = TrainConfig::default()
            .with_epochs(3)
            .with_batch_size(2)
            .with_learning_rate(0.05);
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 12), false).unwrap();

        let before = {
            let batch = Batch::from_examples(
                &[Example::new("capital of france", "paris", "P36")],
                round.codec().as_ref(),
            );
            round.train_step(&batch)
        };
        let mut distiller = DistillationController::new();
        let report = round.fit(&mut distiller).unwrap();
        assert_eq!(report.epoch, 3);
        assert!(report.loss.is_finite());
        assert!(report.loss < before * 1.5);
        assert!(round.state().global_step() > 0);
    }

    #[test]
    fn test_epoch_counter_persists_across_rounds() {
        let config = TrainConfig::default().with_epochs(2).with_batch_size(2);
        let mut round = controller(config);
        let mut distiller = DistillationController::new();
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        round.fit(&mut distiller).unwrap();
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        let report = round.fit(&mut distiller).unwrap();
        assert_eq!(report.epoch, 4);
    }

    #[test]
    fn test_validation_reports_metrics_in_range() {
        let config = TrainConfig::default().with_epochs(1).with_batch_size(2);
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        let mut distiller = DistillationController::new();
        let report = round.fit(&mut distiller).unwrap();
        assert!((0.0..=100.0).contains(&report.em_score));
        assert!((0.0..=100.0).contains(&report.accuracy));
    }

    #[test]
    fn test_replay_seeds_on_first_round_when_enabled() {
        let config = TrainConfig::default().with_epochs(1).with_batch_size(2);
        let mut round = controller(config);
        assert_eq!(round.replay_len(), 0);
        round.set_dataset(dataset(codec(), 12), true).unwrap();
        // 4 of 12 examples are P19 (time-invariant); sample is 10% rounded
        assert!(round.replay_len() <= 4);
    }

    #[test]
    fn test_replay_buffer_populated_once_per_round() {
        let mut config = TrainConfig::for_method(Method::Mixreview)
            .with_epochs(3)
            .with_batch_size(2);
        config.mem_ratio = 0.5;
        let mut round = controller(config);
        let examples: Vec<Example> = (0..10)
            .map(|_| Example::new("birthplace einstein", "ulm", "P19"))
            .collect();
        round
            .set_dataset(Dataset::new(examples, codec()), false)
            .unwrap();
        // 10 eligible examples at mem_ratio 0.5 seed 5 entries
        let seeded = round.replay_len();
        assert_eq!(seeded, 5);

        let mut distiller = DistillationController::new();
        round.fit(&mut distiller).unwrap();
        // the buffer refreshes in set_dataset only, never mid-round
        assert_eq!(round.replay_len(), seeded);
    }

    #[test]
    fn test_fit_rejects_out_of_range_alpha_before_training() {
        let mut config = TrainConfig::for_method(Method::Kd)
            .with_epochs(1)
            .with_batch_size(2);
        config.alpha = 2.0;
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        let before = round.state().global_step();
        let mut distiller = DistillationController::new();
        let err = round.fit(&mut distiller).unwrap_err();
        assert!(err.is_config());
        assert_eq!(round.state().global_step(), before);
    }

    #[test]
    fn test_scheduler_horizon_uses_full_dataset_length() {
        let mut config = TrainConfig::default().with_epochs(2).with_lr_scheduling();
        config.n_gpu = 1;
        config.gradient_accumulation_steps = 6;
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        // (10 / (1*6/3)) + 1 = 6 steps per epoch, 2 epochs
        assert_eq!(round.total_scheduler_steps(), 12);
    }

    #[test]
    fn test_freeze_level_respected_during_fit() {
        let config = TrainConfig::default()
            .with_epochs(1)
            .with_batch_size(2)
            .with_freeze_level(FreezeLevel::All);
        let mut round = controller(config);
        round.set_dataset(dataset(codec(), 10), false).unwrap();
        let frozen: Vec<f32> = round.model().parameters().iter().map(|p| p.data()[0]).collect();
        let mut distiller = DistillationController::new();
        round.fit(&mut distiller).unwrap();
        let after: Vec<f32> = round.model().parameters().iter().map(|p| p.data()[0]).collect();
        assert_eq!(frozen, after);
    }
}
