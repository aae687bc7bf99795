//! Per-round training state

/// Counters and metric history owned by the round controller
///
/// The epoch counter is monotonic across rounds: it is incremented at
/// the start of every training epoch and never reset, so repeated round
/// invocations keep counting from where the previous round stopped.
#[derive(Debug, Default)]
pub struct TrainingState {
    epoch: u64,
    global_step: u64,
    losses: Vec<f32>,
    val_losses: Vec<f32>,
    em_scores: Vec<f32>,
    best_val_loss: Option<f32>,
}

impl TrainingState {
    /// Fresh state with all counters at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a training epoch
    pub fn new_epoch(&mut self) {
        self.epoch += 1;
    }

    /// Record one optimization step's loss
    pub fn record_step(&mut self, loss: f32) {
        self.global_step += 1;
        self.losses.push(loss);
    }

    /// Record a validation pass
    pub fn record_validation(&mut self, val_loss: f32, em_score: f32) {
        self.val_losses.push(val_loss);
        self.em_scores.push(em_score);
        if self.best_val_loss.map_or(true, |best| val_loss < best) {
            self.best_val_loss = Some(val_loss);
        }
    }

    /// Monotonic epoch counter
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Total training steps recorded
    #[must_use]
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// Most recent training loss
    #[must_use]
    pub fn last_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }

    /// Mean training loss over the whole history
    #[must_use]
    pub fn mean_loss(&self) -> Option<f32> {
        if self.losses.is_empty() {
            None
        } else {
            Some(self.losses.iter().sum::<f32>() / self.losses.len() as f32)
        }
    }

    /// Most recent validation loss
    #[must_use]
    pub fn last_val_loss(&self) -> Option<f32> {
        self.val_losses.last().copied()
    }

    /// Lowest validation loss seen so far
    #[must_use]
    pub fn best_val_loss(&self) -> Option<f32> {
        self.best_val_loss
    }

    /// Exact-match history, one entry per validation pass
    #[must_use]
    pub fn em_scores(&self) -> &[f32] {
        &self.em_scores
    }
}
