//! Training configuration
//!
//! Declarative configuration for a training round: adaptation method,
//! freeze policy, optimizer hyperparameters and distillation settings.
//! Loadable from JSON; every field has a default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Parameter-efficient adaptation method
///
/// Selects both the model architecture variant (via the factory registry)
/// and the optimizer path (standard vs. anchored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Plain full fine-tuning
    Default,
    /// Modular adapter blocks
    Modular,
    /// Small modular adapter restricted to the encoder
    ModularSmall,
    /// Two-layer k-adapter
    Kadapter2,
    /// Three-layer k-adapter
    Kadapter3,
    /// Low-rank adaptation
    Lora,
    /// Anchored optimization toward pretrained weights
    Recadam,
    /// Teacher/student distillation across rounds
    Kd,
    /// Replay-augmented fine-tuning
    Mixreview,
}

impl Method {
    /// Tag used for substring matching against parameter names
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Modular => "modular",
            Self::ModularSmall => "modular_small",
            Self::Kadapter2 => "kadapter2",
            Self::Kadapter3 => "kadapter3",
            Self::Lora => "lora",
            Self::Recadam => "recadam",
            Self::Kd => "kd",
            Self::Mixreview => "mixreview",
        }
    }

    /// Whether this method optimizes against a frozen pretrained anchor
    #[must_use]
    pub fn uses_anchor(self) -> bool {
        self == Self::Recadam
    }

    /// Whether this method distills a teacher across rounds
    #[must_use]
    pub fn is_distillation(self) -> bool {
        self == Self::Kd
    }

    /// Whether replay augmentation is always on for this method
    #[must_use]
    pub fn forces_replay(self) -> bool {
        self == Self::Mixreview
    }

    /// All recognized methods
    #[must_use]
    pub fn all() -> [Method; 9] {
        [
            Self::Default,
            Self::Modular,
            Self::ModularSmall,
            Self::Kadapter2,
            Self::Kadapter3,
            Self::Lora,
            Self::Recadam,
            Self::Kd,
            Self::Mixreview,
        ]
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::all()
            .into_iter()
            .find(|m| m.tag() == s)
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

/// How much of the base model is frozen before method-specific re-enabling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FreezeLevel {
    /// Nothing frozen
    #[default]
    None,
    /// Encoder frozen
    Encoder,
    /// Whole model frozen
    All,
}

impl TryFrom<u8> for FreezeLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Self::None),
            1 => Ok(Self::Encoder),
            2 => Ok(Self::All),
            other => Err(Error::InvalidFreezeLevel(other)),
        }
    }
}

impl From<FreezeLevel> for u8 {
    fn from(level: FreezeLevel) -> u8 {
        match level {
            FreezeLevel::None => 0,
            FreezeLevel::Encoder => 1,
            FreezeLevel::All => 2,
        }
    }
}

/// Configuration for one training round
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Adaptation method
    pub method: Method,
    /// Freeze policy applied at model construction
    pub freeze_level: FreezeLevel,
    /// Peak learning rate
    pub learning_rate: f32,
    /// Weight decay for the decay parameter groups
    pub weight_decay: f32,
    /// Epsilon for adaptive denominators
    pub adam_epsilon: f32,
    /// Attach a one-cycle learning rate schedule
    pub use_lr_scheduling: bool,
    /// Number of data-parallel workers
    pub n_gpu: usize,
    /// Optimizer steps happen every this many batches
    pub gradient_accumulation_steps: usize,
    /// Epochs per round
    pub num_train_epochs: usize,
    /// Batch size for both train and validation loaders
    pub train_batch_size: usize,
    /// Loader worker threads (consumed by the external data loader)
    pub num_workers: usize,
    /// Epochs for each nested distillation job
    pub distil_epoch: usize,
    /// Distillation softening temperature
    pub temperature: f32,
    /// Distillation soft/hard loss mix
    pub alpha: f32,
    /// Output directory for artifacts
    pub output_dir: PathBuf,
    /// Fraction of time-invariant examples sampled into the replay buffer
    pub mem_ratio: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            method: Method::Default,
            freeze_level: FreezeLevel::None,
            learning_rate: 1e-3,
            weight_decay: 0.0,
            adam_epsilon: 1e-8,
            use_lr_scheduling: false,
            n_gpu: 1,
            gradient_accumulation_steps: 1,
            num_train_epochs: 1,
            train_batch_size: 8,
            num_workers: 0,
            distil_epoch: 1,
            temperature: 2.0,
            alpha: 0.5,
            output_dir: PathBuf::from("./output"),
            mem_ratio: 0.1,
        }
    }
}

impl TrainConfig {
    /// Config for a given method with everything else defaulted
    #[must_use]
    pub fn for_method(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Set the freeze level
    #[must_use]
    pub fn with_freeze_level(mut self, level: FreezeLevel) -> Self {
        self.freeze_level = level;
        self
    }

    /// Set the peak learning rate
    #[must_use]
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set epochs per round
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.num_train_epochs = epochs;
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.train_batch_size = batch_size;
        self
    }

    /// Enable one-cycle learning rate scheduling
    #[must_use]
    pub fn with_lr_scheduling(mut self) -> Self {
        self.use_lr_scheduling = true;
        self
    }

    /// Set nested distillation epochs
    #[must_use]
    pub fn with_distil_epochs(mut self, epochs: usize) -> Self {
        self.distil_epoch = epochs;
        self
    }

    /// Check hyperparameter ranges
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHyperparameter`] when the distillation temperature
    /// is not positive, the soft/hard mix `alpha` is outside `[0, 1]`, or
    /// the replay `mem_ratio` is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.temperature <= 0.0 {
            return Err(Error::InvalidHyperparameter {
                detail: format!("temperature must be positive, got {}", self.temperature),
            });
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::InvalidHyperparameter {
                detail: format!("alpha must be in [0, 1], got {}", self.alpha),
            });
        }
        if !(0.0..=1.0).contains(&self.mem_ratio) {
            return Err(Error::InvalidHyperparameter {
                detail: format!("mem_ratio must be in [0, 1], got {}", self.mem_ratio),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.method, Method::Default);
        assert_eq!(config.freeze_level, FreezeLevel::None);
        assert_eq!(config.gradient_accumulation_steps, 1);
        assert!((config.mem_ratio - 0.1).abs() < 1e-12);
        assert!(!config.use_lr_scheduling);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("lora".parse::<Method>().unwrap(), Method::Lora);
        assert_eq!(
            "modular_small".parse::<Method>().unwrap(),
            Method::ModularSmall
        );
        assert!(matches!(
            "t5".parse::<Method>(),
            Err(Error::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_method_predicates() {
        assert!(Method::Recadam.uses_anchor());
        assert!(!Method::Kd.uses_anchor());
        assert!(Method::Kd.is_distillation());
        assert!(Method::Mixreview.forces_replay());
        assert!(!Method::Default.forces_replay());
    }

    #[test]
    fn test_freeze_level_from_u8() {
        assert_eq!(FreezeLevel::try_from(0).unwrap(), FreezeLevel::None);
        assert_eq!(FreezeLevel::try_from(1).unwrap(), FreezeLevel::Encoder);
        assert_eq!(FreezeLevel::try_from(2).unwrap(), FreezeLevel::All);
        assert!(FreezeLevel::try_from(3).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = TrainConfig::for_method(Method::Kd)
            .with_freeze_level(FreezeLevel::Encoder)
            .with_distil_epochs(3);
        let text = serde_json::to_string(&config).unwrap();
        let back: TrainConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.method, Method::Kd);
        assert_eq!(back.freeze_level, FreezeLevel::Encoder);
        assert_eq!(back.distil_epoch, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"method":"recadam","freeze_level":2}"#).unwrap();
        assert_eq!(config.method, Method::Recadam);
        assert_eq!(config.freeze_level, FreezeLevel::All);
        assert_eq!(config.train_batch_size, 8);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"method":"mixreview","num_train_epochs":4}}"#).unwrap();
        let config = TrainConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.method, Method::Mixreview);
        assert_eq!(config.num_train_epochs, 4);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        for method in Method::all() {
            assert!(TrainConfig::for_method(method).validate().is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_nonpositive_temperature() {
        let mut config = TrainConfig::for_method(Method::Kd);
        config.temperature = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validate_rejects_alpha_outside_unit_interval() {
        let mut config = TrainConfig::for_method(Method::Kd);
        config.alpha = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("alpha"));

        config.alpha = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mem_ratio_outside_unit_interval() {
        let mut config = TrainConfig::for_method(Method::Mixreview);
        config.mem_ratio = 2.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mem_ratio"));
    }

    #[test]
    fn test_invalid_freeze_level_in_json() {
        let parsed: std::result::Result<TrainConfig, _> =
            serde_json::from_str(r#"{"freeze_level":9}"#);
        assert!(parsed.is_err());
    }
}
