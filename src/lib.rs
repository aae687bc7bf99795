//! Continual-learning fine-tuning harness for sequence-to-sequence models
//!
//! `retener` trains a pretrained encoder-decoder model on a stream of
//! knowledge-probing examples, one round at a time. It provides the
//! orchestration around the numeric backend:
//!
//! - a bounded [`replay::ReplayBuffer`] that rehearses time-invariant
//!   examples against catastrophic forgetting
//! - per-method optimizer parameter groups, including the anchored
//!   [`optim::RecAdam`] path that penalizes drift from pretrained
//!   weights
//! - a [`train::RoundController`] driving the epoch/step loop with
//!   gradient accumulation and one-cycle learning rate scheduling
//! - a [`distill::DistillationController`] that bootstraps a teacher
//!   and distills it into each round's student
//! - [`eval`] scoring of generated answers by normalized exact match
//!   and strict accuracy
//!
//! Model architectures stay behind the [`model::Seq2SeqModel`]
//! capability trait; the harness never inspects their internals.
//!
//! # Example
//!
//! ```
//! use retener::codec::{Codec, VocabCodec};
//! use retener::config::TrainConfig;
//! use retener::data::{Dataset, Example};
//! use retener::distill::DistillationController;
//! use retener::model::ModelRegistry;
//! use retener::train::RoundController;
//! use std::rc::Rc;
//!
//! let codec = Rc::new(VocabCodec::from_corpus(["capital of france paris"]));
//! let config = TrainConfig::default().with_epochs(1).with_batch_size(2);
//! let registry = ModelRegistry::with_builtins("s2s", codec.vocab_size());
//! let model = registry.build(&config).unwrap();
//!
//! let mut round = RoundController::new(config, codec.clone(), model).with_seed(42);
//! let examples = vec![
//!     Example::new("capital of france", "paris", "P36"),
//!     Example::new("capital of france", "paris", "P36"),
//! ];
//! round.set_dataset(Dataset::new(examples, codec), false).unwrap();
//!
//! let mut distiller = DistillationController::new();
//! let report = round.fit(&mut distiller).unwrap();
//! assert!(report.loss.is_finite());
//! ```

pub mod codec;
pub mod config;
pub mod data;
pub mod distill;
pub mod error;
pub mod eval;
pub mod model;
pub mod optim;
pub mod replay;
pub mod tensor;
pub mod train;

pub use config::{FreezeLevel, Method, TrainConfig};
pub use error::{Error, Result};
pub use tensor::Tensor;
