//! Method-to-model factory registry and freeze policy
//!
//! Replaces scattered string matching on the method name with a closed
//! mapping from [`Method`] to a factory producing a [`Seq2SeqModel`].
//! After construction the freeze policy runs: first the freeze level,
//! then method-specific re-enabling of adapter parameters.

use super::{Seq2SeqModel, StubModel};
use crate::config::{FreezeLevel, Method, TrainConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Factory producing a model for a given configuration
pub type ModelFactory = Box<dyn Fn(&TrainConfig) -> Box<dyn Seq2SeqModel>>;

/// Registry mapping methods to model factories
pub struct ModelRegistry {
    factories: HashMap<Method, ModelFactory>,
}

impl ModelRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with stub factories for every recognized method
    ///
    /// Adapter methods get stub models whose adapter parameter names
    /// carry the tag the freeze policy matches on, mirroring the naming
    /// of the real architecture variants.
    #[must_use]
    pub fn with_builtins(backbone: &'static str, vocab_size: usize) -> Self {
        let mut registry = Self::new();
        for method in Method::all() {
            let factory: ModelFactory = match method {
                Method::Modular => Box::new(move |_: &TrainConfig| {
                    Box::new(StubModel::new(backbone, vocab_size).with_adapter("modular")) as _
                }),
                Method::ModularSmall => Box::new(move |_: &TrainConfig| {
                    Box::new(StubModel::new(backbone, vocab_size).with_adapter("encoder_modular"))
                        as _
                }),
                Method::Kadapter2 | Method::Kadapter3 | Method::Lora => {
                    Box::new(move |config: &TrainConfig| {
                        Box::new(
                            StubModel::new(backbone, vocab_size)
                                .with_adapter(config.method.tag()),
                        ) as _
                    })
                }
                _ => Box::new(move |_: &TrainConfig| {
                    Box::new(StubModel::new(backbone, vocab_size)) as _
                }),
            };
            registry.register(method, factory);
        }
        registry
    }

    /// Register (or replace) the factory for a method
    pub fn register(&mut self, method: Method, factory: ModelFactory) {
        self.factories.insert(method, factory);
    }

    /// Build a model for the configured method and apply the freeze policy
    pub fn build(&self, config: &TrainConfig) -> Result<Box<dyn Seq2SeqModel>> {
        let factory =
            self.factories
                .get(&config.method)
                .ok_or_else(|| Error::UnregisteredMethod {
                    method: config.method.tag().to_string(),
                })?;
        let model = factory(config);
        apply_freeze_policy(model.as_ref(), config);
        Ok(model)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the configured freeze level, then re-enable adapter parameters
/// for the methods that train only their own additions
pub fn apply_freeze_policy(model: &dyn Seq2SeqModel, config: &TrainConfig) {
    match config.freeze_level {
        FreezeLevel::None => {}
        FreezeLevel::Encoder => {
            for param in model.encoder_parameters() {
                param.set_requires_grad(false);
            }
        }
        FreezeLevel::All => {
            for param in model.parameters() {
                param.set_requires_grad(false);
            }
        }
    }

    let reenable_tag = match config.method {
        Method::ModularSmall => Some("encoder_modular"),
        Method::Kadapter2 | Method::Kadapter3 | Method::Lora => Some(config.method.tag()),
        _ => None,
    };
    if let Some(tag) = reenable_tag {
        for (name, param) in model.named_parameters() {
            if name.contains(tag) {
                param.set_requires_grad(true);
            }
        }
    }
}
