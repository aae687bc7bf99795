//! Optimizer parameter group construction
//!
//! Two orthogonal predicates drive the partition: whether a parameter
//! name matches a no-decay pattern (biases, normalization weights), and
//! whether it lives in the core architecture namespace. The standard
//! path crosses only the first; the anchored path crosses both and
//! pairs every group with the matching frozen pretrained parameters.

use crate::error::{Error, Result};
use crate::model::Seq2SeqModel;
use crate::tensor::Tensor;

/// Name patterns excluded from weight decay
pub const NO_DECAY_PATTERNS: [&str; 2] = ["bias", "layer_norm.weight"];

/// A named partition of parameters with shared optimization settings
#[derive(Debug)]
pub struct ParamGroup {
    /// Diagnostic name
    pub name: String,
    /// Parameters in this group
    pub params: Vec<Tensor>,
    /// Weight decay coefficient
    pub weight_decay: f32,
    /// Anneal weight for the anchor pull (0 disables anchoring)
    pub anneal_w: f32,
    /// Pretrained anchor parameters, index-aligned with `params`
    /// (empty when `anneal_w` is 0 and no anchoring applies)
    pub pretrain_params: Vec<Tensor>,
}

impl ParamGroup {
    /// Group without anchoring
    #[must_use]
    pub fn plain(name: impl Into<String>, params: Vec<Tensor>, weight_decay: f32) -> Self {
        Self {
            name: name.into(),
            params,
            weight_decay,
            anneal_w: 0.0,
            pretrain_params: Vec::new(),
        }
    }
}

fn matches_no_decay(name: &str) -> bool {
    NO_DECAY_PATTERNS.iter().any(|pattern| name.contains(pattern))
}

/// Standard partition: 2 groups, decay and no-decay
#[must_use]
pub fn standard_groups(model: &dyn Seq2SeqModel, weight_decay: f32) -> Vec<ParamGroup> {
    let named = model.named_parameters();
    let (no_decay, decay): (Vec<_>, Vec<_>) = named
        .into_iter()
        .partition(|(name, _)| matches_no_decay(name));
    vec![
        ParamGroup::plain(
            "decay",
            decay.into_iter().map(|(_, t)| t).collect(),
            weight_decay,
        ),
        ParamGroup::plain(
            "no_decay",
            no_decay.into_iter().map(|(_, t)| t).collect(),
            0.0,
        ),
    ]
}

/// Anchored partition: 4 groups crossing decay x backbone namespace
///
/// Groups inside the backbone namespace carry `anneal_w`; the others
/// carry 0. Every group is paired with the pretrained parameters whose
/// names satisfy the same predicates.
///
/// # Errors
///
/// `Error::AnchorMismatch` if the pretrained model's parameter names do
/// not partition identically to the live model's.
pub fn anchored_groups(
    model: &dyn Seq2SeqModel,
    pretrained: &dyn Seq2SeqModel,
    weight_decay: f32,
    anneal_w: f32,
) -> Result<Vec<ParamGroup>> {
    let backbone = model.backbone().to_string();
    let in_backbone = |name: &str| name.contains(backbone.as_str());

    let select = |named: &[(String, Tensor)], want_decay: bool, want_backbone: bool| {
        named
            .iter()
            .filter(|(name, _)| matches_no_decay(name) != want_decay)
            .filter(|(name, _)| in_backbone(name) == want_backbone)
            .map(|(_, t)| t.clone())
            .collect::<Vec<_>>()
    };

    let live = model.named_parameters();
    let anchor = pretrained.named_parameters();
    if live.len() != anchor.len() {
        return Err(Error::AnchorMismatch {
            detail: format!(
                "{} live parameters vs {} anchor parameters",
                live.len(),
                anchor.len()
            ),
        });
    }
    for ((live_name, _), (anchor_name, _)) in live.iter().zip(&anchor) {
        if live_name != anchor_name {
            return Err(Error::AnchorMismatch {
                detail: format!("'{live_name}' vs '{anchor_name}'"),
            });
        }
    }

    let mut groups = Vec::with_capacity(4);
    for (name, want_decay, want_backbone, wd, aw) in [
        ("decay_backbone", true, true, weight_decay, anneal_w),
        ("decay_other", true, false, weight_decay, 0.0),
        ("no_decay_backbone", false, true, 0.0, anneal_w),
        ("no_decay_other", false, false, 0.0, 0.0),
    ] {
        groups.push(ParamGroup {
            name: name.to_string(),
            params: select(&live, want_decay, want_backbone),
            weight_decay: wd,
            anneal_w: aw,
            pretrain_params: select(&anchor, want_decay, want_backbone),
        });
    }
    Ok(groups)
}
