//! Answer normalization and batch scoring

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Placeholder/sentinel tokens stripped during normalization
const SENTINELS: [&str; 3] = ["_x_", "<extra_id_0>", "<extra_id_1>"];

fn article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(a|an|the)\b").expect("static article pattern"))
}

/// Canonicalize an answer string
///
/// Lower-cases, strips sentinel tokens, removes punctuation, drops
/// English articles as whole words and collapses whitespace. Idempotent.
#[must_use]
pub fn normalize_answer(s: &str) -> String {
    let mut text = s.to_lowercase();
    for sentinel in SENTINELS {
        text = text.replace(sentinel, " ");
    }
    let no_punct: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    let no_articles = article_re().replace_all(&no_punct, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 1 if the normalized forms match exactly, else 0
#[must_use]
pub fn exact_match(prediction: &str, ground_truth: &str) -> u8 {
    u8::from(normalize_answer(prediction) == normalize_answer(ground_truth))
}

/// 1 if the raw trimmed strings match exactly, else 0 (no normalization)
#[must_use]
pub fn accuracy_match(prediction: &str, ground_truth: &str) -> u8 {
    u8::from(prediction.trim() == ground_truth.trim())
}

/// Batch score: (exact-match %, strict-accuracy %), both in [0, 100]
///
/// # Errors
///
/// `Error::BatchMismatch` if the batches differ in length,
/// `Error::EmptyBatch` if both are empty.
pub fn score(predictions: &[String], ground_truths: &[String]) -> Result<(f32, f32)> {
    if predictions.len() != ground_truths.len() {
        return Err(Error::BatchMismatch {
            predictions: predictions.len(),
            references: ground_truths.len(),
        });
    }
    if predictions.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let mut em_total = 0u32;
    let mut acc_total = 0u32;
    for (pred, truth) in predictions.iter().zip(ground_truths) {
        em_total += u32::from(exact_match(pred, truth));
        acc_total += u32::from(accuracy_match(pred, truth));
    }

    let n = predictions.len() as f32;
    Ok((
        em_total as f32 / n * 100.0,
        acc_total as f32 / n * 100.0,
    ))
}
