//! Evaluation scoring
//!
//! Exact-match (normalized) and strict-accuracy (raw) comparison of
//! generated answers against references.

mod score;

pub use score::{accuracy_match, exact_match, normalize_answer, score};
