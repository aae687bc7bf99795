//! A single knowledge-probing example

use serde::{Deserialize, Serialize};

/// One training instance: a probe, its answer, and a relation label
///
/// Immutable once created. The relation label drives replay-buffer
/// stratification (time-invariant relations are eligible for rehearsal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Source text (the probe)
    pub source: String,
    /// Target text (the answer)
    pub target: String,
    /// Relation/category label, e.g. a Wikidata property id
    pub relation: String,
}

impl Example {
    /// Create an example
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_construction() {
        let ex = Example::new("birthplace of X", "paris", "P19");
        assert_eq!(ex.relation, "P19");
        assert_eq!(ex.target, "paris");
    }

    #[test]
    fn test_example_serde() {
        let ex = Example::new("s", "t", "P20");
        let json = serde_json::to_string(&ex).unwrap();
        let back: Example = serde_json::from_str(&json).unwrap();
        assert_eq!(ex, back);
    }
}
