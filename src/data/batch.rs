//! Encoded training batch

use super::{Example, IGNORE_INDEX};
use crate::codec::Codec;
use ndarray::Array2;

/// A batch of encoded examples: id blocks plus attention masks
///
/// Sequences are padded to the longest member of the batch. Masks hold
/// 1 for real tokens and 0 for padding.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Source token ids `[batch, src_len]`
    pub source_ids: Array2<i64>,
    /// Source attention mask `[batch, src_len]`
    pub source_mask: Array2<i64>,
    /// Target token ids `[batch, tgt_len]`
    pub target_ids: Array2<i64>,
    /// Target attention mask `[batch, tgt_len]`
    pub target_mask: Array2<i64>,
}

impl Batch {
    /// Encode a slice of examples into a padded batch
    pub fn from_examples(examples: &[Example], codec: &dyn Codec) -> Self {
        let sources: Vec<Vec<i64>> = examples.iter().map(|e| codec.encode(&e.source)).collect();
        let targets: Vec<Vec<i64>> = examples.iter().map(|e| codec.encode(&e.target)).collect();
        let (source_ids, source_mask) = pad_block(&sources, codec.pad_token_id());
        let (target_ids, target_mask) = pad_block(&targets, codec.pad_token_id());
        Self {
            source_ids,
            source_mask,
            target_ids,
            target_mask,
        }
    }

    /// Number of examples in the batch
    #[must_use]
    pub fn size(&self) -> usize {
        self.source_ids.nrows()
    }

    /// Target ids as row vectors (for decoding references)
    #[must_use]
    pub fn target_rows(&self) -> Vec<Vec<i64>> {
        self.target_ids.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    /// Source ids as row vectors
    #[must_use]
    pub fn source_rows(&self) -> Vec<Vec<i64>> {
        self.source_ids.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    /// Loss labels: target ids with padding mapped to the ignore sentinel
    #[must_use]
    pub fn masked_labels(&self, pad_token_id: i64) -> Array2<i64> {
        self.target_ids
            .mapv(|id| if id == pad_token_id { IGNORE_INDEX } else { id })
    }
}

/// Pad ragged id rows into a rectangular block and its 0/1 mask
fn pad_block(rows: &[Vec<i64>], pad_id: i64) -> (Array2<i64>, Array2<i64>) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let mut ids = Array2::from_elem((rows.len(), width), pad_id);
    let mut mask = Array2::zeros((rows.len(), width));
    for (r, row) in rows.iter().enumerate() {
        for (c, &id) in row.iter().enumerate() {
            ids[[r, c]] = id;
            mask[[r, c]] = 1;
        }
    }
    (ids, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VocabCodec;

    fn codec() -> VocabCodec {
        VocabCodec::new(["capital", "of", "france", "paris", "japan", "tokyo"])
    }

    #[test]
    fn test_batch_pads_to_longest() {
        let examples = vec![
            Example::new("capital of france", "paris", "P36"),
            Example::new("capital", "tokyo", "P36"),
        ];
        let batch = Batch::from_examples(&examples, &codec());
        assert_eq!(batch.size(), 2);
        assert_eq!(batch.source_ids.ncols(), 3);
        // second row is padded after the first token
        assert_eq!(batch.source_mask[[1, 0]], 1);
        assert_eq!(batch.source_mask[[1, 1]], 0);
        assert_eq!(batch.source_ids[[1, 2]], crate::codec::PAD_ID);
    }

    #[test]
    fn test_masked_labels_replace_padding() {
        let examples = vec![
            Example::new("capital of france", "paris", "P36"),
            Example::new("capital of japan", "tokyo japan", "P36"),
        ];
        let c = codec();
        let batch = Batch::from_examples(&examples, &c);
        let labels = batch.masked_labels(c.pad_token_id());
        // first target is one token; its second position was padding
        assert_eq!(labels[[0, 1]], IGNORE_INDEX);
        assert_ne!(labels[[0, 0]], IGNORE_INDEX);
        assert_ne!(labels[[1, 1]], IGNORE_INDEX);
    }

    #[test]
    fn test_target_rows_round_trip() {
        let examples = vec![Example::new("capital of france", "paris", "P36")];
        let c = codec();
        let batch = Batch::from_examples(&examples, &c);
        let rows = batch.target_rows();
        assert_eq!(crate::codec::ids_to_clean_text(&c, &rows), vec!["paris"]);
    }
}
