//! Text/token-id codec boundary
//!
//! The harness treats tokenization as an external collaborator: anything
//! that can encode text to ids and decode ids back is usable. `VocabCodec`
//! is a small word-level implementation for tests and demos.

use std::collections::HashMap;

/// Token id reserved for padding in `VocabCodec`
pub const PAD_ID: i64 = 0;
/// Token id reserved for end-of-sequence in `VocabCodec`
pub const EOS_ID: i64 = 1;
/// Token id reserved for unknown words in `VocabCodec`
pub const UNK_ID: i64 = 2;

/// Text <-> token-id codec
pub trait Codec {
    /// Encode text into token ids (no padding, no EOS)
    fn encode(&self, text: &str) -> Vec<i64>;

    /// Decode ids into text, optionally dropping special tokens
    fn decode(&self, ids: &[i64], skip_special: bool) -> String;

    /// Decode a batch of id sequences
    fn batch_decode(&self, batch: &[Vec<i64>], skip_special: bool) -> Vec<String> {
        batch.iter().map(|ids| self.decode(ids, skip_special)).collect()
    }

    /// Id used for padding
    fn pad_token_id(&self) -> i64;

    /// Whether an id is a special token (pad, eos, ...)
    fn is_special(&self, id: i64) -> bool;

    /// Vocabulary size
    fn vocab_size(&self) -> usize;
}

/// Decode generated ids to clean text: drop special tokens, trim whitespace
pub fn ids_to_clean_text(codec: &dyn Codec, batch: &[Vec<i64>]) -> Vec<String> {
    codec
        .batch_decode(batch, true)
        .into_iter()
        .map(|text| text.trim().to_string())
        .collect()
}

/// Word-level codec over a fixed vocabulary
///
/// Ids 0..3 are reserved for pad, eos and unk. Unknown words decode to
/// an empty string so they vanish under whitespace collapsing.
pub struct VocabCodec {
    words: Vec<String>,
    index: HashMap<String, i64>,
}

impl VocabCodec {
    /// Build a codec over the given word list
    pub fn new<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        let mut table: Vec<String> = vec!["<pad>".into(), "</s>".into(), "<unk>".into()];
        table.extend(words.into_iter().map(Into::into));
        let index = table
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as i64))
            .collect();
        Self {
            words: table,
            index,
        }
    }

    /// Build a codec from the whitespace-separated words of a corpus
    pub fn from_corpus<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = HashMap::new();
        let mut words = Vec::new();
        for text in texts {
            for word in text.split_whitespace() {
                if seen.insert(word.to_string(), ()).is_none() {
                    words.push(word.to_string());
                }
            }
        }
        Self::new(words)
    }
}

impl Codec for VocabCodec {
    fn encode(&self, text: &str) -> Vec<i64> {
        text.split_whitespace()
            .map(|word| self.index.get(word).copied().unwrap_or(UNK_ID))
            .collect()
    }

    fn decode(&self, ids: &[i64], skip_special: bool) -> String {
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| !(skip_special && self.is_special(id)))
            .filter_map(|&id| self.words.get(id as usize).map(String::as_str))
            .collect();
        words.join(" ")
    }

    fn pad_token_id(&self) -> i64 {
        PAD_ID
    }

    fn is_special(&self, id: i64) -> bool {
        id == PAD_ID || id == EOS_ID || id == UNK_ID
    }

    fn vocab_size(&self) -> usize {
        self.words.len()
    }
}
