use std::path::Path;
use std::str::FromStr;

use crate::error::DataError;

/// Token ids and their attention mask, unpadded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl Encoded {
    pub fn truncate(&mut self, max_length: usize) {
        self.ids.truncate(max_length);
        self.attention_mask.truncate(max_length);
    }
}

/// Text to token ids for summary text.
pub trait SummaryTokenizer: Send + Sync {
    /// Encodes `text`, truncating to at most `max_length` tokens. Never pads.
    fn encode(&self, text: &str, max_length: usize) -> Result<Encoded, DataError>;

    fn eos_token_id(&self) -> u32;

    /// Filler used when padding summaries in a batch. Same as eos unless overridden.
    fn pad_token_id(&self) -> u32 {
        self.eos_token_id()
    }

    fn vocab_size(&self) -> usize;
}

/// [SummaryTokenizer] backed by a HuggingFace `tokenizers` model.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    eos_token_id: u32,
    pad_token_id: u32,
}

impl HfTokenizer {
    /// Wraps a tokenizer, looking up `eos_token` in its vocabulary. The pad
    /// token is set to the eos token.
    pub fn new(inner: tokenizers::Tokenizer, eos_token: &str) -> Result<Self, DataError> {
        let eos_token_id = inner.token_to_id(eos_token).ok_or_else(|| {
            DataError::Tokenizer(format!("eos token {eos_token:?} is not in the vocabulary"))
        })?;

        Ok(Self {
            inner,
            eos_token_id,
            pad_token_id: eos_token_id,
        })
    }

    /// Loads a `tokenizer.json` file, e.g. the GPT-2 one with `<|endoftext|>`.
    pub fn from_file<P: AsRef<Path>>(path: P, eos_token: &str) -> Result<Self, DataError> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            DataError::Tokenizer(format!("cannot load {}: {e}", path.display()))
        })?;
        tracing::info!("loaded tokenizer from {}", path.display());

        Self::new(inner, eos_token)
    }

    /// Builds a whitespace word-level tokenizer over `words`. Id 0 is `[UNK]`
    /// and `eos_token` takes the id after the last word.
    pub fn word_level<S: AsRef<str>>(words: &[S], eos_token: &str) -> Result<Self, DataError> {
        let mut vocab = serde_json::Map::new();
        vocab.insert("[UNK]".to_string(), 0.into());
        for word in words {
            let next_id = vocab.len();
            vocab
                .entry(word.as_ref().to_string())
                .or_insert_with(|| next_id.into());
        }
        let eos_id = vocab.len();
        vocab.insert(eos_token.to_string(), eos_id.into());

        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": eos_id, "content": eos_token, "single_word": false, "lstrip": false,
                 "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let inner = tokenizers::Tokenizer::from_str(&json.to_string())
            .map_err(|e| DataError::Tokenizer(format!("invalid word level vocabulary: {e}")))?;

        Self::new(inner, eos_token)
    }

    pub fn with_pad_token_id(mut self, pad_token_id: u32) -> Self {
        self.pad_token_id = pad_token_id;
        self
    }

    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }
}

impl SummaryTokenizer for HfTokenizer {
    fn encode(&self, text: &str, max_length: usize) -> Result<Encoded, DataError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| DataError::Tokenizer(e.to_string()))?;

        let mut encoded = Encoded {
            ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        };
        encoded.truncate(max_length);

        Ok(encoded)
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> HfTokenizer {
        HfTokenizer::word_level(&["energy", "grid", "plan", "."], "<|endoftext|>").unwrap()
    }

    #[test]
    fn word_level_ids_follow_word_order() {
        let tokenizer = tokenizer();
        let encoded = tokenizer.encode("grid energy plan", 16).unwrap();

        assert_eq!(encoded.ids, vec![2, 1, 3]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1]);
        assert_eq!(tokenizer.eos_token_id(), 5);
        assert_eq!(tokenizer.pad_token_id(), 5);
    }

    #[test]
    fn unknown_words_map_to_unk() {
        let encoded = tokenizer().encode("grid solar", 16).unwrap();
        assert_eq!(encoded.ids, vec![2, 0]);
    }

    #[test]
    fn encode_truncates_without_padding() {
        let encoded = tokenizer().encode("grid grid grid grid", 2).unwrap();

        assert_eq!(encoded.ids, vec![2, 2]);
        assert_eq!(encoded.attention_mask.len(), 2);

        let short = tokenizer().encode("plan", 8).unwrap();
        assert_eq!(short.ids.len(), 1);
    }

    #[test]
    fn pad_token_can_be_overridden() {
        let tokenizer = tokenizer().with_pad_token_id(0);
        assert_eq!(tokenizer.pad_token_id(), 0);
        assert_eq!(tokenizer.eos_token_id(), 5);
    }

    #[test]
    fn missing_eos_token_is_an_error() {
        let inner = tokenizer().inner().clone();
        assert!(matches!(
            HfTokenizer::new(inner, "</s>"),
            Err(DataError::Tokenizer(_))
        ));
    }
}
