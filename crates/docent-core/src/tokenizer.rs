//! Model-specific token counting, encoding, and decoding.
//!
//! Budgets are enforced with the same BPE the completion service uses
//! (`tiktoken`), so a passage or prompt that fits here fits there.
//! Special-token markup in the input is encoded as ordinary text.
//!
//! # Example
//!
//! ```rust
//! use docent_core::tokenizer::Tokenizer;
//!
//! let tok = Tokenizer::for_model("gpt-3.5-turbo").unwrap();
//! let ids = tok.encode("hello world");
//! assert_eq!(tok.count("hello world"), ids.len());
//! assert_eq!(tok.decode(&ids).unwrap(), "hello world");
//! ```

use std::fmt;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::{DocentError, Result};

/// Token id as produced by the BPE.
pub type TokenId = u32;

/// A loaded BPE for one model. Clones share the underlying tables.
#[derive(Clone)]
pub struct Tokenizer {
    model: String,
    bpe: Arc<CoreBPE>,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Result of cutting a string down to a token limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub original_tokens: usize,
    pub kept_tokens: usize,
}

impl Truncated {
    pub fn was_truncated(&self) -> bool {
        self.kept_tokens < self.original_tokens
    }
}

impl Tokenizer {
    /// Resolve the encoding for `model` (e.g. `"gpt-3.5-turbo"`,
    /// `"text-embedding-ada-002"`).
    ///
    /// # Errors
    ///
    /// [`DocentError::UnknownModel`] if no encoding is known for the id.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|_| DocentError::UnknownModel {
            model: model.to_string(),
        })?;
        Ok(Self {
            model: model.to_string(),
            bpe: Arc::new(bpe),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe.encode_ordinary(text)
    }

    pub fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Decode token ids back into text.
    ///
    /// Fails when the ids end in the middle of a multi-byte character.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        self.bpe
            .decode(ids.to_vec())
            .map_err(|e| DocentError::Decode {
                model: self.model.clone(),
                reason: e.to_string(),
            })
    }

    /// Keep at most `max_tokens` leading tokens of `text`.
    ///
    /// When the cut lands inside a multi-byte character the prefix is
    /// shortened token by token until it decodes cleanly.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> Truncated {
        let ids = self.encode(text);
        let original_tokens = ids.len();
        if original_tokens <= max_tokens {
            return Truncated {
                text: text.to_string(),
                original_tokens,
                kept_tokens: original_tokens,
            };
        }

        let mut end = max_tokens;
        while end > 0 {
            if let Ok(prefix) = self.decode(&ids[..end]) {
                return Truncated {
                    text: prefix,
                    original_tokens,
                    kept_tokens: end,
                };
            }
            end -= 1;
        }

        Truncated {
            text: String::new(),
            original_tokens,
            kept_tokens: 0,
        }
    }
}

/// Number of tokens in `text` under `model`'s encoding.
///
/// Loads the encoding on every call; hold a [`Tokenizer`] in hot paths.
pub fn num_tokens(text: &str, model: &str) -> Result<usize> {
    Ok(Tokenizer::for_model(model)?.count(text))
}

pub fn encode(text: &str, model: &str) -> Result<Vec<TokenId>> {
    Ok(Tokenizer::for_model(model)?.encode(text))
}

pub fn decode(ids: &[TokenId], model: &str) -> Result<String> {
    Tokenizer::for_model(model)?.decode(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok() -> Tokenizer {
        Tokenizer::for_model("gpt-3.5-turbo").unwrap()
    }

    #[test]
    fn test_unknown_model() {
        let err = Tokenizer::for_model("definitely-not-a-model").unwrap_err();
        assert!(matches!(err, DocentError::UnknownModel { ref model } if model == "definitely-not-a-model"));
    }

    #[test]
    fn test_free_functions_agree() {
        let text = "Manchester United were founded as Newton Heath LYR in 1878.";
        let ids = encode(text, "gpt-3.5-turbo").unwrap();
        assert_eq!(num_tokens(text, "gpt-3.5-turbo").unwrap(), ids.len());
        assert_eq!(decode(&ids, "gpt-3.5-turbo").unwrap(), text);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(tok().count(""), 0);
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        let t = tok().truncate("short text", 100);
        assert!(!t.was_truncated());
        assert_eq!(t.text, "short text");
    }

    #[test]
    fn test_truncate_cuts_to_limit() {
        let tok = tok();
        let text = "word ".repeat(500);
        let t = tok.truncate(&text, 50);
        assert!(t.was_truncated());
        assert_eq!(t.kept_tokens, 50);
        assert!(tok.count(&t.text) <= 50);
        assert!(text.starts_with(&t.text));
    }

    #[test]
    fn test_truncate_multibyte_decodes() {
        let tok = tok();
        let text = "表示 ┌──┐ 🦀🦀🦀 ".repeat(40);
        for limit in 1..20 {
            let t = tok.truncate(&text, limit);
            assert!(t.kept_tokens <= limit);
            assert!(text.starts_with(&t.text));
        }
    }

    #[test]
    fn test_decode_inside_character_fails() {
        let tok = tok();
        let ids = tok.encode("表示 ┌──┐ 🦀🦀🦀");
        let err = (1..ids.len())
            .find_map(|end| tok.decode(&ids[..end]).err())
            .expect("some prefix ends inside a multi-byte character");
        assert!(matches!(err, DocentError::Decode { ref model, .. } if model == "gpt-3.5-turbo"));
        assert!(!err.is_transient());
    }
}
