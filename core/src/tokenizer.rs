//! Token counting used by the chunker's budget (§4.3) and by chunk
//! metadata. Uses `tiktoken-rs`'s `cl100k_base` encoding — the same family
//! the `text-embedding-3-small` model (§4.4) is tokenized with — so the
//! chunker's token budget tracks what the embedder will actually see.

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

static ENCODER: Lazy<CoreBPE> =
    Lazy::new(|| tiktoken_rs::cl100k_base().expect("cl100k_base encoder must build"));

/// Counts tokens in `text` using the cl100k_base encoding.
pub fn count_tokens(text: &str) -> usize {
    ENCODER.encode_with_special_tokens(text).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_nonzero_tokens_for_nonempty_text() {
        assert!(count_tokens("Hello, world!") > 0);
    }

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn longer_text_has_more_tokens() {
        let short = count_tokens("Rust");
        let long = count_tokens("Rust is a systems programming language focused on safety and performance.");
        assert!(long > short);
    }
}
