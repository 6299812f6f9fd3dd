//! Text extraction seam (spec §1: "PDF text extraction... delegates to a
//! PDF parser and a text cleaner" — explicitly out of scope for the core).
//!
//! [`TextExtractor`] is the boundary the upload handler depends on; a real
//! deployment plugs in a PDF-parsing implementation (e.g. an
//! `oxidize-pdf`-backed one) here. The one shipped in this crate only
//! handles UTF-8 plain text uploads directly, since a PDF parser is a
//! distinct concern this exercise's core doesn't own.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: Option<u32>,
    pub parser_used: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("failed to decode file contents as text: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<ExtractedText, ExtractError>;
}

/// Accepts `.txt`/`.md` uploads verbatim. PDF uploads are rejected here —
/// wiring a real PDF parser behind this trait is out of this core's scope
/// (spec §1), not something this stand-in can emulate responsibly.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            return Err(ExtractError::UnsupportedFileType(
                "pdf extraction requires a configured PDF-parsing TextExtractor".to_string(),
            ));
        }
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        Ok(ExtractedText {
            text,
            page_count: None,
            parser_used: "plain-text",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_plain_text_verbatim() {
        let extractor = PlainTextExtractor;
        let result = extractor
            .extract("resume.txt", b"Summary\n\nBuilt things.")
            .await
            .unwrap();
        assert_eq!(result.text, "Summary\n\nBuilt things.");
        assert_eq!(result.parser_used, "plain-text");
    }

    #[tokio::test]
    async fn rejects_pdf_uploads() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract("resume.pdf", b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
    }
}
