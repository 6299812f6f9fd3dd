//! Core domain types shared across the pipeline: [`Document`], [`Chunk`],
//! and the closed vocabularies that drive scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the match a document represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Resume,
    JobDescription,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Resume => write!(f, "resume"),
            FileType::JobDescription => write!(f, "job_description"),
        }
    }
}

/// Lifecycle state of a [`Document`]'s embedding pipeline.
///
/// `pending` → `processing` → `completed` | `failed`. Matching refuses any
/// document whose status isn't `completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmbeddingStatus::Pending => "pending",
            EmbeddingStatus::Processing => "processing",
            EmbeddingStatus::Completed => "completed",
            EmbeddingStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Closed section vocabulary. Résumés and job descriptions use disjoint tags
/// (other than `Other`), and the tag drives both chunk classification
/// (§4.2) and section weighting in the matching engine (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    // Résumé sections
    Summary,
    Experience,
    Skills,
    Education,
    Projects,
    Certifications,
    // JD sections
    Requirements,
    Preferred,
    Responsibilities,
    Technical,
    Benefits,
    // Shared fallback
    Other,
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionType::Summary => "summary",
            SectionType::Experience => "experience",
            SectionType::Skills => "skills",
            SectionType::Education => "education",
            SectionType::Projects => "projects",
            SectionType::Certifications => "certifications",
            SectionType::Requirements => "requirements",
            SectionType::Preferred => "preferred",
            SectionType::Responsibilities => "responsibilities",
            SectionType::Technical => "technical",
            SectionType::Benefits => "benefits",
            SectionType::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// A server-generated identifier for a [`Document`]. This is the only
/// identifier downstream matching code is allowed to use; `file_id` is a
/// client-facing handle and must never leak into matching logic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DocumentId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

/// A client-visible handle for an uploaded file. Convenience only — never
/// used as a matching identity (see §9 "Implicit cross-identifier coupling").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FileId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

/// An uploaded artifact (résumé or job description) with lifecycle state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub document_id: DocumentId,
    pub file_id: FileId,
    pub filename: String,
    pub file_type: FileType,
    pub raw_text: String,
    pub cleaned_text: String,
    pub word_count: usize,
    pub char_count: usize,
    pub page_count: Option<u32>,
    pub language: String,
    pub embedding_status: EmbeddingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new document in the `pending` lifecycle state, as required
    /// by §3 ("A Document is created on ingestion and immediately set
    /// pending").
    pub fn new_pending(
        filename: impl Into<String>,
        file_type: FileType,
        raw_text: String,
        cleaned_text: String,
        language: String,
        page_count: Option<u32>,
    ) -> Self {
        let now = Utc::now();
        let word_count = cleaned_text.split_whitespace().count();
        let char_count = cleaned_text.chars().count();
        Self {
            document_id: DocumentId::new(),
            file_id: FileId::new(),
            filename: filename.into(),
            file_type,
            raw_text,
            cleaned_text,
            word_count,
            char_count,
            page_count,
            language,
            embedding_status: EmbeddingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A bounded text region of a [`Document`], the atomic unit of embedding and
/// matching. Owned by exactly one document (cascade delete); eligible for
/// matching iff `embedding` is `Some`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub content: String,
    pub section_type: SectionType,
    pub char_count: usize,
    pub token_count: usize,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
}

impl Chunk {
    pub fn is_matchable(&self) -> bool {
        self.embedding.is_some()
    }
}
