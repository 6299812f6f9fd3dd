//! Vector Store (spec §4.5): a relational store with a vector extension,
//! exposing the document/chunk schema and the similarity RPCs the matching
//! engine consumes. [`sqlite`] provides the only shipped backend; the
//! [`VectorStore`] trait is the seam a future Postgres/pgvector backend
//! would implement.

pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, Document, DocumentId, EmbeddingStatus, FileId, FileType};

pub use sqlite::SqliteStore;

/// Either identifier a caller may use to look up a document. `file_id` is
/// the client-facing handle; `document_id` is the matching identity.
/// Exactly one field is ever used to resolve a lookup — see spec §9 on the
/// source's historical conflation of the two.
#[derive(Clone, Debug)]
pub enum DocumentLookup {
    ByDocumentId(DocumentId),
    ByFileId(FileId),
}

/// A single chunk-to-chunk similarity hit returned by a kNN query.
#[derive(Clone, Debug)]
pub struct ChunkMatch {
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub content: String,
    pub section_type: crate::types::SectionType,
    /// Cosine similarity, clipped to `[0, 1]`.
    pub similarity: f32,
}

/// Abstract vector-store operations consumed by the ingestion orchestrator
/// and the matching engine. Backend-agnostic: no SQL dialect leaks through
/// this trait.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces a document row. Returns its `document_id`.
    async fn upsert_document(&self, doc: &Document) -> Result<DocumentId>;

    /// Replaces all chunks for `document_id` atomically (delete-then-insert
    /// within one transaction), satisfying the idempotent-re-ingestion
    /// requirement in spec §5.
    async fn insert_chunks(&self, document_id: &DocumentId, chunks: Vec<Chunk>) -> Result<()>;

    /// Atomically transitions a document's `embedding_status`.
    async fn set_status(&self, document_id: &DocumentId, status: EmbeddingStatus) -> Result<()>;

    /// Looks up a document by either identifier.
    async fn get_document(&self, lookup: DocumentLookup) -> Result<Option<Document>>;

    /// Returns the number of chunks stored for a document (matchable or
    /// not), used for status/shape endpoints.
    async fn chunk_count(&self, document_id: &DocumentId) -> Result<usize>;

    /// Deletes a document by `file_id`, cascading to its chunks and
    /// embeddings.
    async fn delete_document(&self, file_id: &FileId) -> Result<()>;

    /// kNN over chunk embeddings, optionally filtered by file type or a
    /// specific document. Returns similarities in `[0, 1]`, most similar
    /// first.
    async fn match_documents(
        &self,
        query_vec: &[f32],
        k: usize,
        filter_file_type: Option<FileType>,
        filter_document_id: Option<&DocumentId>,
        min_similarity: f32,
    ) -> Result<Vec<ChunkMatch>>;

    /// For each chunk in `resume_document_id`, its top-`top_k` most similar
    /// chunks in `jd_document_id`.
    async fn match_documents_by_file(
        &self,
        resume_document_id: &DocumentId,
        jd_document_id: &DocumentId,
        top_k: usize,
    ) -> Result<Vec<(ChunkMatch, ChunkMatch)>>;

    /// Cosine similarity between the two documents' chunk-embedding
    /// centroids. Returns `0.0` if either centroid is undefined (no
    /// embedded chunks).
    async fn overall_similarity(&self, doc_a: &DocumentId, doc_b: &DocumentId) -> Result<f32>;
}

/// Clips a raw cosine similarity into the `[0, 1]` range the wire contract
/// guarantees (spec §4.5: "All similarity values returned are in [0,1]
/// (clipped)").
pub fn clip_similarity(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    clip_similarity(dot / (norm_a * norm_b))
}

pub fn centroid(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    if vectors.is_empty() {
        return None;
    }
    let dim = vectors[0].len();
    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        for (acc, value) in sum.iter_mut().zip(v.iter()) {
            *acc += value;
        }
    }
    let n = vectors.len() as f32;
    for value in sum.iter_mut() {
        *value /= n;
    }
    Some(sum)
}
