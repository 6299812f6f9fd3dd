//! Ingestion Orchestrator (spec §4.9).
//!
//! Wires normalize → chunk → classify → embed → store into the single
//! pipeline a document goes through between upload and becoming matchable.
//! The caller gets a `document_id` back immediately after the Document row
//! is created; the remaining stages run to completion before this function
//! returns (§5 describes this as safe to run in the background — the HTTP
//! layer is expected to spawn it rather than block a request on it).

use std::sync::Arc;

use crate::chunk::{chunk_document, to_chunk_stub};
use crate::embed::{embed_with_retry, Embedder, RetryPolicy};
use crate::error::Result;
use crate::normalize::normalize;
use crate::store::VectorStore;
use crate::types::{Document, DocumentId, EmbeddingStatus, FileType};

/// Coordinates one document's path through the pipeline. Holds no
/// per-document state of its own — the store is the source of truth for
/// lifecycle status, so two orchestrator instances over the same store
/// behave identically.
pub struct IngestionOrchestrator {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    retry_policy: RetryPolicy,
}

/// Outcome of a completed (or failed) ingestion run.
#[derive(Debug)]
pub struct IngestionOutcome {
    pub document_id: DocumentId,
    pub status: EmbeddingStatus,
    pub chunk_count: usize,
    pub embedded_chunk_count: usize,
}

impl IngestionOrchestrator {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Creates the `pending` document row, immediately flips it to
    /// `processing`, and returns its id plus the already-normalized text —
    /// the split point between "caller-visible identity" and "the rest of
    /// the pipeline" that [`Self::ingest_in_background`] spawns off.
    async fn create_pending(
        &self,
        filename: &str,
        file_type: FileType,
        raw_text: String,
        page_count: Option<u32>,
    ) -> Result<(DocumentId, String)> {
        let normalized = normalize(&raw_text);
        let document = Document::new_pending(
            filename,
            file_type,
            raw_text,
            normalized.cleaned.clone(),
            normalized.language,
            page_count,
        );
        let document_id = self.store.upsert_document(&document).await?;
        tracing::debug!(document_id = %document_id, "document created, pending");

        self.store
            .set_status(&document_id, EmbeddingStatus::Processing)
            .await?;

        Ok((document_id, normalized.cleaned))
    }

    /// Runs chunk → classify → embed → insert → set-status for an
    /// already-`processing` document. Free of `&self` captures so a
    /// background task can own its own clones of the store/embedder
    /// without borrowing the orchestrator across an `.await` spawn.
    async fn run_pipeline(
        store: &Arc<dyn VectorStore>,
        embedder: &Arc<dyn Embedder>,
        retry_policy: RetryPolicy,
        document_id: &DocumentId,
        cleaned_text: &str,
        file_type: FileType,
    ) -> Result<IngestionOutcome> {
        let plan = chunk_document(document_id, cleaned_text, file_type);
        let stubs: Vec<_> = plan
            .chunks
            .iter()
            .map(|(idx, content, section)| to_chunk_stub(document_id, *idx, content, *section))
            .collect();
        tracing::debug!(document_id = %document_id, chunk_count = stubs.len(), "chunked");

        if stubs.is_empty() {
            store.set_status(document_id, EmbeddingStatus::Failed).await?;
            return Ok(IngestionOutcome {
                document_id: document_id.clone(),
                status: EmbeddingStatus::Failed,
                chunk_count: 0,
                embedded_chunk_count: 0,
            });
        }

        let texts: Vec<String> = stubs.iter().map(|c| c.content.clone()).collect();
        let outcomes = embed_with_retry(embedder.as_ref(), &texts, retry_policy).await;
        crate::embed::assert_positional_alignment(&texts, &outcomes)?;

        let model_tag = embedder.model_tag();
        let mut embedded_count = 0usize;
        let chunks: Vec<_> = stubs
            .into_iter()
            .zip(outcomes)
            .map(|(mut chunk, embedding)| {
                if let Some(vec) = embedding {
                    chunk.embedding = Some(vec);
                    chunk.embedding_model = Some(model_tag.to_string());
                    embedded_count += 1;
                }
                chunk
            })
            .collect();

        let chunk_count = chunks.len();
        store.insert_chunks(document_id, chunks).await?;

        let final_status = if embedded_count == chunk_count {
            EmbeddingStatus::Completed
        } else {
            EmbeddingStatus::Failed
        };
        store.set_status(document_id, final_status).await?;
        tracing::debug!(
            document_id = %document_id,
            %final_status,
            embedded_count,
            chunk_count,
            "ingestion finished"
        );

        Ok(IngestionOutcome {
            document_id: document_id.clone(),
            status: final_status,
            chunk_count,
            embedded_chunk_count: embedded_count,
        })
    }

    /// Runs the full pipeline for a freshly extracted file and waits for it
    /// to finish. `raw_text` is the external `TextExtractor`'s output, not
    /// yet normalized — that's this orchestrator's first step. Used by
    /// tests and any caller that wants the final outcome synchronously.
    #[tracing::instrument(skip(self, raw_text), fields(filename = %filename.as_ref()))]
    pub async fn ingest(
        &self,
        filename: impl AsRef<str>,
        file_type: FileType,
        raw_text: String,
        page_count: Option<u32>,
    ) -> Result<IngestionOutcome> {
        let (document_id, cleaned) = self
            .create_pending(filename.as_ref(), file_type, raw_text, page_count)
            .await?;
        Self::run_pipeline(
            &self.store,
            &self.embedder,
            self.retry_policy,
            &document_id,
            &cleaned,
            file_type,
        )
        .await
    }

    /// Creates the document and returns its id immediately, then runs the
    /// rest of the pipeline (chunk → embed → insert → status) on a spawned
    /// task (spec §4.9, §5 "Background vectorization" / §9): the caller
    /// polls `embedding_status` rather than waiting on this call. Failures
    /// in the spawned task mark the document `failed` and are logged, never
    /// propagated — there's no caller left to propagate to.
    pub async fn ingest_in_background(
        &self,
        filename: impl AsRef<str>,
        file_type: FileType,
        raw_text: String,
        page_count: Option<u32>,
    ) -> Result<DocumentId> {
        let (document_id, cleaned) = self
            .create_pending(filename.as_ref(), file_type, raw_text, page_count)
            .await?;

        let store = self.store.clone();
        let embedder = self.embedder.clone();
        let retry_policy = self.retry_policy;
        let task_document_id = document_id.clone();
        tokio::spawn(async move {
            let result = Self::run_pipeline(
                &store,
                &embedder,
                retry_policy,
                &task_document_id,
                &cleaned,
                file_type,
            )
            .await;
            if let Err(err) = result {
                tracing::error!(
                    document_id = %task_document_id,
                    error = %err,
                    "background ingestion failed"
                );
                let _ = store.set_status(&task_document_id, EmbeddingStatus::Failed).await;
            }
        });

        Ok(document_id)
    }
}
