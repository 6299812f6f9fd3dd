//! Shared application state handed to every handler via axum's `State`
//! extractor. Everything here is cheaply `Clone`-able (an `Arc` wrapper or
//! a plain `Arc<dyn Trait>`), matching spec §5's "connection pools and the
//! catalog are the only shared mutable resources" — the catalog itself is
//! a process-wide `Lazy` static in `matchforge_core::catalog`, so it isn't
//! threaded through here at all.

use std::sync::Arc;

use matchforge_core::embed::Embedder;
use matchforge_core::llm::Llm;
use matchforge_core::store::VectorStore;
use matchforge_core::IngestionOrchestrator;

use crate::extract::TextExtractor;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<dyn Llm>,
    pub extractor: Arc<dyn TextExtractor>,
    pub orchestrator: Arc<IngestionOrchestrator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let orchestrator = Arc::new(IngestionOrchestrator::new(store.clone(), embedder.clone()));
        Self {
            store,
            embedder,
            llm,
            extractor,
            orchestrator,
        }
    }
}
