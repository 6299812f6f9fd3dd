//! Matching Engine (spec §4.6) — the algorithmic heart of the crate.
//!
//! Computes a [`MatchResult`] from a résumé/JD document pair that has
//! already finished ingestion (`embedding_status == completed`). Combines
//! section-weighted chunk similarity (the score that drives the grade) with
//! two secondary signals reported alongside it: whole-document centroid
//! similarity (§9 "Similarity with centroids" — a sanity check, never the
//! grade input) and a Similar-Tech bonus for near-miss keyword coverage.

pub mod keywords;
pub mod similar_tech;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::store::VectorStore;
use crate::types::{Document, DocumentId, EmbeddingStatus, SectionType};

/// Fixed section weight table (spec §4.6 step 3). Weights are normalized
/// over whichever sections actually appear among a JD's chunks — a JD with
/// no `benefits` chunks simply redistributes that 0 weight trivially, and a
/// JD missing, say, `responsibilities` renormalizes over the rest.
pub const SECTION_WEIGHTS: &[(SectionType, f32)] = &[
    (SectionType::Requirements, 0.45),
    (SectionType::Technical, 0.25),
    (SectionType::Preferred, 0.15),
    (SectionType::Responsibilities, 0.10),
    (SectionType::Benefits, 0.00),
    (SectionType::Other, 0.05),
];

fn section_weight(section: SectionType) -> f32 {
    SECTION_WEIGHTS
        .iter()
        .find(|(s, _)| *s == section)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Bonus capped at this many points (spec §4.6 step 5).
const SIMILAR_TECH_BONUS_CAP: f32 = 10.0;
const SIMILAR_TECH_BONUS_PER_MATCH: f32 = 2.0;

/// Top-k JD chunks gathered per resume chunk when computing pairwise
/// similarity (spec §4.6 step 1).
pub const PAIRWISE_TOP_K: usize = 3;
/// Top matches retained per section for display.
const TOP_MATCHES_PER_SECTION: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchGrade {
    D,
    C,
    B,
    A,
    S,
}

impl std::fmt::Display for MatchGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchGrade::S => "S",
            MatchGrade::A => "A",
            MatchGrade::B => "B",
            MatchGrade::C => "C",
            MatchGrade::D => "D",
        };
        write!(f, "{s}")
    }
}

impl MatchGrade {
    /// One tier above this grade (spec §4.8 step 1: `D→C, C→B, B→A, A→S,
    /// S→S` — `S` is a fixed point).
    pub fn one_tier_up(self) -> Self {
        match self {
            MatchGrade::D => MatchGrade::C,
            MatchGrade::C => MatchGrade::B,
            MatchGrade::B => MatchGrade::A,
            MatchGrade::A => MatchGrade::S,
            MatchGrade::S => MatchGrade::S,
        }
    }
}

/// Maps a `match_score` to its grade. Thresholds are inclusive lower
/// bounds (spec §4.6 step 6).
pub fn grade_for_score(score: u8) -> MatchGrade {
    match score {
        s if s >= 90 => MatchGrade::S,
        s if s >= 80 => MatchGrade::A,
        s if s >= 70 => MatchGrade::B,
        s if s >= 55 => MatchGrade::C,
        _ => MatchGrade::D,
    }
}

/// A single resume-chunk/JD-chunk similarity hit, reported for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub resume_chunk_index: usize,
    pub jd_chunk_index: usize,
    pub resume_excerpt: String,
    pub jd_excerpt: String,
    pub similarity: f32,
}

/// Aggregated score for one JD section type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectionScore {
    pub section_type: SectionType,
    pub score: f32,
    pub chunk_count: usize,
    pub top_matches: Vec<ChunkMatch>,
}

/// One near-miss keyword pairing recognized via the Similar-Tech Table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarTechMatch {
    pub jd_required: String,
    pub resume_has: String,
    pub relationship: &'static str,
    pub bonus_contribution: f32,
}

/// Transient result of matching one résumé against one JD. Never persisted
/// (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchResult {
    pub resume_document_id: DocumentId,
    pub jd_document_id: DocumentId,
    /// Centroid similarity, reported separately — never the grade input.
    pub overall_similarity: f32,
    pub match_score: u8,
    pub match_grade: MatchGrade,
    pub section_scores: Vec<SectionScore>,
    /// Every JD chunk's best resume match, uncapped and unsectioned —
    /// a sibling of `section_scores`, not nested inside it (spec §3).
    pub chunk_matches: Vec<ChunkMatch>,
    pub similar_tech_matches: Vec<SimilarTechMatch>,
    pub similar_tech_bonus: f32,
    /// Set when either document had zero embedded chunks (spec §4.6 step 7)
    /// — the result is still a valid zero-score `D`, never a thrown error.
    pub insufficient_data: bool,
}

fn require_completed(doc: &Document) -> Result<()> {
    if doc.embedding_status != EmbeddingStatus::Completed {
        return Err(CoreError::NotReady {
            document_id: doc.document_id.to_string(),
            status: doc.embedding_status.to_string(),
        });
    }
    Ok(())
}

fn insufficient_data_result(resume_id: DocumentId, jd_id: DocumentId) -> MatchResult {
    MatchResult {
        resume_document_id: resume_id,
        jd_document_id: jd_id,
        overall_similarity: 0.0,
        match_score: 0,
        match_grade: MatchGrade::D,
        section_scores: Vec::new(),
        chunk_matches: Vec::new(),
        similar_tech_matches: Vec::new(),
        similar_tech_bonus: 0.0,
        insufficient_data: true,
    }
}

/// Computes a [`MatchResult`] for an already-ingested résumé/JD pair.
/// Refuses documents that aren't `completed` (spec §9 "Background
/// vectorization").
pub async fn compute_match(
    store: &dyn VectorStore,
    resume: &Document,
    jd: &Document,
) -> Result<MatchResult> {
    require_completed(resume)?;
    require_completed(jd)?;

    let resume_chunks = store.chunk_count(&resume.document_id).await?;
    let jd_chunks = store.chunk_count(&jd.document_id).await?;
    if resume_chunks == 0 || jd_chunks == 0 {
        return Ok(insufficient_data_result(
            resume.document_id.clone(),
            jd.document_id.clone(),
        ));
    }

    let pairs = store
        .match_documents_by_file(&resume.document_id, &jd.document_id, PAIRWISE_TOP_K)
        .await?;
    if pairs.is_empty() {
        return Ok(insufficient_data_result(
            resume.document_id.clone(),
            jd.document_id.clone(),
        ));
    }

    // For each JD chunk, keep its best resume match (max_r sim(j,r)).
    let mut best_per_jd_chunk: FxHashMap<usize, ChunkMatch> = FxHashMap::default();
    let mut jd_chunk_sections: FxHashMap<usize, SectionType> = FxHashMap::default();
    for (resume_match, jd_match) in &pairs {
        jd_chunk_sections.insert(jd_match.chunk_index, jd_match.section_type);
        let candidate = ChunkMatch {
            resume_chunk_index: resume_match.chunk_index,
            jd_chunk_index: jd_match.chunk_index,
            resume_excerpt: resume_match.content.clone(),
            jd_excerpt: jd_match.content.clone(),
            similarity: jd_match.similarity,
        };
        best_per_jd_chunk
            .entry(jd_match.chunk_index)
            .and_modify(|existing| {
                if candidate.similarity > existing.similarity {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    let mut chunk_matches: Vec<ChunkMatch> = best_per_jd_chunk.values().cloned().collect();
    chunk_matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());

    let mut by_section: FxHashMap<SectionType, Vec<ChunkMatch>> = FxHashMap::default();
    for (jd_chunk_index, chunk_match) in best_per_jd_chunk {
        let section = jd_chunk_sections
            .get(&jd_chunk_index)
            .copied()
            .unwrap_or(SectionType::Other);
        by_section.entry(section).or_default().push(chunk_match);
    }

    let mut section_scores = Vec::with_capacity(by_section.len());
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for (section, mut matches) in by_section {
        matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        let chunk_count = matches.len();
        let score = matches.iter().map(|m| m.similarity).sum::<f32>() / chunk_count as f32;
        let weight = section_weight(section);
        weighted_sum += weight * score;
        weight_total += weight;

        matches.truncate(TOP_MATCHES_PER_SECTION);
        section_scores.push(SectionScore {
            section_type: section,
            score,
            chunk_count,
            top_matches: matches,
        });
    }
    section_scores.sort_by(|a, b| {
        section_weight(b.section_type)
            .partial_cmp(&section_weight(a.section_type))
            .unwrap()
            .then(b.score.partial_cmp(&a.score).unwrap())
    });

    let weighted_similarity = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    let overall_similarity = store
        .overall_similarity(&resume.document_id, &jd.document_id)
        .await?;

    let resume_keywords = keywords::extract_keywords(&resume.cleaned_text);
    let jd_keywords = keywords::extract_keywords(&jd.cleaned_text);
    let mut similar_tech_matches = Vec::new();
    for jd_keyword in &jd_keywords {
        if resume_keywords.contains(jd_keyword) {
            continue;
        }
        for resume_keyword in &resume_keywords {
            if let Some(relationship) =
                similar_tech::relationship_between(jd_keyword, resume_keyword)
            {
                similar_tech_matches.push(SimilarTechMatch {
                    jd_required: jd_keyword.clone(),
                    resume_has: resume_keyword.clone(),
                    relationship,
                    bonus_contribution: SIMILAR_TECH_BONUS_PER_MATCH,
                });
                break;
            }
        }
    }
    let similar_tech_bonus =
        (SIMILAR_TECH_BONUS_PER_MATCH * similar_tech_matches.len() as f32).min(SIMILAR_TECH_BONUS_CAP);

    let raw_score = 100.0 * weighted_similarity + similar_tech_bonus;
    let match_score = raw_score.clamp(0.0, 100.0).round() as u8;
    let match_grade = grade_for_score(match_score);

    Ok(MatchResult {
        resume_document_id: resume.document_id.clone(),
        jd_document_id: jd.document_id.clone(),
        overall_similarity,
        match_score,
        match_grade,
        section_scores,
        chunk_matches,
        similar_tech_matches,
        similar_tech_bonus,
        insufficient_data: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds_match_spec() {
        assert_eq!(grade_for_score(95), MatchGrade::S);
        assert_eq!(grade_for_score(90), MatchGrade::S);
        assert_eq!(grade_for_score(89), MatchGrade::A);
        assert_eq!(grade_for_score(80), MatchGrade::A);
        assert_eq!(grade_for_score(79), MatchGrade::B);
        assert_eq!(grade_for_score(70), MatchGrade::B);
        assert_eq!(grade_for_score(69), MatchGrade::C);
        assert_eq!(grade_for_score(55), MatchGrade::C);
        assert_eq!(grade_for_score(54), MatchGrade::D);
        assert_eq!(grade_for_score(0), MatchGrade::D);
    }

    #[test]
    fn one_tier_up_maps_every_grade_with_s_as_fixed_point() {
        assert_eq!(MatchGrade::D.one_tier_up(), MatchGrade::C);
        assert_eq!(MatchGrade::C.one_tier_up(), MatchGrade::B);
        assert_eq!(MatchGrade::B.one_tier_up(), MatchGrade::A);
        assert_eq!(MatchGrade::A.one_tier_up(), MatchGrade::S);
        assert_eq!(MatchGrade::S.one_tier_up(), MatchGrade::S);
    }

    #[tokio::test]
    async fn insufficient_data_on_empty_resume() {
        use crate::embed::MockEmbedder;
        use crate::ingest::IngestionOrchestrator;
        use crate::store::SqliteStore;
        use crate::types::FileType;
        use std::sync::Arc;

        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let embedder = Arc::new(MockEmbedder::new());
        let orchestrator = IngestionOrchestrator::new(store.clone(), embedder);

        let resume_outcome = orchestrator
            .ingest("empty.txt", FileType::Resume, String::new(), None)
            .await
            .unwrap();
        let jd_outcome = orchestrator
            .ingest(
                "jd.txt",
                FileType::JobDescription,
                "Requirements\n\nMust know Rust and PostgreSQL.".to_string(),
                None,
            )
            .await
            .unwrap();

        let resume_doc = store
            .get_document(crate::store::DocumentLookup::ByDocumentId(
                resume_outcome.document_id,
            ))
            .await
            .unwrap()
            .unwrap();
        let jd_doc = store
            .get_document(crate::store::DocumentLookup::ByDocumentId(
                jd_outcome.document_id,
            ))
            .await
            .unwrap()
            .unwrap();

        // An empty résumé never reaches `completed`; force it for this test
        // since the matcher's own `insufficient_data` path is keyed on
        // chunk_count == 0, not on status.
        store
            .set_status(&resume_doc.document_id, EmbeddingStatus::Completed)
            .await
            .unwrap();
        let resume_doc = store
            .get_document(crate::store::DocumentLookup::ByDocumentId(
                resume_doc.document_id,
            ))
            .await
            .unwrap()
            .unwrap();

        let result = compute_match(store.as_ref(), &resume_doc, &jd_doc)
            .await
            .unwrap();
        assert!(result.insufficient_data);
        assert_eq!(result.match_score, 0);
        assert_eq!(result.match_grade, MatchGrade::D);
    }

    #[tokio::test]
    async fn strong_match_scores_high_and_reports_similar_tech_bonus() {
        use crate::embed::Embedder;
        use crate::ingest::IngestionOrchestrator;
        use crate::store::SqliteStore;
        use crate::types::FileType;
        use async_trait::async_trait;
        use std::sync::Arc;

        /// Embeds by a tiny synthetic feature vector so that chunks sharing
        /// keywords land close together in cosine space — realistic mocks
        /// can't otherwise produce a directional "strong match" signal.
        struct KeywordFeatureEmbedder;

        #[async_trait]
        impl Embedder for KeywordFeatureEmbedder {
            async fn embed_raw(
                &self,
                texts: &[String],
            ) -> std::result::Result<Vec<Vec<f32>>, crate::embed::EmbedProviderError> {
                const TERMS: &[&str] = &["react", "typescript", "node", "postgres", "next.js"];
                Ok(texts
                    .iter()
                    .map(|t| {
                        let lower = t.to_lowercase();
                        let mut v = vec![0.0f32; crate::embed::EMBEDDING_DIM];
                        for (i, term) in TERMS.iter().enumerate() {
                            if lower.contains(term) {
                                v[i] = 1.0;
                            }
                        }
                        v
                    })
                    .collect())
            }
        }

        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let embedder = Arc::new(KeywordFeatureEmbedder);
        let orchestrator = IngestionOrchestrator::new(store.clone(), embedder);

        let resume_outcome = orchestrator
            .ingest(
                "resume.txt",
                FileType::Resume,
                "Skills\n\nReact, TypeScript, Node, Postgres.".to_string(),
                None,
            )
            .await
            .unwrap();
        let jd_outcome = orchestrator
            .ingest(
                "jd.txt",
                FileType::JobDescription,
                "Requirements\n\nReact, TypeScript, Next.js, Postgres required.".to_string(),
                None,
            )
            .await
            .unwrap();

        let resume_doc = store
            .get_document(crate::store::DocumentLookup::ByDocumentId(
                resume_outcome.document_id,
            ))
            .await
            .unwrap()
            .unwrap();
        let jd_doc = store
            .get_document(crate::store::DocumentLookup::ByDocumentId(
                jd_outcome.document_id,
            ))
            .await
            .unwrap()
            .unwrap();

        let result = compute_match(store.as_ref(), &resume_doc, &jd_doc)
            .await
            .unwrap();
        // Résumé covers react/typescript/postgres verbatim and node.js
        // instead of next.js — a near-miss the Similar-Tech Table credits.
        assert!(result.similar_tech_bonus >= 2.0);
        assert!(result.match_score >= 70);
        assert!(matches!(
            result.match_grade,
            MatchGrade::B | MatchGrade::A | MatchGrade::S
        ));
    }

    #[test]
    fn similar_tech_bonus_is_capped_at_ten() {
        let matches: Vec<SimilarTechMatch> = (0..10)
            .map(|i| SimilarTechMatch {
                jd_required: format!("kw{i}"),
                resume_has: format!("kw{i}alt"),
                relationship: "test",
                bonus_contribution: SIMILAR_TECH_BONUS_PER_MATCH,
            })
            .collect();
        let bonus =
            (SIMILAR_TECH_BONUS_PER_MATCH * matches.len() as f32).min(SIMILAR_TECH_BONUS_CAP);
        assert_eq!(bonus, 10.0);
    }
}
