//! Gap set computation (spec §4.8 step 2).
//!
//! The gap set drives the whole roadmap: it's the list of JD keywords the
//! plan must spend at least 70% of its tasks on (step 3). A keyword
//! qualifies two ways — either it's missing from the résumé outright and
//! has no Similar-Tech near-miss, or it's present but sitting in a JD
//! section that scored weak overall (the résumé mentions the word but the
//! surrounding context didn't actually match).

use rustc_hash::FxHashSet;

use crate::matching::{MatchResult, SectionScore, SimilarTechMatch};
use crate::matching::keywords::normalize_keyword;

/// Section score below this is "weak" for gap-set purposes (spec §4.8 step
/// 2(b)).
const WEAK_SECTION_THRESHOLD: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct GapKeyword {
    pub keyword: String,
    /// The JD section weight this keyword was traced to, or the `other`
    /// weight if it couldn't be traced to a specific section's excerpts.
    /// Used to rank `key_improvement_areas` (spec §4.8 step 7).
    pub weight: f32,
}

/// Finds the JD section (if any) whose top-matched excerpts mention
/// `keyword`, returning its score. Keyword extraction itself is
/// whole-document (see [`crate::matching::keywords`]), so this is the best
/// approximation of "the keyword's enclosing section" available without a
/// second pass over raw chunk text.
fn containing_section_score(section_scores: &[SectionScore], keyword: &str) -> Option<f32> {
    section_scores.iter().find_map(|section| {
        let mentioned = section
            .top_matches
            .iter()
            .any(|m| m.jd_excerpt.to_lowercase().contains(keyword));
        mentioned.then_some(section.score)
    })
}

fn section_weight_for(section_scores: &[SectionScore], keyword: &str) -> f32 {
    use crate::types::SectionType;

    let found = section_scores.iter().find(|section| {
        section
            .top_matches
            .iter()
            .any(|m| m.jd_excerpt.to_lowercase().contains(keyword))
    });
    match found {
        Some(section) => crate::matching::SECTION_WEIGHTS
            .iter()
            .find(|(s, _)| *s == section.section_type)
            .map(|(_, w)| *w)
            .unwrap_or(0.05),
        None => crate::matching::SECTION_WEIGHTS
            .iter()
            .find(|(s, _)| *s == SectionType::Other)
            .map(|(_, w)| *w)
            .unwrap_or(0.05),
    }
}

/// Computes the gap set (spec §4.8 step 2): JD keywords absent from the
/// résumé and uncovered by a Similar-Tech match, plus any keyword whose
/// enclosing JD section scored below [`WEAK_SECTION_THRESHOLD`].
pub fn compute_gap_set(
    result: &MatchResult,
    resume_keywords: &FxHashSet<String>,
    jd_keywords: &FxHashSet<String>,
) -> Vec<GapKeyword> {
    let covered_by_similar_tech: FxHashSet<&str> = result
        .similar_tech_matches
        .iter()
        .map(|m: &SimilarTechMatch| m.jd_required.as_str())
        .collect();

    let mut gap = Vec::new();
    for keyword in jd_keywords {
        let normalized = normalize_keyword(keyword);
        let missing = !resume_keywords.contains(&normalized);
        let uncovered = !covered_by_similar_tech.contains(normalized.as_str());
        let weak_section = containing_section_score(&result.section_scores, &normalized)
            .is_some_and(|score| score < WEAK_SECTION_THRESHOLD);

        if (missing && uncovered) || weak_section {
            gap.push(GapKeyword {
                keyword: normalized.clone(),
                weight: section_weight_for(&result.section_scores, &normalized),
            });
        }
    }

    // Deterministic order: heaviest section weight first, then
    // lexicographic so output doesn't depend on hash-set iteration order.
    gap.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap()
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    gap
}

/// Top-5 most-weighted gap keywords (spec §4.8 step 7:
/// `key_improvement_areas`).
pub fn top_improvement_areas(gap: &[GapKeyword], n: usize) -> Vec<String> {
    gap.iter().take(n).map(|g| g.keyword.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{ChunkMatch, MatchGrade};
    use crate::types::{DocumentId, SectionType};

    fn result_with_sections(sections: Vec<SectionScore>) -> MatchResult {
        MatchResult {
            resume_document_id: DocumentId::new(),
            jd_document_id: DocumentId::new(),
            overall_similarity: 0.5,
            match_score: 60,
            match_grade: MatchGrade::C,
            section_scores: sections,
            chunk_matches: Vec::new(),
            similar_tech_matches: Vec::new(),
            similar_tech_bonus: 0.0,
            insufficient_data: false,
        }
    }

    #[test]
    fn missing_keyword_with_no_similar_tech_is_a_gap() {
        let result = result_with_sections(vec![]);
        let resume_kw: FxHashSet<String> = ["react".into()].into_iter().collect();
        let jd_kw: FxHashSet<String> = ["react".into(), "graphql".into()].into_iter().collect();
        let gap = compute_gap_set(&result, &resume_kw, &jd_kw);
        assert!(gap.iter().any(|g| g.keyword == "graphql"));
        assert!(!gap.iter().any(|g| g.keyword == "react"));
    }

    #[test]
    fn present_keyword_in_weak_section_is_still_a_gap() {
        let result = result_with_sections(vec![SectionScore {
            section_type: SectionType::Requirements,
            score: 0.3,
            chunk_count: 2,
            top_matches: vec![ChunkMatch {
                resume_chunk_index: 0,
                jd_chunk_index: 0,
                resume_excerpt: "has graphql".into(),
                jd_excerpt: "must know graphql deeply".into(),
                similarity: 0.3,
            }],
        }]);
        let resume_kw: FxHashSet<String> = ["graphql".into()].into_iter().collect();
        let jd_kw: FxHashSet<String> = ["graphql".into()].into_iter().collect();
        let gap = compute_gap_set(&result, &resume_kw, &jd_kw);
        assert!(gap.iter().any(|g| g.keyword == "graphql"));
    }

    #[test]
    fn top_improvement_areas_caps_at_five() {
        let gap: Vec<GapKeyword> = (0..10)
            .map(|i| GapKeyword {
                keyword: format!("kw{i}"),
                weight: 1.0,
            })
            .collect();
        assert_eq!(top_improvement_areas(&gap, 5).len(), 5);
    }
}
