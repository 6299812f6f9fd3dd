//! Section Classifier (spec §4.2).
//!
//! Deterministic keyword-heuristic scorer: every chunk gets exactly one
//! [`SectionType`] from the closed vocabulary appropriate to its
//! [`FileType`]. Ties prefer the more specific category (`preferred` beats
//! `requirements`), and anything under the confidence floor falls back to
//! `Other`.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::types::{FileType, SectionType};

/// Minimum score a category must clear to be assigned; below this, chunks
/// fall back to `Other`.
const MIN_CONFIDENCE: f64 = 1.0;

/// Section types are "more specific" in this order when scores tie —
/// earlier entries win. `Other` is always least specific.
const RESUME_SPECIFICITY: &[SectionType] = &[
    SectionType::Certifications,
    SectionType::Projects,
    SectionType::Education,
    SectionType::Skills,
    SectionType::Experience,
    SectionType::Summary,
    SectionType::Other,
];

const JD_SPECIFICITY: &[SectionType] = &[
    SectionType::Preferred,
    SectionType::Technical,
    SectionType::Requirements,
    SectionType::Benefits,
    SectionType::Responsibilities,
    SectionType::Other,
];

struct KeywordTable {
    terms: FxHashMap<SectionType, Vec<&'static str>>,
}

static RESUME_TERMS: Lazy<KeywordTable> = Lazy::new(|| {
    let mut terms: FxHashMap<SectionType, Vec<&'static str>> = FxHashMap::default();
    terms.insert(
        SectionType::Summary,
        vec![
            "summary",
            "profile",
            "objective",
            "about me",
            "professional summary",
        ],
    );
    terms.insert(
        SectionType::Experience,
        vec![
            "experience",
            "employment",
            "work history",
            "professional experience",
            "responsibilities included",
            "worked as",
        ],
    );
    terms.insert(
        SectionType::Skills,
        vec![
            "skills",
            "technical skills",
            "proficiencies",
            "tech stack",
            "tools & technologies",
            "languages:",
        ],
    );
    terms.insert(
        SectionType::Education,
        vec![
            "education",
            "university",
            "bachelor",
            "master",
            "degree",
            "gpa",
        ],
    );
    terms.insert(
        SectionType::Projects,
        vec!["projects", "side project", "portfolio", "open source"],
    );
    terms.insert(
        SectionType::Certifications,
        vec![
            "certification",
            "certified",
            "license",
            "credential",
            "aws certified",
        ],
    );
    KeywordTable { terms }
});

static JD_TERMS: Lazy<KeywordTable> = Lazy::new(|| {
    let mut terms: FxHashMap<SectionType, Vec<&'static str>> = FxHashMap::default();
    terms.insert(
        SectionType::Requirements,
        vec![
            "requirements",
            "required qualifications",
            "must have",
            "minimum qualifications",
            "you must",
        ],
    );
    terms.insert(
        SectionType::Preferred,
        vec![
            "preferred",
            "nice to have",
            "bonus",
            "preferred qualifications",
            "it's a plus",
            "a plus",
        ],
    );
    terms.insert(
        SectionType::Responsibilities,
        vec![
            "responsibilities",
            "what you'll do",
            "day to day",
            "duties",
            "you will",
        ],
    );
    terms.insert(
        SectionType::Technical,
        vec![
            "tech stack",
            "technologies",
            "technical requirements",
            "tools",
            "stack:",
        ],
    );
    terms.insert(
        SectionType::Benefits,
        vec![
            "benefits",
            "perks",
            "compensation",
            "salary",
            "pto",
            "health insurance",
        ],
    );
    KeywordTable { terms }
});

/// Classifies a single chunk's text into exactly one [`SectionType`].
///
/// Deterministic given identical input: scores every candidate category by
/// counting (possibly overlapping) keyword hits, then breaks ties using a
/// fixed specificity order before falling back to `Other`.
pub fn classify_section(text: &str, file_type: FileType) -> SectionType {
    let table = match file_type {
        FileType::Resume => &*RESUME_TERMS,
        FileType::JobDescription => &*JD_TERMS,
    };
    let specificity = match file_type {
        FileType::Resume => RESUME_SPECIFICITY,
        FileType::JobDescription => JD_SPECIFICITY,
    };

    let haystack = text.to_lowercase();
    let mut scores: FxHashMap<SectionType, f64> = FxHashMap::default();

    for (section, keywords) in &table.terms {
        let mut score = 0.0;
        for kw in keywords {
            if haystack.contains(kw) {
                // Heading-like keyword occurrences (short line, near the
                // start of the chunk) count for more than an incidental
                // mention buried in prose.
                let weight = if haystack
                    .lines()
                    .take(2)
                    .any(|line| line.trim() == *kw || line.trim().starts_with(kw))
                {
                    2.0
                } else {
                    1.0
                };
                score += weight;
            }
        }
        if score > 0.0 {
            scores.insert(*section, score);
        }
    }

    let best_score = scores.values().cloned().fold(0.0_f64, f64::max);
    if best_score < MIN_CONFIDENCE {
        return SectionType::Other;
    }

    specificity
        .iter()
        .find(|section| scores.get(section).copied().unwrap_or(0.0) >= best_score)
        .copied()
        .unwrap_or(SectionType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_resume_skills_section() {
        let text = "Technical Skills\nRust, Python, PostgreSQL, Docker, Kubernetes";
        assert_eq!(
            classify_section(text, FileType::Resume),
            SectionType::Skills
        );
    }

    #[test]
    fn classifies_jd_preferred_over_requirements_on_tie() {
        // Both "requirements" and "preferred" keywords are present; since
        // both clear the confidence floor, preferred (more specific) wins.
        let text = "Requirements and preferred qualifications: nice to have Kubernetes experience.";
        assert_eq!(
            classify_section(text, FileType::JobDescription),
            SectionType::Preferred
        );
    }

    #[test]
    fn falls_back_to_other_below_confidence_floor() {
        let text = "Lorem ipsum dolor sit amet consectetur.";
        assert_eq!(classify_section(text, FileType::Resume), SectionType::Other);
        assert_eq!(
            classify_section(text, FileType::JobDescription),
            SectionType::Other
        );
    }

    #[test]
    fn is_deterministic() {
        let text = "Requirements: 5+ years of experience with distributed systems.";
        let a = classify_section(text, FileType::JobDescription);
        let b = classify_section(text, FileType::JobDescription);
        assert_eq!(a, b);
    }

    #[test]
    fn classifies_jd_benefits() {
        let text = "Benefits\nHealth insurance, 401k match, unlimited PTO.";
        assert_eq!(
            classify_section(text, FileType::JobDescription),
            SectionType::Benefits
        );
    }
}
