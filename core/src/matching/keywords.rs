//! Keyword extraction (spec §4.6 step 5: "Extract normalized keyword sets
//! from résumé and JD, lowercase, whitespace stripped").
//!
//! A closed vocabulary scan, in the same spirit as [`crate::classify`]'s
//! keyword tables: rather than a general NLP tokenizer (out of scope, and
//! not deterministic across library versions), keywords are recognized by
//! substring match against a curated skills/technology vocabulary, then
//! normalized by stripping internal whitespace so multi-word entries
//! (`"machine learning"`, `"next.js"`) collapse to one canonical token —
//! matching how the roadmap planner's weekly `keywords` field is normalized
//! (spec §4.8 step 5).

use rustc_hash::FxHashSet;

use super::similar_tech;

/// General skills/technology vocabulary beyond the Similar-Tech Table's
/// equivalence groups — covers terms the spec's end-to-end scenarios name
/// (`graphql`, `aws`, `mysql`, `jquery`, ...) plus common JD/résumé terms
/// the roadmap catalog (§9 "resource catalog as data") also indexes by.
const GENERAL_VOCABULARY: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "rust",
    "go",
    "java",
    "c++",
    "c#",
    "ruby",
    "php",
    "html",
    "css",
    "sql",
    "nosql",
    "graphql",
    "rest api",
    "grpc",
    "microservices",
    "docker",
    "kubernetes",
    "terraform",
    "ansible",
    "ci/cd",
    "aws",
    "gcp",
    "azure",
    "linux",
    "git",
    "testing",
    "tdd",
    "unit testing",
    "integration testing",
    "agile",
    "scrum",
    "security",
    "accessibility",
    "performance optimization",
    "system design",
    "data structures",
    "algorithms",
    "machine learning",
    "data engineering",
    "devops",
    "observability",
    "monitoring",
    "logging",
    "caching",
    "message queues",
    "kafka",
    "rabbitmq",
    "redis",
    "websockets",
    "oauth",
    "authentication",
    "authorization",
    "leadership",
    "mentoring",
    "code review",
    "technical writing",
    "project management",
    "communication",
];

/// Scans `text` for every vocabulary term (tech-equivalence members plus
/// the general skills list), returning the set of normalized keywords
/// present.
pub fn extract_keywords(text: &str) -> FxHashSet<String> {
    let flattened: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let haystack = format!(" {flattened} ");
    let mut found = FxHashSet::default();

    for term in similar_tech::vocabulary().chain(GENERAL_VOCABULARY.iter().copied()) {
        let padded = format!(" {term} ");
        if haystack.contains(&padded)
            || haystack.contains(&format!(" {term},"))
            || haystack.contains(&format!(" {term}."))
        {
            found.insert(normalize_keyword(term));
        }
    }
    found
}

/// Lowercases and strips whitespace — the canonical keyword form used
/// wherever the spec says "keywords are normalized".
pub fn normalize_keyword(term: &str) -> String {
    term.to_lowercase().split_whitespace().collect()
}
