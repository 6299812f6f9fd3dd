//! Resource catalog (spec §3, §9: "Resource catalog as data, not code").
//!
//! Curated learning resources ship as an embedded JSON file rather than
//! Rust literals, so the catalog can grow without touching scoring logic.
//! Keyword aliases (`"next"` → `"next.js"`) live alongside the catalog data
//! for the same reason — per the spec's design note, aliases are catalog
//! concerns, not matching-engine concerns.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::matching::keywords::normalize_keyword;

const CATALOG_JSON: &str = include_str!("../resources/catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Documentation,
    Tutorial,
    Video,
    Article,
    Course,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    YouTube,
    Inflearn,
    Nomad,
    Official,
    MDN,
    Docs,
    GitHub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// A single catalog entry. `topics` is the internal keyword index used for
/// lookup — it is never serialized back out, so the wire shape handed to
/// callers matches spec §3's `LearningResource` exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub platform: Platform,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<u32>,
    #[serde(default, skip_serializing)]
    pub topics: Vec<String>,
}

#[derive(Deserialize)]
struct RawCatalog {
    aliases: HashMap<String, String>,
    resources: Vec<LearningResource>,
}

pub struct Catalog {
    resources: Vec<LearningResource>,
    aliases: FxHashMap<String, String>,
    by_topic: FxHashMap<String, Vec<usize>>,
}

static CATALOG: Lazy<Catalog> =
    Lazy::new(|| Catalog::parse(CATALOG_JSON).expect("embedded catalog.json must be valid"));

impl Catalog {
    fn parse(raw: &str) -> Result<Self> {
        let parsed: RawCatalog = serde_json::from_str(raw)?;
        if parsed.resources.is_empty() {
            return Err(CoreError::internal("catalog", "catalog contains no resources"));
        }

        let mut by_topic: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (idx, resource) in parsed.resources.iter().enumerate() {
            for topic in &resource.topics {
                by_topic
                    .entry(normalize_keyword(topic))
                    .or_default()
                    .push(idx);
            }
        }

        let aliases = parsed
            .aliases
            .into_iter()
            .map(|(k, v)| (normalize_keyword(&k), normalize_keyword(&v)))
            .collect();

        Ok(Self {
            resources: parsed.resources,
            aliases,
            by_topic,
        })
    }

    /// Resolves `keyword` through the alias table, if one exists.
    pub fn resolve_alias<'a>(&'a self, keyword: &'a str) -> &'a str {
        self.aliases
            .get(keyword)
            .map(String::as_str)
            .unwrap_or(keyword)
    }

    /// Every resource indexed under `keyword`, after alias resolution.
    /// Empty if the catalog has nothing for that topic.
    pub fn lookup(&self, keyword: &str) -> Vec<&LearningResource> {
        let normalized = normalize_keyword(keyword);
        let resolved = self.resolve_alias(&normalized);
        self.by_topic
            .get(resolved)
            .map(|indices| indices.iter().map(|&i| &self.resources[i]).collect())
            .unwrap_or_default()
    }

    /// Resources for `keyword` at or below `max_difficulty`, falling back to
    /// the full set for that keyword if nothing matches the cutoff (a
    /// beginner gap topic with only advanced resources still needs a
    /// resource bound to it, per spec §4.8 step 6).
    pub fn lookup_within(&self, keyword: &str, max_difficulty: Difficulty) -> Vec<&LearningResource> {
        let all = self.lookup(keyword);
        let filtered: Vec<&LearningResource> = all
            .iter()
            .copied()
            .filter(|r| r.difficulty <= max_difficulty)
            .collect();
        if filtered.is_empty() {
            all
        } else {
            filtered
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// True iff `url` belongs to some cataloged resource — used to enforce
    /// the roadmap invariant that every bound resource URL exists in the
    /// catalog (spec §8 "resource catalog integrity").
    pub fn contains_url(&self, url: &str) -> bool {
        self.resources.iter().any(|r| r.url == url)
    }
}

/// The process-wide catalog, parsed once from the embedded JSON.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}
