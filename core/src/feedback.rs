//! Feedback Generator (spec §4.7).
//!
//! Turns a [`MatchResult`] into prose: a summary, strengths, weaknesses,
//! potential, and action items. One LLM call, with a single repair retry if
//! the response doesn't parse as the expected schema, and a deterministic
//! fallback (built straight from the section scores, no LLM involved) if
//! the repair also fails — feedback generation must never hard-fail a
//! match request.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::Llm;
use crate::matching::MatchResult;
use crate::types::SectionType;

/// Minimum/maximum items the spec requires in every feedback list.
const MIN_ITEMS: usize = 2;
const MAX_ITEMS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feedback {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub potential: Vec<String>,
    pub action_items: Vec<String>,
    /// True when the LLM path failed twice and the deterministic fallback
    /// was used instead.
    pub is_fallback: bool,
}

/// Human-readable label for a section tag — raw English tags like
/// `requirements` or `technical` must never leak into generated prose
/// (spec §4.7 step 4).
fn section_label(section: SectionType) -> &'static str {
    match section {
        SectionType::Summary => "professional summary",
        SectionType::Experience => "work experience",
        SectionType::Skills => "listed skills",
        SectionType::Education => "education background",
        SectionType::Projects => "project history",
        SectionType::Certifications => "certifications",
        SectionType::Requirements => "core requirements",
        SectionType::Preferred => "preferred qualifications",
        SectionType::Responsibilities => "day-to-day responsibilities",
        SectionType::Technical => "technical requirements",
        SectionType::Benefits => "benefits",
        SectionType::Other => "other listed qualifications",
    }
}

#[derive(Deserialize)]
struct RawFeedback {
    summary: String,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    potential: Vec<String>,
    action_items: Vec<String>,
}

impl RawFeedback {
    fn is_well_formed(&self) -> bool {
        let lists = [&self.strengths, &self.weaknesses, &self.potential, &self.action_items];
        !self.summary.trim().is_empty()
            && lists
                .iter()
                .all(|list| (MIN_ITEMS..=MAX_ITEMS).contains(&list.len()))
    }
}

fn system_prompt() -> &'static str {
    "You are a career coach reviewing how well a candidate's résumé matches a job \
     description. Respond with a single JSON object with exactly these keys: \
     \"summary\" (a string), \"strengths\", \"weaknesses\", \"potential\", and \
     \"action_items\" (each an array of 2 to 5 short strings). Refer to job sections \
     by what they describe, never by an internal tag name. Return JSON only, no \
     surrounding prose."
}

fn user_prompt(result: &MatchResult) -> String {
    let mut sections = String::new();
    for section in &result.section_scores {
        sections.push_str(&format!(
            "- {} (weight-bearing section): score {:.2}, {} matched chunk(s)\n",
            section_label(section.section_type),
            section.score,
            section.chunk_count
        ));
    }
    let bonus_line = if result.similar_tech_matches.is_empty() {
        String::new()
    } else {
        let pairs: Vec<String> = result
            .similar_tech_matches
            .iter()
            .map(|m| format!("{} via {} ({})", m.jd_required, m.resume_has, m.relationship))
            .collect();
        format!("\nNear-miss technology matches credited: {}\n", pairs.join(", "))
    };

    format!(
        "Match score: {}/100 (grade {}). Overall document similarity: {:.2}.\n\
         Section-by-section performance:\n{sections}{bonus_line}\n\
         Write feedback for the candidate based on this breakdown.",
        result.match_score, result.match_grade, result.overall_similarity,
    )
}

/// Deterministic fallback: no LLM, built directly from section scores. Used
/// when the LLM path fails outright or fails schema validation twice.
fn deterministic_fallback(result: &MatchResult) -> Feedback {
    let mut ranked: Vec<_> = result.section_scores.iter().collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let strengths: Vec<String> = ranked
        .iter()
        .filter(|s| s.score >= 0.6)
        .take(MAX_ITEMS)
        .map(|s| format!("Strong alignment in {}", section_label(s.section_type)))
        .collect();
    let weaknesses: Vec<String> = ranked
        .iter()
        .rev()
        .filter(|s| s.score < 0.6)
        .take(MAX_ITEMS)
        .map(|s| format!("Limited alignment in {}", section_label(s.section_type)))
        .collect();

    let strengths = pad_to_minimum(strengths, "No standout section identified yet.");
    let weaknesses = pad_to_minimum(weaknesses, "No major gaps identified from the available chunks.");
    let potential = pad_to_minimum(
        result
            .similar_tech_matches
            .iter()
            .take(MAX_ITEMS)
            .map(|m| format!("Experience with {} is closely related to {}", m.resume_has, m.jd_required))
            .collect(),
        "Candidate's adjacent experience may transfer well with targeted upskilling.",
    );
    let action_items = pad_to_minimum(
        ranked
            .iter()
            .rev()
            .filter(|s| s.score < 0.6)
            .take(MAX_ITEMS)
            .map(|s| format!("Strengthen coverage of {}", section_label(s.section_type)))
            .collect(),
        "Review the job description's core requirements and tailor the résumé to match.",
    );

    Feedback {
        summary: format!(
            "This résumé scored {}/100 (grade {}) against the job description.",
            result.match_score, result.match_grade
        ),
        strengths,
        weaknesses,
        potential,
        action_items,
        is_fallback: true,
    }
}

fn pad_to_minimum(mut items: Vec<String>, filler: &str) -> Vec<String> {
    while items.len() < MIN_ITEMS {
        items.push(filler.to_string());
    }
    items.truncate(MAX_ITEMS);
    items
}

fn parse_and_validate(response: &str) -> Option<RawFeedback> {
    let trimmed = response.trim();
    let json_slice = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
        .unwrap_or(trimmed);
    let raw: RawFeedback = serde_json::from_str(json_slice).ok()?;
    raw.is_well_formed().then_some(raw)
}

/// Generates feedback for `result`. Tries the LLM once, retries once with a
/// repair instruction if the response doesn't parse or doesn't meet the
/// 2-5 item bound, then falls back to a deterministic summary — this
/// function itself never returns an error for a malformed LLM response.
pub async fn generate_feedback(llm: &dyn Llm, result: &MatchResult) -> Result<Feedback> {
    if result.insufficient_data {
        return Ok(deterministic_fallback(result));
    }

    let prompt = user_prompt(result);
    let first = llm.complete(system_prompt(), &prompt).await;

    let parsed = match first {
        Ok(text) => parse_and_validate(&text),
        Err(_) => None,
    };

    let parsed = match parsed {
        Some(raw) => Some(raw),
        None => {
            let repair_prompt = format!(
                "{prompt}\n\nYour previous response did not match the required JSON schema \
                 (summary string plus four arrays of 2 to 5 short strings each). Reply again \
                 with only a valid JSON object matching that schema."
            );
            llm.complete(system_prompt(), &repair_prompt)
                .await
                .ok()
                .and_then(|text| parse_and_validate(&text))
        }
    };

    Ok(match parsed {
        Some(raw) => Feedback {
            summary: raw.summary,
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
            potential: raw.potential,
            action_items: raw.action_items,
            is_fallback: false,
        },
        None => deterministic_fallback(result),
    })
}
