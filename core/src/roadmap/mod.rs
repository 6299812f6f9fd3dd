//! Roadmap Planner (spec §4.8) — the second LLM-driven stage, built on top
//! of a [`MatchResult`].
//!
//! One LLM call plans the whole curriculum (not one call per week, per
//! spec §4.8 step 5), parameterized by the gap set, the target grade, and
//! an explicit 70/30 task-budget instruction. The response is validated
//! against the plan shape the spec requires; a single repair retry follows
//! the same pattern as [`crate::feedback`], and a deterministic fallback
//! plan (built straight from the gap set, no LLM) guarantees the endpoint
//! never fails outright.

pub mod gap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::catalog::{catalog, Difficulty, LearningResource};
use crate::error::{CoreError, Result};
use crate::llm::Llm;
use crate::matching::keywords::{extract_keywords, normalize_keyword};
use crate::matching::{MatchGrade, MatchResult};
use gap::GapKeyword;

/// Bounds on `target_weeks` (spec §4.8: "default 8, bounds 4-12").
pub const MIN_WEEKS: u32 = 4;
pub const MAX_WEEKS: u32 = 12;
pub const DEFAULT_WEEKS: u32 = 8;

/// Tasks per week (spec §4.8 step 7, §8 "Plan shape").
const MIN_TASKS: usize = 3;
const MAX_TASKS: usize = 5;

/// Minimum fraction of all tasks across the plan that must reference a gap
/// keyword (spec §4.8 step 3, §8 "Gap coverage").
const GAP_COVERAGE_MIN: f32 = 0.70;

const TOP_IMPROVEMENT_AREAS: usize = 5;
const MAX_RESOURCES_PER_WEEK: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Week {
    pub week_number: u32,
    pub title: String,
    pub duration: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub tasks: Vec<Task>,
    pub resources: Vec<LearningResource>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Roadmap {
    pub total_weeks: u32,
    pub match_grade: MatchGrade,
    pub target_grade: MatchGrade,
    pub summary: String,
    pub key_improvement_areas: Vec<String>,
    pub weekly_plan: Vec<Week>,
    /// True when the LLM weekly-content call failed schema validation twice
    /// and the deterministic fallback plan was used instead.
    pub is_fallback: bool,
}

/// Per-tier planning emphasis (spec §4.8 step 4). Exposed as data so the
/// prompt builder and the deterministic fallback share one source of
/// truth.
fn emphasis_for(grade: MatchGrade) -> &'static str {
    match grade {
        MatchGrade::D => {
            "foundations first; single-keyword weeks; beginner resources dominate"
        }
        MatchGrade::C => "fundamentals plus one intermediate project-themed week",
        MatchGrade::B => "mostly intermediate topics; introduce advanced material in the final two weeks",
        MatchGrade::A => "advanced topics plus interview and portfolio polish",
        MatchGrade::S => "stretch topics plus open-source contribution and portfolio weeks",
    }
}

/// Deterministic per-week difficulty ceiling used for resource selection,
/// derived from the candidate's current grade and the week's position in
/// the plan (spec §4.8 step 4: later weeks trend harder for higher grades).
fn week_difficulty(grade: MatchGrade, week_number: u32, total_weeks: u32) -> Difficulty {
    let is_final_two = week_number + 1 >= total_weeks.max(1) || week_number + 2 >= total_weeks;
    match grade {
        MatchGrade::D => Difficulty::Beginner,
        MatchGrade::C => {
            if week_number + 1 == total_weeks {
                Difficulty::Intermediate
            } else {
                Difficulty::Beginner
            }
        }
        MatchGrade::B => {
            if is_final_two {
                Difficulty::Advanced
            } else {
                Difficulty::Intermediate
            }
        }
        MatchGrade::A | MatchGrade::S => Difficulty::Advanced,
    }
}

fn system_prompt() -> &'static str {
    "You are a career curriculum planner. Given a candidate's résumé/job-description match \
     breakdown, produce a weekly learning plan as a single JSON array. Each element is an \
     object with keys: \"title\" (string), \"duration\" (short human label like \"Week 1\"), \
     \"description\" (1-2 sentences), \"keywords\" (array of lowercase technology keywords, \
     no internal whitespace), and \"tasks\" (array of 3 to 5 objects, each with a \"task\" \
     string and an optional \"priority\" of \"high\", \"medium\", or \"low\"). Return JSON \
     only, no surrounding prose, and return exactly as many elements as the requested number \
     of weeks."
}

fn user_prompt(
    result: &MatchResult,
    target_grade: MatchGrade,
    total_weeks: u32,
    gap: &[GapKeyword],
) -> String {
    let gap_list: Vec<&str> = gap.iter().map(|g| g.keyword.as_str()).collect();
    format!(
        "Current grade: {}. Target grade: {}. Plan length: {} weeks.\n\
         Gap keywords the candidate must close (in priority order): {}.\n\
         Planning emphasis for this tier: {}.\n\
         At least 70% of all tasks across the whole plan must reference one of the gap \
         keywords above; the remaining tasks may reinforce existing strengths or cover \
         bridge topics. Distribute the gap keywords across the weeks rather than repeating \
         the same one every week.",
        result.match_grade,
        target_grade,
        total_weeks,
        gap_list.join(", "),
        emphasis_for(result.match_grade),
    )
}

#[derive(Deserialize)]
struct RawWeek {
    title: String,
    duration: String,
    description: String,
    keywords: Vec<String>,
    tasks: Vec<Task>,
}

/// Parses `response` as a JSON array of weeks and validates it against the
/// plan shape the spec requires. Returns `None` on any violation so the
/// caller can retry or fall back — this function never panics on bad LLM
/// output.
fn parse_and_validate(response: &str, total_weeks: u32, gap: &[GapKeyword]) -> Option<Vec<RawWeek>> {
    let trimmed = response.trim();
    let json_slice = trimmed
        .find('[')
        .and_then(|start| trimmed.rfind(']').map(|end| &trimmed[start..=end]))
        .unwrap_or(trimmed);
    let weeks: Vec<RawWeek> = serde_json::from_str(json_slice).ok()?;

    if weeks.len() != total_weeks as usize {
        return None;
    }
    if weeks
        .iter()
        .any(|w| !(MIN_TASKS..=MAX_TASKS).contains(&w.tasks.len()))
    {
        return None;
    }

    let gap_set: FxHashSet<&str> = gap.iter().map(|g| g.keyword.as_str()).collect();
    if !gap_set.is_empty() && !meets_gap_coverage(&weeks, &gap_set) {
        return None;
    }

    Some(weeks)
}

/// Fraction of tasks across `weeks` that reference a gap keyword, either in
/// the week's own `keywords` list or in the task text itself.
fn meets_gap_coverage(weeks: &[RawWeek], gap_set: &FxHashSet<&str>) -> bool {
    let mut total = 0usize;
    let mut covered = 0usize;
    for week in weeks {
        let week_keywords: FxHashSet<String> =
            week.keywords.iter().map(|k| normalize_keyword(k)).collect();
        let week_has_gap_keyword = week_keywords.iter().any(|k| gap_set.contains(k.as_str()));
        for task in &week.tasks {
            total += 1;
            let task_lower = task.task.to_lowercase();
            let mentions_gap = week_has_gap_keyword
                || gap_set.iter().any(|kw| task_lower.contains(kw));
            if mentions_gap {
                covered += 1;
            }
        }
    }
    if total == 0 {
        return true;
    }
    (covered as f32 / total as f32) >= GAP_COVERAGE_MIN
}

/// Binds catalog resources to a week's keywords (spec §4.8 step 6): up to
/// [`MAX_RESOURCES_PER_WEEK`], preferring difficulty at or below the week's
/// ceiling, never emitting a URL absent from the catalog (guaranteed
/// structurally since every candidate comes from [`catalog()`] itself).
fn bind_resources(keywords: &[String], difficulty: Difficulty) -> Vec<LearningResource> {
    let mut seen_urls = FxHashSet::default();
    let mut resources = Vec::new();
    for keyword in keywords {
        for resource in catalog().lookup_within(keyword, difficulty) {
            if resources.len() >= MAX_RESOURCES_PER_WEEK {
                return resources;
            }
            if seen_urls.insert(resource.url.clone()) {
                resources.push(resource.clone());
            }
        }
    }
    resources
}

/// Deterministic fallback plan: no LLM, built by round-robin assigning gap
/// keywords to weeks so the 70% coverage law holds by construction. Used
/// when the LLM path fails outright or fails validation twice — the
/// roadmap endpoint still returns a usable plan rather than propagating an
/// [`CoreError::Internal`] to the caller whenever a deterministic result is
/// possible (the spec marks Roadmap internal failures as propagated only
/// after this fallback has also been attempted).
fn deterministic_plan(
    result: &MatchResult,
    target_grade: MatchGrade,
    total_weeks: u32,
    gap: &[GapKeyword],
) -> Vec<Week> {
    let mut weeks = Vec::with_capacity(total_weeks as usize);
    let fallback_keyword = "core fundamentals".to_string();

    for week_index in 0..total_weeks {
        let week_number = week_index + 1;
        let primary_keywords: Vec<String> = if gap.is_empty() {
            vec![fallback_keyword.clone()]
        } else {
            let count = if week_index % 3 == 2 { 2 } else { 1 };
            (0..count)
                .map(|offset| {
                    let idx = (week_index as usize + offset) % gap.len();
                    gap[idx].keyword.clone()
                })
                .collect()
        };
        let difficulty = week_difficulty(result.match_grade, week_index, total_weeks);

        let mut tasks = Vec::new();
        for keyword in &primary_keywords {
            tasks.push(Task {
                task: format!("Study {keyword} fundamentals and build a small practice project."),
                priority: Some(Priority::High),
            });
            tasks.push(Task {
                task: format!("Complete a focused tutorial or course on {keyword}."),
                priority: Some(Priority::Medium),
            });
        }
        while tasks.len() < MIN_TASKS {
            tasks.push(Task {
                task: format!(
                    "Review how {} appears across the job description and update your résumé accordingly.",
                    primary_keywords.join(" and ")
                ),
                priority: Some(Priority::Low),
            });
        }
        tasks.truncate(MAX_TASKS);

        let title = if week_number == total_weeks {
            format!("Week {week_number}: Interview readiness and portfolio polish")
        } else {
            format!("Week {week_number}: {}", primary_keywords.join(" & "))
        };
        let description = format!(
            "Targets {} toward a {} grade ({}).",
            primary_keywords.join(", "),
            target_grade,
            emphasis_for(result.match_grade)
        );

        weeks.push(Week {
            week_number,
            title,
            duration: format!("Week {week_number}"),
            description,
            keywords: primary_keywords.clone(),
            tasks,
            resources: bind_resources(&primary_keywords, difficulty),
        });
    }

    weeks
}

fn summary_for(result: &MatchResult, target_grade: MatchGrade, gap_count: usize) -> String {
    format!(
        "Currently grade {} against this job description with {gap_count} gap keyword(s) to \
         close; this plan targets grade {target_grade}.",
        result.match_grade
    )
}

/// Generates an N-week [`Roadmap`] for `result` (spec §4.8). `target_weeks`
/// must already be validated to `[MIN_WEEKS, MAX_WEEKS]` by the caller —
/// the HTTP layer owns input validation (spec §7 `ValidationError`); this
/// function returns [`CoreError::Validation`] defensively if it isn't.
pub async fn generate_roadmap(
    llm: &dyn Llm,
    result: &MatchResult,
    resume_text: &str,
    jd_text: &str,
    target_weeks: u32,
) -> Result<Roadmap> {
    if !(MIN_WEEKS..=MAX_WEEKS).contains(&target_weeks) {
        return Err(CoreError::validation(format!(
            "target_weeks must be between {MIN_WEEKS} and {MAX_WEEKS}, got {target_weeks}"
        )));
    }

    let target_grade = result.match_grade.one_tier_up();
    let resume_keywords = extract_keywords(resume_text);
    let jd_keywords = extract_keywords(jd_text);
    let gap_keywords = gap::compute_gap_set(result, &resume_keywords, &jd_keywords);
    let key_improvement_areas = gap::top_improvement_areas(&gap_keywords, TOP_IMPROVEMENT_AREAS);

    let prompt = user_prompt(result, target_grade, target_weeks, &gap_keywords);
    let first = llm.complete(system_prompt(), &prompt).await;

    let parsed = match first {
        Ok(text) => parse_and_validate(&text, target_weeks, &gap_keywords),
        Err(_) => None,
    };

    let parsed = match parsed {
        Some(weeks) => Some(weeks),
        None => {
            let repair_prompt = format!(
                "{prompt}\n\nYour previous response didn't satisfy the required shape: \
                 exactly {target_weeks} week objects, each with 3 to 5 tasks, and at least \
                 70% of all tasks across the plan referencing one of the listed gap \
                 keywords. Reply again with only a valid JSON array matching that shape."
            );
            llm.complete(system_prompt(), &repair_prompt)
                .await
                .ok()
                .and_then(|text| parse_and_validate(&text, target_weeks, &gap_keywords))
        }
    };

    let (weekly_plan, is_fallback) = match parsed {
        Some(raw_weeks) => {
            let weeks = raw_weeks
                .into_iter()
                .enumerate()
                .map(|(idx, raw)| {
                    let week_number = idx as u32 + 1;
                    let keywords: Vec<String> =
                        raw.keywords.iter().map(|k| normalize_keyword(k)).collect();
                    let difficulty =
                        week_difficulty(result.match_grade, idx as u32, target_weeks);
                    Week {
                        week_number,
                        title: raw.title,
                        duration: raw.duration,
                        description: raw.description,
                        resources: bind_resources(&keywords, difficulty),
                        keywords,
                        tasks: raw.tasks,
                    }
                })
                .collect();
            (weeks, false)
        }
        None => (
            deterministic_plan(result, target_grade, target_weeks, &gap_keywords),
            true,
        ),
    };

    Ok(Roadmap {
        total_weeks: target_weeks,
        match_grade: result.match_grade,
        target_grade,
        summary: summary_for(result, target_grade, gap_keywords.len()),
        key_improvement_areas,
        weekly_plan,
        is_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::matching::{ChunkMatch, SectionScore};
    use crate::types::{DocumentId, SectionType};

    fn weak_result() -> MatchResult {
        MatchResult {
            resume_document_id: DocumentId::new(),
            jd_document_id: DocumentId::new(),
            overall_similarity: 0.3,
            match_score: 40,
            match_grade: MatchGrade::D,
            section_scores: vec![SectionScore {
                section_type: SectionType::Requirements,
                score: 0.2,
                chunk_count: 1,
                top_matches: vec![ChunkMatch {
                    resume_chunk_index: 0,
                    jd_chunk_index: 0,
                    resume_excerpt: "php, mysql, jquery".into(),
                    jd_excerpt: "react, typescript, graphql, aws required".into(),
                    similarity: 0.2,
                }],
            }],
            chunk_matches: Vec::new(),
            similar_tech_matches: Vec::new(),
            similar_tech_bonus: 0.0,
            insufficient_data: false,
        }
    }

    #[tokio::test]
    async fn fallback_plan_has_exact_week_count_and_contiguous_numbers() {
        let llm = MockLlm::always("not json");
        let result = weak_result();
        let roadmap = generate_roadmap(&llm, &result, "php mysql jquery", "react typescript graphql aws", 6)
            .await
            .unwrap();
        assert!(roadmap.is_fallback);
        assert_eq!(roadmap.weekly_plan.len(), 6);
        for (idx, week) in roadmap.weekly_plan.iter().enumerate() {
            assert_eq!(week.week_number, idx as u32 + 1);
            assert!(week.tasks.len() >= MIN_TASKS && week.tasks.len() <= MAX_TASKS);
        }
    }

    #[tokio::test]
    async fn target_grade_is_one_tier_above_current() {
        let llm = MockLlm::always("not json");
        let result = weak_result();
        let roadmap = generate_roadmap(&llm, &result, "php mysql jquery", "react typescript graphql aws", 4)
            .await
            .unwrap();
        assert_eq!(roadmap.target_grade, MatchGrade::C);
    }

    #[tokio::test]
    async fn out_of_bounds_weeks_is_rejected() {
        let llm = MockLlm::always("not json");
        let result = weak_result();
        let err = generate_roadmap(&llm, &result, "x", "y", 20).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn fallback_plan_meets_seventy_percent_gap_coverage() {
        let llm = MockLlm::always("not json");
        let result = weak_result();
        let roadmap = generate_roadmap(&llm, &result, "php mysql jquery", "react typescript graphql aws", 8)
            .await
            .unwrap();
        let gap_keywords = ["react", "typescript", "graphql", "aws"];
        let mut total = 0usize;
        let mut covered = 0usize;
        for week in &roadmap.weekly_plan {
            for task in &week.tasks {
                total += 1;
                let lower = task.task.to_lowercase();
                if gap_keywords.iter().any(|kw| lower.contains(kw)) {
                    covered += 1;
                }
            }
        }
        assert!(covered as f32 / total as f32 >= GAP_COVERAGE_MIN);
    }

    #[tokio::test]
    async fn well_formed_llm_plan_is_used_as_is() {
        let weeks_json: Vec<String> = (1..=4)
            .map(|n| {
                format!(
                    r#"{{"title":"Week {n}","duration":"Week {n}","description":"desc",
                       "keywords":["react"],
                       "tasks":[{{"task":"Practice react basics","priority":"high"}},
                                 {{"task":"Build a react project"}},
                                 {{"task":"Review react docs"}}]}}"#
                )
            })
            .collect();
        let plan_json = format!("[{}]", weeks_json.join(","));
        let llm = MockLlm::always(plan_json);
        let result = weak_result();
        let roadmap = generate_roadmap(&llm, &result, "php mysql jquery", "react typescript graphql aws", 4)
            .await
            .unwrap();
        assert!(!roadmap.is_fallback);
        assert_eq!(roadmap.weekly_plan.len(), 4);
        assert_eq!(roadmap.weekly_plan[0].keywords, vec!["react".to_string()]);
    }

    #[test]
    fn key_improvement_areas_never_exceeds_five() {
        let gap: Vec<GapKeyword> = (0..8)
            .map(|i| GapKeyword {
                keyword: format!("kw{i}"),
                weight: 1.0,
            })
            .collect();
        assert_eq!(gap::top_improvement_areas(&gap, TOP_IMPROVEMENT_AREAS).len(), 5);
    }
}
