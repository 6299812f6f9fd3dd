//! Text Normalizer (spec §4.1).
//!
//! Pure function, no I/O: cleans extracted text and detects a coarse
//! language tag. Never drops more than 5% of the input — if cleaning would,
//! the original text is returned unchanged rather than risking silent data
//! loss upstream of chunking.

use once_cell::sync::Lazy;
use regex::Regex;

/// Result of normalizing raw extracted text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedText {
    pub cleaned: String,
    pub language: String,
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\x0B\x0C\r]+").unwrap());
static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*(page\s+\d+(\s+of\s+\d+)?|\f|-{2,}\s*page\s*-{2,})\s*$").unwrap());

/// Cleans raw extracted text and detects its primary language.
///
/// Contract: collapses whitespace runs, strips page-marker/form-feed noise,
/// preserves paragraph boundaries (double newline), and falls back to the
/// original input whenever the cleaned version would drop more than 5% of
/// the characters.
pub fn normalize(raw: &str) -> NormalizedText {
    if raw.trim().is_empty() {
        return NormalizedText {
            cleaned: String::new(),
            language: "unknown".to_string(),
        };
    }

    let without_form_feeds = raw.replace('\x0c', "\n");
    let without_markers = PAGE_MARKER.replace_all(&without_form_feeds, "");
    let collapsed_spaces = WHITESPACE_RUN.replace_all(&without_markers, " ");

    let lines: Vec<&str> = collapsed_spaces.lines().map(|l| l.trim_end()).collect();
    let rejoined = lines.join("\n");
    let collapsed_blanks = BLANK_LINE_RUN.replace_all(&rejoined, "\n\n");

    let cleaned = collapsed_blanks
        .trim_matches(|c: char| c.is_whitespace())
        .to_string();

    let raw_len = raw.chars().count().max(1);
    let cleaned_len = cleaned.chars().count();
    let dropped_ratio = 1.0 - (cleaned_len as f64 / raw_len as f64);

    let final_text = if dropped_ratio > 0.05 {
        raw.to_string()
    } else {
        cleaned
    };

    let language = detect_language(&final_text);

    NormalizedText {
        cleaned: final_text,
        language,
    }
}

/// Very small heuristic language detector: counts stopword hits for a
/// handful of languages and falls back to `"unknown"` when nothing clears a
/// minimum bar. This is deliberately coarse — full language ID is an
/// external concern the spec doesn't ask this component to own.
fn detect_language(text: &str) -> String {
    const STOPWORDS: &[(&str, &[&str])] = &[
        (
            "en",
            &[
                " the ", " and ", " with ", " experience ", " years ", " team ",
            ],
        ),
        (
            "es",
            &[" el ", " la ", " con ", " experiencia ", " años ", " equipo "],
        ),
        (
            "ko",
            &["습니다", "합니다", "경력", "프로젝트"],
        ),
    ];

    let padded = format!(" {} ", text.to_lowercase());
    let mut best: Option<(&str, usize)> = None;
    for (lang, words) in STOPWORDS {
        let hits = words.iter().filter(|w| padded.contains(*w)).count();
        if hits > 0 && best.map(|(_, best_hits)| hits > best_hits).unwrap_or(true) {
            best = Some((lang, hits));
        }
    }

    match best {
        Some((lang, hits)) if hits >= 2 => lang.to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_preserves_paragraphs() {
        let raw = "Hello   world.\n\n\n\nSecond   paragraph.";
        let result = normalize(raw);
        assert_eq!(result.cleaned, "Hello world.\n\nSecond paragraph.");
    }

    #[test]
    fn strips_page_markers() {
        let raw = "Intro text.\nPage 1 of 3\nMore content here that is substantial.";
        let result = normalize(raw);
        assert!(!result.cleaned.to_lowercase().contains("page 1 of 3"));
    }

    #[test]
    fn never_drops_more_than_five_percent() {
        // Pathological input: cleaning would gut it, so normalize must
        // return the original text verbatim.
        let raw = "\x0c\x0c\x0c\x0c\x0c\x0c\x0c\x0c\x0c\x0cX";
        let result = normalize(raw);
        assert!(result.cleaned.contains('X'));
    }

    #[test]
    fn detects_english() {
        let raw = "I have 5 years of experience with the backend team and a strong track record.";
        assert_eq!(normalize(raw).language, "en");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let result = normalize("   \n\n  ");
        assert_eq!(result.cleaned, "");
        assert_eq!(result.language, "unknown");
    }

    #[test]
    fn is_pure_and_deterministic() {
        let raw = "Some résumé text.\n\nWith multiple paragraphs and  spacing.";
        assert_eq!(normalize(raw), normalize(raw));
    }
}
