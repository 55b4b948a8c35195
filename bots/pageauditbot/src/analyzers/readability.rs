// SPDX-License-Identifier: PMPL-1.0-or-later
//! Readability analyzer - WCAG 3.1.5 Reading Level, 3.1.3 Unusual Words,
//! 3.1.4 Abbreviations, 2.2.1 Timing Adjustable
//!
//! Scores the main content with Flesch Reading Ease and flags long
//! sentences, dense vocabulary, sector jargon and time limits.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::sync::LazyLock;

use crate::analyzers::{Analyzer, AuditContext};
use crate::error::Result;
use crate::model::Issue;
use crate::page::probes::{self, TimeLimitScan};
use crate::page::{evaluate_as, PageHandle};
use crate::severity::Severity;

pub const TOOL: &str = "cognitive-checker";

/// Below this many characters there is nothing meaningful to score
const MIN_TEXT_CHARS: usize = 100;

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z]+\b").expect("valid regex"));
static VOWEL_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[aeiouy]+").expect("valid regex"));

/// Terms that confuse residents and families
const JARGON: &[&str] = &[
    "holistic",
    "multidisciplinary",
    "stakeholder",
    "baseline",
    "metrics",
    "synergy",
    "leverage",
    "paradigm",
    "utilization",
    "facilitate",
    "implementation",
    "optimization",
    "streamline",
    "bandwidth",
    "CQC",
    "GDPR",
    "safeguarding",
    "care plan",
    "risk assessment",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceLength {
    pub text: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexWord {
    pub word: String,
    pub syllables: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityMetrics {
    /// Clamped to [0, 100]
    pub flesch_reading_ease: f64,
    pub reading_level: String,
    pub sentence_count: usize,
    pub word_count: usize,
    pub average_sentence_length: f64,
    pub average_syllables_per_word: f64,
    /// First 20 complex words in reading order
    pub complex_words: Vec<ComplexWord>,
    pub complex_word_percentage: f64,
    /// Five longest sentences, longest first
    pub longest_sentences: Vec<SentenceLength>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilitySummary {
    pub reading_level: String,
    pub flesch_score: f64,
    pub average_sentence_length: f64,
    pub complex_word_percentage: f64,
    pub jargon_terms: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityReport {
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ReadabilityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReadabilitySummary>,
    /// Set when the page was not scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Cognitive accessibility checker
pub struct ReadabilityAnalyzer;

impl ReadabilityAnalyzer {
    pub async fn check(&self, page: &dyn PageHandle) -> Result<ReadabilityReport> {
        let text: String = evaluate_as(page, &probes::MAIN_TEXT, json!({})).await?;

        let Some(metrics) = measure(&text) else {
            tracing::debug!(chars = text.chars().count(), "Not enough text to score");
            return Ok(ReadabilityReport {
                message: Some("Insufficient text content to analyze".to_string()),
                ..Default::default()
            });
        };

        let jargon = detect_jargon(&text);
        let mut issues = text_issues(&metrics, &jargon);

        let time_limits = match evaluate_as::<TimeLimitScan>(page, &probes::TIME_LIMITS, json!({})).await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Time limit scan failed: {}", e);
                TimeLimitScan::default()
            }
        };
        if time_limits.found {
            issues.push(
                Issue::new(
                    TOOL,
                    "time-limits",
                    Severity::Serious,
                    "Time limits detected - may trap users who need more time",
                )
                .with_wcag(&["2.2.1"])
                .with_evidence("details", &time_limits.details)
                .with_suggestion("Allow users to extend, adjust, or disable time limits"),
            );
        }

        let summary = ReadabilitySummary {
            reading_level: metrics.reading_level.clone(),
            flesch_score: round1(metrics.flesch_reading_ease),
            average_sentence_length: round1(metrics.average_sentence_length),
            complex_word_percentage: round1(metrics.complex_word_percentage),
            jargon_terms: jargon.len(),
        };

        Ok(ReadabilityReport {
            issues,
            metrics: Some(metrics),
            summary: Some(summary),
            message: None,
        })
    }
}

#[async_trait]
impl Analyzer for ReadabilityAnalyzer {
    fn name(&self) -> &str {
        TOOL
    }

    async fn analyze(&self, page: &dyn PageHandle, _ctx: &AuditContext) -> Result<Vec<Issue>> {
        Ok(self.check(page).await?.issues)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Approximate English syllable count; never less than one
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    if word.len() <= 3 {
        return 1;
    }

    let mut stem = word.as_str();
    if let Some(rest) = stem.strip_suffix("es") {
        if !rest.ends_with(['s', 'x', 'z', 'c', 'g', 'h']) {
            stem = rest;
        }
    } else if let Some(rest) = stem.strip_suffix("ed") {
        if !rest.ends_with(['t', 'd']) {
            stem = rest;
        }
    } else if let Some(rest) = stem.strip_suffix('e') {
        if !rest.ends_with("l") || rest.len() < 2 {
            stem = rest;
        }
    }

    VOWEL_GROUP.find_iter(stem).count().max(1)
}

/// Reading-level band for a Flesch score
pub fn reading_level(flesch: f64) -> &'static str {
    match flesch {
        f if f >= 90.0 => "Very Easy (5th grade)",
        f if f >= 80.0 => "Easy (6th grade)",
        f if f >= 70.0 => "Fairly Easy (7th grade)",
        f if f >= 60.0 => "Standard (8th-9th grade)",
        f if f >= 50.0 => "Fairly Difficult (10th-12th grade)",
        f if f >= 30.0 => "Difficult (College)",
        _ => "Very Difficult (College graduate)",
    }
}

/// Compute metrics, or `None` when the text is too short or has no words
pub fn measure(text: &str) -> Option<ReadabilityMetrics> {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    let sentences: Vec<&str> = SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let lower = text.to_lowercase();
    let words: Vec<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
    if words.is_empty() || sentences.is_empty() {
        return None;
    }

    let mut syllables = 0;
    let mut complex = Vec::new();
    for word in &words {
        let count = count_syllables(word);
        syllables += count;
        if count >= 3 && word.len() > 6 {
            complex.push(ComplexWord {
                word: word.to_string(),
                syllables: count,
            });
        }
    }

    let words_per_sentence = words.len() as f64 / sentences.len() as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    let raw = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    let flesch = raw.clamp(0.0, 100.0);

    let mut longest: Vec<SentenceLength> = sentences
        .iter()
        .map(|s| SentenceLength {
            text: s.to_string(),
            word_count: s.split_whitespace().count(),
        })
        .collect();
    longest.sort_by(|a, b| b.word_count.cmp(&a.word_count));
    longest.truncate(5);

    let complex_word_percentage = complex.len() as f64 / words.len() as f64 * 100.0;
    complex.truncate(20);

    Some(ReadabilityMetrics {
        flesch_reading_ease: flesch,
        reading_level: reading_level(flesch).to_string(),
        sentence_count: sentences.len(),
        word_count: words.len(),
        average_sentence_length: words_per_sentence,
        average_syllables_per_word: syllables_per_word,
        complex_words: complex,
        complex_word_percentage,
        longest_sentences: longest,
    })
}

/// Jargon terms present in the text, in list order
pub fn detect_jargon(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    JARGON
        .iter()
        .copied()
        .filter(|term| lower.contains(&term.to_lowercase()))
        .collect()
}

fn text_issues(metrics: &ReadabilityMetrics, jargon: &[&str]) -> Vec<Issue> {
    let mut issues = Vec::new();

    if metrics.flesch_reading_ease < 60.0 {
        let severity = if metrics.flesch_reading_ease < 30.0 {
            Severity::Serious
        } else {
            Severity::Moderate
        };
        issues.push(
            Issue::new(
                TOOL,
                "difficult-reading-level",
                severity,
                &format!(
                    "Text is difficult to read (Flesch score: {:.1})",
                    metrics.flesch_reading_ease
                ),
            )
            .with_wcag(&["3.1.5"])
            .with_evidence("detail", format!("Reading level: {}", metrics.reading_level))
            .with_evidence("currentScore", round1(metrics.flesch_reading_ease))
            .with_evidence("targetScore", "60+")
            .with_suggestion("Simplify sentences and use common words. Target Flesch score: 60+"),
        );
    }

    if metrics.average_sentence_length > 25.0 {
        let longest: Vec<&SentenceLength> = metrics.longest_sentences.iter().take(3).collect();
        issues.push(
            Issue::new(
                TOOL,
                "long-sentences",
                Severity::Moderate,
                &format!(
                    "Sentences are too long (average: {:.1} words)",
                    metrics.average_sentence_length
                ),
            )
            .with_wcag(&["3.1.5"])
            .with_evidence("longestSentences", longest)
            .with_suggestion("Break long sentences into shorter ones. Target: 15-20 words per sentence"),
        );
    }

    if metrics.complex_word_percentage > 15.0 {
        let examples: Vec<&ComplexWord> = metrics.complex_words.iter().take(10).collect();
        issues.push(
            Issue::new(
                TOOL,
                "complex-vocabulary",
                Severity::Moderate,
                &format!(
                    "{:.1}% of words are complex (3+ syllables)",
                    metrics.complex_word_percentage
                ),
            )
            .with_wcag(&["3.1.5"])
            .with_evidence("examples", examples)
            .with_suggestion("Use simpler alternatives for complex words. Target: <10% complex words"),
        );
    }

    if !jargon.is_empty() {
        issues.push(
            Issue::new(
                TOOL,
                "jargon-detected",
                Severity::Minor,
                &format!("Technical jargon found ({} terms)", jargon.len()),
            )
            .with_wcag(&["3.1.3", "3.1.4"])
            .with_evidence("terms", jargon)
            .with_suggestion("Provide definitions or simpler alternatives"),
        );
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::ScriptedPage;

    const PLAIN: &str = "The cat sat on the mat. We like to read. The sun is warm today. \
        Our home has a big garden. You can walk with us. Tea is at four.";

    const DENSE: &str = "The multidisciplinary implementation of comprehensive organizational \
        optimization methodologies necessitates considerable interdepartmental collaboration, \
        particularly regarding individualized safeguarding documentation and administrative \
        accountability frameworks throughout residential establishments across all regions nationwide.";

    #[test]
    fn test_syllable_heuristic() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("reading"), 2);
        assert_eq!(count_syllables("wanted"), 2);
        assert_eq!(count_syllables("boxes"), 2);
        assert_eq!(count_syllables("implementation"), 5);
        assert_eq!(count_syllables("rhythm"), 1);
    }

    #[test]
    fn test_reading_level_bands() {
        assert_eq!(reading_level(95.0), "Very Easy (5th grade)");
        assert_eq!(reading_level(60.0), "Standard (8th-9th grade)");
        assert_eq!(reading_level(30.0), "Difficult (College)");
        assert_eq!(reading_level(0.0), "Very Difficult (College graduate)");
    }

    #[test]
    fn test_short_text_is_not_scored() {
        assert!(measure("Too short to score.").is_none());
        assert!(measure(&"1234567890 ".repeat(12)).is_none());
    }

    #[test]
    fn test_flesch_is_clamped() {
        let easy = measure(&"Go. ".repeat(40)).unwrap();
        assert_eq!(easy.flesch_reading_ease, 100.0);

        let hard = measure(DENSE).unwrap();
        assert_eq!(hard.flesch_reading_ease, 0.0);
        assert_eq!(hard.sentence_count, 1);
    }

    #[test]
    fn test_plain_text_raises_nothing() {
        let metrics = measure(PLAIN).unwrap();
        assert!(metrics.flesch_reading_ease >= 90.0);
        assert!(text_issues(&metrics, &detect_jargon(PLAIN)).is_empty());
    }

    #[test]
    fn test_dense_text_raises_every_text_rule() {
        let metrics = measure(DENSE).unwrap();
        let issues = text_issues(&metrics, &detect_jargon(DENSE));
        let kinds: Vec<&str> = issues.iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["difficult-reading-level", "long-sentences", "complex-vocabulary", "jargon-detected"]
        );
        assert_eq!(issues[0].severity(), Severity::Serious);
        assert_eq!(issues[3].severity(), Severity::Minor);
        assert_eq!(issues[3].evidence["terms"], json!(["multidisciplinary", "implementation", "optimization", "safeguarding"]));
    }

    #[test]
    fn test_jargon_is_case_insensitive_substring() {
        assert_eq!(detect_jargon("Ask the CQC about your Care Plan"), vec!["CQC", "care plan"]);
        assert!(detect_jargon("Nothing unusual here").is_empty());
    }

    #[tokio::test]
    async fn test_time_limits_reported() {
        let page = ScriptedPage::default()
            .with("main-text", json!(PLAIN))
            .with(
                "time-limits",
                json!({ "found": true, "details": [{ "kind": "Meta refresh detected", "preview": "300" }] }),
            );
        let report = ReadabilityAnalyzer.check(&page).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, "time-limits");
        assert_eq!(report.issues[0].severity(), Severity::Serious);
        assert_eq!(report.summary.unwrap().jargon_terms, 0);
    }

    #[tokio::test]
    async fn test_insufficient_content_reports_message() {
        let page = ScriptedPage::default().with("main-text", json!("Welcome"));
        let report = ReadabilityAnalyzer.check(&page).await.unwrap();
        assert!(report.issues.is_empty());
        assert!(report.metrics.is_none());
        assert_eq!(report.message.as_deref(), Some("Insufficient text content to analyze"));
    }
}
