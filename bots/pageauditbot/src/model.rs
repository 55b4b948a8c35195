// SPDX-License-Identifier: PMPL-1.0-or-later
//! Canonical issue model and the audit record.
//!
//! Every analyzer, first-party or generic, produces [`Issue`]s. An audit keeps
//! them in one ordered [`IssueSet`] (execution order) and derives the four
//! severity buckets and the summary counts from it on demand.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::severity::Severity;

/// WCAG conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    /// Level A - minimum conformance
    A,
    /// Level AA - standard conformance
    AA,
    /// Level AAA - enhanced conformance
    AAA,
}

impl std::fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WcagLevel::A => write!(f, "A"),
            WcagLevel::AA => write!(f, "AA"),
            WcagLevel::AAA => write!(f, "AAA"),
        }
    }
}

impl std::str::FromStr for WcagLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(WcagLevel::A),
            "AA" => Ok(WcagLevel::AA),
            "AAA" => Ok(WcagLevel::AAA),
            other => Err(format!("Unknown WCAG level: {}", other)),
        }
    }
}

/// How much of the pipeline an audit runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Fast generic detector only
    Summary,
    /// Every detector and first-party analyzer
    Full,
}

impl std::fmt::Display for AuditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditMode::Summary => write!(f, "summary"),
            AuditMode::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for AuditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(AuditMode::Summary),
            "full" => Ok(AuditMode::Full),
            other => Err(format!("Unknown audit mode: {}", other)),
        }
    }
}

/// Browser engine an audit is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserTarget {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserTarget {
    /// Every supported target, in comparison order
    pub const ALL: [BrowserTarget; 3] = [
        BrowserTarget::Chromium,
        BrowserTarget::Firefox,
        BrowserTarget::Webkit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserTarget::Chromium => "chromium",
            BrowserTarget::Firefox => "firefox",
            BrowserTarget::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for BrowserTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BrowserTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserTarget::Chromium),
            "firefox" => Ok(BrowserTarget::Firefox),
            "webkit" | "safari" => Ok(BrowserTarget::Webkit),
            other => Err(format!("Unknown browser: {}", other)),
        }
    }
}

/// One detected accessibility defect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Analyzer that produced the issue
    pub tool: String,
    /// Stable machine-readable defect code
    #[serde(rename = "type")]
    pub kind: String,
    /// WCAG clause ids and domain-standard ids, in insertion order
    #[serde(default)]
    pub wcag_tags: Vec<String>,
    /// Decided at ingestion, never recomputed
    severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Analyzer-specific evidence, not interpreted downstream
    #[serde(flatten)]
    pub evidence: Map<String, Value>,
}

impl Issue {
    /// Create a new issue
    pub fn new(tool: &str, kind: &str, severity: Severity, description: &str) -> Self {
        Self {
            tool: tool.to_string(),
            kind: kind.to_string(),
            wcag_tags: Vec::new(),
            severity,
            description: description.to_string(),
            selector: None,
            element: None,
            suggestion: None,
            evidence: Map::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Append standard references, keeping the first occurrence of each
    pub fn with_wcag<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        for tag in tags {
            let tag = tag.as_ref();
            if !tag.is_empty() && !self.wcag_tags.iter().any(|t| t == tag) {
                self.wcag_tags.push(tag.to_string());
            }
        }
        self
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn with_element(mut self, element: &str) -> Self {
        self.element = Some(element.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Attach a piece of evidence. Values that fail to serialize are skipped.
    pub fn with_evidence(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.evidence.insert(key.to_string(), value);
        }
        self
    }

    /// Get location string for display
    pub fn location_string(&self) -> String {
        match (&self.selector, &self.element) {
            (Some(s), _) => s.clone(),
            (None, Some(e)) => e.clone(),
            _ => "<page>".to_string(),
        }
    }
}

/// Issues in execution order; severity buckets are views over it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueSet {
    issues: Vec<Issue>,
}

impl IssueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    /// One severity bucket, in insertion order
    pub fn bucket(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.bucket(severity).count()
    }

    /// Issues produced by one tool
    pub fn from_tool<'a>(&'a self, tool: &'a str) -> impl Iterator<Item = &'a Issue> {
        self.issues.iter().filter(move |i| i.tool == tool)
    }

    /// Counts derived from the bucket lengths
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for issue in &self.issues {
            match issue.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Serious => summary.serious += 1,
                Severity::Moderate => summary.moderate += 1,
                Severity::Minor => summary.minor += 1,
            }
        }
        summary.total = summary.critical + summary.serious + summary.moderate + summary.minor;
        summary
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

impl FromIterator<Issue> for IssueSet {
    fn from_iter<T: IntoIterator<Item = Issue>>(iter: T) -> Self {
        Self {
            issues: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for IssueSet {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a> IntoIterator for &'a IssueSet {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

/// Serialized as `{ "critical": [...], "serious": [...], "moderate": [...], "minor": [...] }`
impl Serialize for IssueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Severity::ALL.len()))?;
        for severity in Severity::ALL {
            let bucket: Vec<&Issue> = self.bucket(severity).collect();
            map.serialize_entry(severity.as_str(), &bucket)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IssueSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Buckets {
            #[serde(default)]
            critical: Vec<Issue>,
            #[serde(default)]
            serious: Vec<Issue>,
            #[serde(default)]
            moderate: Vec<Issue>,
            #[serde(default)]
            minor: Vec<Issue>,
        }

        let b = Buckets::deserialize(deserializer)?;
        Ok(b.critical
            .into_iter()
            .chain(b.serious)
            .chain(b.moderate)
            .chain(b.minor)
            .collect())
    }
}

/// Per-severity counts plus total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub critical: usize,
    pub serious: usize,
    pub moderate: usize,
    pub minor: usize,
}

impl Summary {
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Serious => self.serious,
            Severity::Moderate => self.moderate,
            Severity::Minor => self.minor,
        }
    }
}

/// An analyzer that failed during a run and contributed no issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub tool: String,
    pub message: String,
}

/// One audit run
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub url: String,
    pub mode: AuditMode,
    pub browser: BrowserTarget,
    pub wcag_level: WcagLevel,
    pub timestamp: DateTime<Utc>,
    /// Analyzer names in execution order
    pub tools_run: Vec<String>,
    pub issues: IssueSet,
    pub failures: Vec<AnalyzerFailure>,
    pub duration_seconds: f64,
}

impl AuditRecord {
    pub fn new(url: &str, mode: AuditMode, browser: BrowserTarget, wcag_level: WcagLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            mode,
            browser,
            wcag_level,
            timestamp: Utc::now(),
            tools_run: Vec::new(),
            issues: IssueSet::new(),
            failures: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    /// Append a stage's issues behind everything merged so far
    pub fn merge(&mut self, tool: &str, issues: impl IntoIterator<Item = Issue>) {
        self.tools_run.push(tool.to_string());
        self.issues.extend(issues);
    }

    /// Record a stage that ran but failed
    pub fn record_failure(&mut self, tool: &str, message: String) {
        self.tools_run.push(tool.to_string());
        self.failures.push(AnalyzerFailure {
            tool: tool.to_string(),
            message,
        });
    }

    /// Always recomputed from the issue buckets
    pub fn summary(&self) -> Summary {
        self.issues.summary()
    }

    pub fn has_critical(&self) -> bool {
        self.issues.count(Severity::Critical) > 0
    }
}

impl Serialize for AuditRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AuditRecord", 11)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("url", &self.url)?;
        s.serialize_field("mode", &self.mode)?;
        s.serialize_field("browserTarget", &self.browser)?;
        s.serialize_field("wcagLevel", &self.wcag_level)?;
        s.serialize_field("timestamp", &self.timestamp)?;
        s.serialize_field("toolsRun", &self.tools_run)?;
        s.serialize_field("issues", &self.issues)?;
        s.serialize_field("summary", &self.summary())?;
        s.serialize_field("failures", &self.failures)?;
        s.serialize_field("durationSeconds", &format!("{:.2}", self.duration_seconds))?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(tool: &str, severity: Severity) -> Issue {
        Issue::new(tool, "sample", severity, "sample issue")
    }

    #[test]
    fn test_summary_matches_bucket_lengths() {
        let mut record = AuditRecord::new("https://example.org", AuditMode::Full, BrowserTarget::Chromium, WcagLevel::AA);
        record.merge("a", vec![issue("a", Severity::Critical), issue("a", Severity::Minor)]);
        record.merge("b", vec![issue("b", Severity::Serious), issue("b", Severity::Minor)]);

        let summary = record.summary();
        assert_eq!(summary.total, 4);
        for sev in Severity::ALL {
            assert_eq!(summary.count(sev), record.issues.bucket(sev).count());
        }
        assert_eq!(
            summary.total,
            summary.critical + summary.serious + summary.moderate + summary.minor
        );
    }

    #[test]
    fn test_bucket_keeps_insertion_order() {
        let mut set = IssueSet::new();
        set.push(Issue::new("first", "x", Severity::Minor, "one"));
        set.push(Issue::new("second", "x", Severity::Critical, "two"));
        set.push(Issue::new("third", "x", Severity::Minor, "three"));

        let minors: Vec<_> = set.bucket(Severity::Minor).map(|i| i.tool.as_str()).collect();
        assert_eq!(minors, vec!["first", "third"]);
    }

    #[test]
    fn test_with_wcag_is_an_ordered_set() {
        let issue = Issue::new("t", "k", Severity::Minor, "d").with_wcag(&["1.4.3", "1.4.6", "1.4.3", ""]);
        assert_eq!(issue.wcag_tags, vec!["1.4.3", "1.4.6"]);
    }

    #[test]
    fn test_issue_serializes_type_and_evidence_inline() {
        let issue = Issue::new("contrast-checker", "insufficient-contrast", Severity::Serious, "low contrast")
            .with_evidence("actualRatio", 3.2);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "insufficient-contrast");
        assert_eq!(json["severity"], "serious");
        assert_eq!(json["actualRatio"], 3.2);
        assert!(json.get("selector").is_none());
    }

    #[test]
    fn test_issue_set_bucketed_json_roundtrip() {
        let set: IssueSet = vec![
            Issue::new("a", "x", Severity::Serious, "s"),
            Issue::new("a", "y", Severity::Critical, "c"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["critical"].as_array().unwrap().len(), 1);
        assert_eq!(json["serious"].as_array().unwrap().len(), 1);
        assert!(json["minor"].as_array().unwrap().is_empty());

        let back: IssueSet = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary(), set.summary());
    }

    #[test]
    fn test_record_document_shape() {
        let mut record = AuditRecord::new("https://example.org", AuditMode::Summary, BrowserTarget::Firefox, WcagLevel::AAA);
        record.merge("markup-rules", vec![issue("markup-rules", Severity::Moderate)]);
        record.duration_seconds = 1.234;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["browserTarget"], "firefox");
        assert_eq!(json["wcagLevel"], "AAA");
        assert_eq!(json["summary"]["moderate"], 1);
        assert_eq!(json["durationSeconds"], "1.23");
        assert_eq!(json["toolsRun"][0], "markup-rules");
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("aa".parse::<WcagLevel>().unwrap(), WcagLevel::AA);
        assert_eq!("FULL".parse::<AuditMode>().unwrap(), AuditMode::Full);
        assert_eq!("webkit".parse::<BrowserTarget>().unwrap(), BrowserTarget::Webkit);
        assert!("opera".parse::<BrowserTarget>().is_err());
    }
}
