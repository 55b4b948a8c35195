// SPDX-License-Identifier: PMPL-1.0-or-later
//! Canonical four-tier severity taxonomy and the per-source mapping tables.
//!
//! Generic detectors speak their own vocabularies. Each one is tagged with
//! the [`SeverityScale`] it uses and every raw label is folded into a
//! [`Severity`] exactly once, at ingestion. Unknown labels land on
//! `moderate`; nothing is ever dropped.

use serde::{Deserialize, Serialize};

/// Canonical severity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks access outright, legal or safety risk
    Critical,
    /// Major barrier for some users
    Serious,
    /// Usability problem
    Moderate,
    /// Polish item
    Minor,
}

impl Severity {
    /// All tiers, most severe first
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Serious,
        Severity::Moderate,
        Severity::Minor,
    ];

    /// Lowercase label used in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Serious => write!(f, "SERIOUS"),
            Severity::Moderate => write!(f, "MODERATE"),
            Severity::Minor => write!(f, "MINOR"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "serious" => Ok(Severity::Serious),
            "moderate" => Ok(Severity::Moderate),
            "minor" => Ok(Severity::Minor),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

/// Severity vocabulary used by a generic detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityScale {
    /// axe-core style impact labels: critical / serious / moderate / minor
    Impact,
    /// pa11y / HTML_CodeSniffer style issue types: error / warning / notice
    Level,
}

impl SeverityScale {
    /// Map a raw label onto the canonical taxonomy. Total: unknown labels
    /// (including empty ones) become `moderate`.
    pub fn normalize(&self, label: &str) -> Severity {
        let label = label.trim().to_ascii_lowercase();
        match (self, label.as_str()) {
            (SeverityScale::Impact, "critical") => Severity::Critical,
            (SeverityScale::Impact, "serious") => Severity::Serious,
            (SeverityScale::Impact, "moderate") => Severity::Moderate,
            (SeverityScale::Impact, "minor") => Severity::Minor,
            (SeverityScale::Level, "error") => Severity::Critical,
            (SeverityScale::Level, "warning") => Severity::Serious,
            (SeverityScale::Level, "notice") => Severity::Moderate,
            _ => Severity::Moderate,
        }
    }
}

/// Free-function form of [`SeverityScale::normalize`]
pub fn normalize(scale: SeverityScale, label: &str) -> Severity {
    scale.normalize(label)
}
