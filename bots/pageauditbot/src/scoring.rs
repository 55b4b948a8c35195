// SPDX-License-Identifier: PMPL-1.0-or-later
//! Composite accessibility score.
//!
//! Turns an audit's severity counts into a 0-100 score, a rating band, a
//! WCAG verdict, UK legal-compliance flags and a ranked remediation plan.
//! [`ScoringEngine::calculate`] is pure; [`ScoringEngine::score`] also keeps
//! the result keyed by audit id.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{AuditRecord, Summary};
use crate::store::RecordStore;

/// Points removed per issue
pub const CRITICAL_DEDUCTION: f64 = 10.0;
pub const SERIOUS_DEDUCTION: f64 = 3.0;
pub const MODERATE_DEDUCTION: f64 = 1.0;
pub const MINOR_DEDUCTION: f64 = 0.25;

/// Awarded when nothing critical or serious remains and moderates are few
pub const AAA_BONUS: u32 = 5;

/// Score at which a site is treated as legally compliant
pub const COMPLIANCE_TARGET: u32 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Outstanding,
    Good,
    #[serde(rename = "REQUIRES IMPROVEMENT")]
    RequiresImprovement,
    Inadequate,
    Critical,
}

impl Rating {
    /// Band for a final score (inclusive lower bounds)
    pub fn for_score(score: u32) -> Self {
        match score {
            90.. => Rating::Outstanding,
            75..=89 => Rating::Good,
            60..=74 => Rating::RequiresImprovement,
            40..=59 => Rating::Inadequate,
            _ => Rating::Critical,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rating::Outstanding => "Accessible to virtually everyone.",
            Rating::Good => "Minor improvements needed. Most users can access content.",
            Rating::RequiresImprovement => "Significant barriers exist. Some disabled users cannot use site.",
            Rating::Inadequate => "Major accessibility failures. Many disabled users excluded.",
            Rating::Critical => "Immediate action required. Legal risk, user safety concerns.",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Outstanding => write!(f, "OUTSTANDING"),
            Rating::Good => write!(f, "GOOD"),
            Rating::RequiresImprovement => write!(f, "REQUIRES IMPROVEMENT"),
            Rating::Inadequate => write!(f, "INADEQUATE"),
            Rating::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deductions {
    pub critical: f64,
    pub serious: f64,
    pub moderate: f64,
    pub minor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// 100 minus deductions, floored at 0
    pub base_score: f64,
    pub bonuses: u32,
    pub deductions: Deductions,
}

/// Highest WCAG level the issue counts allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerdictLevel {
    AA,
    A,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WcagVerdict {
    pub level: VerdictLevel,
    pub compliant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    PartialCompliance,
    NonCompliant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegalCompliance {
    pub uk_public_sector_regulations_2018: bool,
    pub equality_act_2010: bool,
    pub cqc_digital_standards: bool,
    pub overall_status: ComplianceStatus,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::P0 => write!(f, "P0"),
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: Priority,
    pub action: String,
    pub reason: String,
    pub estimated_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_score_gain: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_score: Option<u32>,
}

/// Derived score for one audit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub audit_id: Uuid,
    pub url: String,
    pub score: u32,
    pub rating: Rating,
    pub rating_description: String,
    pub breakdown: Breakdown,
    /// Counts the score was computed from
    pub issues: Summary,
    pub wcag_verdict: WcagVerdict,
    pub legal_compliance: LegalCompliance,
    /// Highest priority first
    pub recommendations: Vec<Recommendation>,
}

/// Scores audits and keeps the results
pub struct ScoringEngine {
    scores: RecordStore<ScoreRecord>,
}

impl ScoringEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            scores: RecordStore::new(capacity),
        }
    }

    /// Score an audit without storing the result
    pub fn calculate(audit: &AuditRecord) -> ScoreRecord {
        let summary = audit.summary();

        let deductions = Deductions {
            critical: summary.critical as f64 * CRITICAL_DEDUCTION,
            serious: summary.serious as f64 * SERIOUS_DEDUCTION,
            moderate: summary.moderate as f64 * MODERATE_DEDUCTION,
            minor: summary.minor as f64 * MINOR_DEDUCTION,
        };
        let total = deductions.critical + deductions.serious + deductions.moderate + deductions.minor;
        let base_score = (100.0 - total).max(0.0);

        let bonuses = aaa_bonus(&summary) + sector_bonus(audit);
        let score = (base_score + bonuses as f64).min(100.0).round() as u32;
        let rating = Rating::for_score(score);

        ScoreRecord {
            audit_id: audit.id,
            url: audit.url.clone(),
            score,
            rating,
            rating_description: rating.description().to_string(),
            breakdown: Breakdown {
                base_score,
                bonuses,
                deductions,
            },
            issues: summary,
            wcag_verdict: wcag_verdict(&summary),
            legal_compliance: legal_compliance(score, &summary),
            recommendations: recommendations(score, &summary),
        }
    }

    /// Score an audit and keep the result under its audit id
    pub async fn score(&self, audit: &AuditRecord) -> Arc<ScoreRecord> {
        let record = Self::calculate(audit);
        tracing::info!(
            audit_id = %audit.id,
            score = record.score,
            rating = %record.rating,
            "Audit scored"
        );
        self.scores.insert(audit.id, record).await
    }

    pub async fn get_score(&self, audit_id: &Uuid) -> Option<Arc<ScoreRecord>> {
        self.scores.get(audit_id).await
    }
}

fn aaa_bonus(summary: &Summary) -> u32 {
    if summary.critical == 0 && summary.serious == 0 && summary.moderate < 5 {
        AAA_BONUS
    } else {
        0
    }
}

/// Reserved for sector best-practice recognition; nothing earns it yet
fn sector_bonus(_audit: &AuditRecord) -> u32 {
    0
}

pub fn wcag_verdict(summary: &Summary) -> WcagVerdict {
    match (summary.critical, summary.serious) {
        (0, 0) => WcagVerdict {
            level: VerdictLevel::AA,
            compliant: true,
        },
        (0, _) => WcagVerdict {
            level: VerdictLevel::A,
            compliant: true,
        },
        _ => WcagVerdict {
            level: VerdictLevel::None,
            compliant: false,
        },
    }
}

pub fn legal_compliance(score: u32, summary: &Summary) -> LegalCompliance {
    let no_critical = summary.critical == 0;
    let (overall_status, risk_level) = if score >= COMPLIANCE_TARGET && no_critical {
        (ComplianceStatus::Compliant, RiskLevel::Low)
    } else if score >= 70 {
        (ComplianceStatus::PartialCompliance, RiskLevel::Medium)
    } else {
        (ComplianceStatus::NonCompliant, RiskLevel::High)
    };

    LegalCompliance {
        uk_public_sector_regulations_2018: score >= 75 && no_critical,
        equality_act_2010: score >= 70,
        cqc_digital_standards: score >= 75,
        overall_status,
        risk_level,
    }
}

fn days(count: usize, per_issue: f64) -> u32 {
    (count as f64 * per_issue).ceil() as u32
}

pub fn recommendations(score: u32, summary: &Summary) -> Vec<Recommendation> {
    let mut plan = Vec::new();

    if summary.critical > 0 {
        plan.push(Recommendation {
            priority: Priority::P0,
            action: format!("Fix {} critical issue(s) immediately", summary.critical),
            reason: "Legal risk and user safety concerns".to_string(),
            estimated_days: days(summary.critical, 0.5),
            expected_score_gain: Some(summary.critical as u32 * CRITICAL_DEDUCTION as u32),
            current_score: None,
            target_score: None,
        });
    }

    if summary.serious > 0 {
        plan.push(Recommendation {
            priority: Priority::P1,
            action: format!("Address {} serious issue(s)", summary.serious),
            reason: "Major barriers preventing disabled users from accessing content".to_string(),
            estimated_days: days(summary.serious, 0.25),
            expected_score_gain: Some(summary.serious as u32 * SERIOUS_DEDUCTION as u32),
            current_score: None,
            target_score: None,
        });
    }

    if score < COMPLIANCE_TARGET {
        plan.push(Recommendation {
            priority: Priority::P1,
            action: format!("Achieve legal compliance ({}+ score)", COMPLIANCE_TARGET),
            reason: "Meet UK Public Sector Regulations 2018 and CQC standards".to_string(),
            estimated_days: (COMPLIANCE_TARGET - score).div_ceil(5),
            expected_score_gain: None,
            current_score: Some(score),
            target_score: Some(COMPLIANCE_TARGET),
        });
    }

    if summary.moderate > 5 {
        plan.push(Recommendation {
            priority: Priority::P2,
            action: format!("Improve usability by fixing {} moderate issue(s)", summary.moderate),
            reason: "Enhance user experience for all users".to_string(),
            estimated_days: days(summary.moderate, 0.1),
            expected_score_gain: Some(summary.moderate as u32),
            current_score: None,
            target_score: None,
        });
    }

    plan
}

/// Plain-text score card
pub fn summary_text(score: &ScoreRecord) -> String {
    let pass = |ok: bool| if ok { "PASS" } else { "FAIL" };
    let legal = &score.legal_compliance;
    let mut out = String::new();

    out.push_str("ACCESSIBILITY SCORE\n\n");
    out.push_str(&format!("SCORE: {}/100 - {}\n", score.score, score.rating));
    out.push_str(&format!("{}\n\n", score.rating_description));

    out.push_str("ISSUE BREAKDOWN:\n");
    let rows = [
        ("Critical (Must Fix):", score.issues.critical, score.breakdown.deductions.critical),
        ("Serious (Should Fix):", score.issues.serious, score.breakdown.deductions.serious),
        ("Moderate (Nice to Fix):", score.issues.moderate, score.breakdown.deductions.moderate),
        ("Minor (Polish):", score.issues.minor, score.breakdown.deductions.minor),
    ];
    for (label, count, points) in rows {
        out.push_str(&format!("  {:<24} {} issues  [-{} points]\n", label, count, points));
    }

    out.push_str("\nUK LEGAL COMPLIANCE:\n");
    out.push_str(&format!(
        "  Public Sector Regulations 2018: {}\n",
        pass(legal.uk_public_sector_regulations_2018)
    ));
    out.push_str(&format!("  Equality Act 2010: {}\n", pass(legal.equality_act_2010)));
    out.push_str(&format!("  CQC Digital Standards: {}\n", pass(legal.cqc_digital_standards)));
    out.push_str(&format!("  Overall Risk Level: {}\n", legal.risk_level));

    if !score.recommendations.is_empty() {
        out.push_str("\nNEXT STEPS:\n");
        for (i, rec) in score.recommendations.iter().enumerate() {
            out.push_str(&format!(
                "  {}. [{}] {} ({} days)\n",
                i + 1,
                rec.priority,
                rec.action,
                rec.estimated_days
            ));
        }
    }

    let verdict = match score.wcag_verdict.level {
        VerdictLevel::AA => "AA",
        VerdictLevel::A => "A",
        VerdictLevel::None => "None",
    };
    out.push_str(&format!(
        "\nWCAG Compliance Level: {} ({})\n",
        verdict,
        if score.wcag_verdict.compliant { "compliant" } else { "not compliant" }
    ));
    out
}
