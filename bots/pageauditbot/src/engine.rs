// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit orchestration.
//!
//! [`AuditEngine`] owns the automation collaborator and the keyed audit and
//! score stores. One audit loads one page and runs its stages strictly in
//! order against it; a stage that fails is recorded and skipped. Browser
//! comparison fans out one audit per enabled target.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::analyzers::aria::AriaReport;
use crate::analyzers::contrast::ContrastReport;
use crate::analyzers::domain::DomainReport;
use crate::analyzers::forms::FormReport;
use crate::analyzers::keyboard::KeyboardReport;
use crate::analyzers::readability::ReadabilityReport;
use crate::analyzers::{
    aria, contrast, domain, forms, keyboard, readability, Analyzer, AriaValidator, AuditContext,
    ContrastAnalyzer, DetectorStage, DomainComplianceAnalyzer, FormAuditor, KeyboardFlowAnalyzer,
    ReadabilityAnalyzer,
};
use crate::config::Config;
use crate::detectors::{MarkupRules, StructureRules};
use crate::error::{Error, Result};
use crate::model::{AuditMode, AuditRecord, BrowserTarget, WcagLevel};
use crate::page::{Automation, Navigation, PageHandle};
use crate::scoring::{ScoreRecord, ScoringEngine};
use crate::store::RecordStore;

/// What to audit and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRequest {
    pub url: String,
    pub mode: AuditMode,
    pub browser: BrowserTarget,
    pub wcag_level: WcagLevel,
}

impl AuditRequest {
    /// Request for `url` using the configured defaults
    pub fn with_defaults(url: &str, config: &Config) -> Self {
        Self {
            url: url.to_string(),
            mode: config.audit.default_mode,
            browser: config.browsers.default,
            wcag_level: config.audit.default_wcag_level,
        }
    }

    pub fn mode(mut self, mode: AuditMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn browser(mut self, browser: BrowserTarget) -> Self {
        self.browser = browser;
        self
    }

    pub fn wcag_level(mut self, level: WcagLevel) -> Self {
        self.wcag_level = level;
        self
    }
}

/// Result of one target in a browser comparison
#[derive(Debug, Clone)]
pub enum BrowserOutcome {
    Completed(Arc<AuditRecord>),
    Failed { error: String },
}

impl BrowserOutcome {
    pub fn record(&self) -> Option<&AuditRecord> {
        match self {
            BrowserOutcome::Completed(record) => Some(record),
            BrowserOutcome::Failed { .. } => None,
        }
    }
}

/// A completed target serializes as its audit record, a failed one as `{ "error": ... }`
impl Serialize for BrowserOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BrowserOutcome::Completed(record) => record.as_ref().serialize(serializer),
            BrowserOutcome::Failed { error } => {
                #[derive(Serialize)]
                struct Failure<'a> {
                    error: &'a str,
                }
                Failure { error }.serialize(serializer)
            }
        }
    }
}

/// Audit orchestrator and record keeper
#[derive(Clone)]
pub struct AuditEngine {
    automation: Arc<dyn Automation>,
    config: Arc<Config>,
    audits: Arc<RecordStore<AuditRecord>>,
    scoring: Arc<ScoringEngine>,
}

impl AuditEngine {
    pub fn new(automation: Arc<dyn Automation>, config: Config) -> Self {
        Self {
            audits: Arc::new(RecordStore::new(config.store.max_audits)),
            scoring: Arc::new(ScoringEngine::new(config.store.max_scores)),
            automation,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Request for `url` using the configured defaults
    pub fn request(&self, url: &str) -> AuditRequest {
        AuditRequest::with_defaults(url, &self.config)
    }

    /// Stages for `mode`, in execution order
    fn stages(&self, mode: AuditMode) -> Vec<Box<dyn Analyzer>> {
        let mut stages: Vec<Box<dyn Analyzer>> = vec![Box::new(DetectorStage::new(MarkupRules))];
        if mode == AuditMode::Full {
            stages.push(Box::new(DetectorStage::new(StructureRules)));
            stages.push(Box::new(ContrastAnalyzer));
            stages.push(Box::new(KeyboardFlowAnalyzer::new(&self.config.keyboard)));
            stages.push(Box::new(ReadabilityAnalyzer));
            stages.push(Box::new(DomainComplianceAnalyzer::new(self.config.domain.clone())));
        }
        stages
    }

    /// Load a page, releasing whatever the collaborator handed back if loading failed
    async fn open(&self, url: &str, browser: BrowserTarget) -> Result<Box<dyn PageHandle>> {
        match self.automation.navigate(url, browser).await? {
            Navigation::Loaded(page) => Ok(page),
            Navigation::Failed { page, error } => {
                tracing::warn!(url, browser = %browser, "Navigation failed: {}", error);
                if let Some(page) = page {
                    release(page.as_ref()).await;
                }
                Err(Error::Navigation(error))
            }
        }
    }

    /// Load the page, run every stage for the requested mode and store the record
    pub async fn run_audit(&self, request: AuditRequest) -> Result<Arc<AuditRecord>> {
        let started = Instant::now();
        let mut record = AuditRecord::new(&request.url, request.mode, request.browser, request.wcag_level);
        let audit_id = record.id;

        tracing::info!(
            audit_id = %audit_id,
            url = %request.url,
            browser = %request.browser,
            mode = %request.mode,
            "Starting audit"
        );

        let page = self.open(&request.url, request.browser).await?;
        let ctx = AuditContext::new(request.wcag_level);

        for stage in self.stages(request.mode) {
            let tool = stage.name().to_string();
            tracing::debug!(audit_id = %audit_id, tool = %tool, "Running stage");
            match stage.analyze(page.as_ref(), &ctx).await {
                Ok(issues) => record.merge(&tool, issues),
                Err(e) => {
                    tracing::warn!(audit_id = %audit_id, tool = %tool, "Stage failed: {}", e);
                    record.record_failure(&tool, e.to_string());
                }
            }
        }

        release(page.as_ref()).await;
        record.duration_seconds = started.elapsed().as_secs_f64();

        let summary = record.summary();
        tracing::info!(
            audit_id = %audit_id,
            url = %request.url,
            browser = %request.browser,
            total = summary.total,
            critical = summary.critical,
            failures = record.failures.len(),
            "Audit complete in {:.2}s",
            record.duration_seconds
        );

        Ok(self.audits.insert(audit_id, record).await)
    }

    /// Summary-mode audit of `url` in every enabled target, concurrently.
    /// A target that fails never affects the others.
    pub async fn compare_browsers(
        &self,
        url: &str,
        wcag_level: WcagLevel,
    ) -> BTreeMap<BrowserTarget, BrowserOutcome> {
        let targets = self.automation.enabled_targets();
        let mut tasks = JoinSet::new();

        for target in targets.iter().copied() {
            let engine = self.clone();
            let request = self
                .request(url)
                .mode(AuditMode::Summary)
                .browser(target)
                .wcag_level(wcag_level);
            tasks.spawn(async move { (target, engine.run_audit(request).await) });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((target, Ok(record))) => {
                    outcomes.insert(target, BrowserOutcome::Completed(record));
                }
                Ok((target, Err(e))) => {
                    tracing::warn!(url, browser = %target, "Comparison run failed: {}", e);
                    outcomes.insert(target, BrowserOutcome::Failed { error: e.to_string() });
                }
                Err(e) => tracing::error!(url, "Comparison task aborted: {}", e),
            }
        }

        for target in targets {
            outcomes.entry(target).or_insert_with(|| BrowserOutcome::Failed {
                error: "audit task aborted".to_string(),
            });
        }
        outcomes
    }

    pub async fn get_audit(&self, audit_id: &Uuid) -> Result<Arc<AuditRecord>> {
        self.audits
            .get(audit_id)
            .await
            .ok_or(Error::AuditNotFound(*audit_id))
    }

    /// Score a stored audit, keeping the result
    pub async fn score(&self, audit_id: &Uuid) -> Result<Arc<ScoreRecord>> {
        let audit = self.get_audit(audit_id).await?;
        Ok(self.scoring.score(&audit).await)
    }

    pub async fn get_score(&self, audit_id: &Uuid) -> Result<Arc<ScoreRecord>> {
        self.scoring
            .get_score(audit_id)
            .await
            .ok_or(Error::AuditNotFound(*audit_id))
    }

    pub async fn check_contrast(
        &self,
        url: &str,
        browser: BrowserTarget,
        level: WcagLevel,
        scope: Option<&str>,
    ) -> Result<ContrastReport> {
        let page = self.open(url, browser).await?;
        let report = ContrastAnalyzer.check(page.as_ref(), level, scope).await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(contrast::TOOL, e))
    }

    pub async fn test_keyboard(
        &self,
        url: &str,
        browser: BrowserTarget,
        start_selector: Option<&str>,
    ) -> Result<KeyboardReport> {
        let page = self.open(url, browser).await?;
        let report = KeyboardFlowAnalyzer::new(&self.config.keyboard)
            .check(page.as_ref(), start_selector)
            .await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(keyboard::TOOL, e))
    }

    pub async fn check_readability(&self, url: &str, browser: BrowserTarget) -> Result<ReadabilityReport> {
        let page = self.open(url, browser).await?;
        let report = ReadabilityAnalyzer.check(page.as_ref()).await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(readability::TOOL, e))
    }

    pub async fn check_domain_standards(&self, url: &str, browser: BrowserTarget) -> Result<DomainReport> {
        let page = self.open(url, browser).await?;
        let report = DomainComplianceAnalyzer::new(self.config.domain.clone())
            .check(page.as_ref())
            .await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(domain::TOOL, e))
    }

    pub async fn validate_aria_labels(
        &self,
        url: &str,
        browser: BrowserTarget,
        interactive_only: bool,
    ) -> Result<AriaReport> {
        let page = self.open(url, browser).await?;
        let report = AriaValidator.check(page.as_ref(), interactive_only).await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(aria::TOOL, e))
    }

    pub async fn audit_form_accessibility(
        &self,
        url: &str,
        browser: BrowserTarget,
        form_selector: Option<&str>,
    ) -> Result<FormReport> {
        let page = self.open(url, browser).await?;
        let report = FormAuditor.check(page.as_ref(), form_selector).await;
        release(page.as_ref()).await;
        report.map_err(|e| Error::analyzer(forms::TOOL, e))
    }
}

/// Close a page; a failed close is logged, never raised
async fn release(page: &dyn PageHandle) {
    if let Err(e) = page.close().await {
        tracing::warn!(url = page.url(), "Failed to close page: {}", e);
    } else {
        tracing::debug!(url = page.url(), "Page closed");
    }
}
