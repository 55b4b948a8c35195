// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit stages.
//!
//! Each first-party analyzer focuses on one WCAG concern and works only
//! through the [`PageHandle`]. Generic rule engines join the same pipeline
//! through [`DetectorStage`], which normalizes their severities on the way in.

pub mod aria;
pub mod contrast;
pub mod domain;
pub mod forms;
pub mod keyboard;
pub mod readability;

pub use aria::AriaValidator;
pub use contrast::ContrastAnalyzer;
pub use domain::DomainComplianceAnalyzer;
pub use forms::FormAuditor;
pub use keyboard::KeyboardFlowAnalyzer;
pub use readability::ReadabilityAnalyzer;

use async_trait::async_trait;

use crate::detectors::{normalize, RuleEngine};
use crate::error::Result;
use crate::model::{Issue, WcagLevel};
use crate::page::PageHandle;

/// Per-run inputs shared by every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditContext {
    pub wcag_level: WcagLevel,
}

impl AuditContext {
    pub fn new(wcag_level: WcagLevel) -> Self {
        Self { wcag_level }
    }
}

/// Trait implemented by every audit stage
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Tool name recorded in `toolsRun` and on every issue
    fn name(&self) -> &str;

    /// Run against one loaded page
    async fn analyze(&self, page: &dyn PageHandle, ctx: &AuditContext) -> Result<Vec<Issue>>;
}

/// Adapts a generic [`RuleEngine`] into a pipeline stage
pub struct DetectorStage {
    engine: Box<dyn RuleEngine>,
}

impl DetectorStage {
    pub fn new(engine: impl RuleEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }
}

#[async_trait]
impl Analyzer for DetectorStage {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn analyze(&self, page: &dyn PageHandle, ctx: &AuditContext) -> Result<Vec<Issue>> {
        let violations = self.engine.run(page, ctx.wcag_level).await?;
        tracing::debug!(tool = self.engine.name(), violations = violations.len(), "Detector finished");
        Ok(normalize(self.engine.name(), self.engine.scale(), violations))
    }
}
