// SPDX-License-Identifier: PMPL-1.0-or-later
//! Pageauditbot - rendered-page accessibility audits with composite scoring
//!
//! Part of the gitbot-fleet ecosystem. Pageauditbot loads a page through an
//! automation collaborator, runs generic rule detectors and first-party WCAG
//! analyzers against it, folds every finding into one four-tier severity
//! model and derives a 0-100 score with UK legal-compliance flags.
//!
//! ## Pipeline
//!
//! - **markup-rules**: fast generic detector, always runs
//! - **structure-rules**: second generic detector (full mode)
//! - **Contrast** (1.4.3/1.4.6): text contrast ratios with suggested fixes
//! - **Keyboard** (2.1.2/2.4.1/2.4.3/2.4.7): traps, skip links, focus indicators
//! - **Readability** (3.1.5/2.2.1): Flesch reading ease, jargon, time limits
//! - **Care sector**: emergency controls, elderly-friendly text, health info
//!
//! ARIA names/roles and form labelling are available as standalone checks.

pub mod analyzers;
pub mod color;
pub mod config;
pub mod detectors;
pub mod dom;
pub mod engine;
pub mod error;
pub mod model;
pub mod page;
pub mod report;
pub mod scoring;
pub mod severity;
pub mod store;
pub mod tools;

pub use config::Config;
pub use engine::{AuditEngine, AuditRequest, BrowserOutcome};
pub use error::{Error, Result};
