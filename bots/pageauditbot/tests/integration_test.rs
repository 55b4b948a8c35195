// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for pageauditbot

use async_trait::async_trait;
use pageauditbot::config::Config;
use pageauditbot::error::{Error, Result};
use pageauditbot::model::{AuditMode, BrowserTarget, WcagLevel};
use pageauditbot::page::{Automation, Key, Navigation, PageHandle, Probe, StaticAutomation};
use pageauditbot::report::{generate_report, OutputFormat};
use pageauditbot::scoring::{Rating, ScoringEngine};
use pageauditbot::severity::Severity;
use pageauditbot::AuditEngine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn static_engine(config: Config) -> AuditEngine {
    let automation = StaticAutomation::new(&config).expect("page loader");
    AuditEngine::new(Arc::new(automation), config)
}

#[tokio::test]
async fn test_missing_skip_link_on_long_navigation() {
    let engine = static_engine(Config::default());
    let report = engine
        .test_keyboard(&fixture("nav_without_skip_link.html"), BrowserTarget::Chromium, None)
        .await
        .expect("keyboard check should succeed");

    assert_eq!(report.summary.total_focusable, 25);
    assert_eq!(report.issues.len(), 1, "{:?}", report.issues);
    assert_eq!(report.issues[0].kind, "missing-skip-link");
    assert_eq!(report.issues[0].severity(), Severity::Moderate);
}

#[tokio::test]
async fn test_skip_link_satisfies_keyboard_check() {
    let engine = static_engine(Config::default());
    let report = engine
        .test_keyboard(&fixture("nav_with_skip_link.html"), BrowserTarget::Chromium, None)
        .await
        .expect("keyboard check should succeed");

    assert_eq!(report.summary.total_focusable, 25);
    assert!(report.summary.has_skip_link);
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert_eq!(report.summary.tabs_tested, 25);
}

#[tokio::test]
async fn test_full_audit_of_fixture() {
    let engine = static_engine(Config::default());
    let request = engine
        .request(&fixture("care_home.html"))
        .mode(AuditMode::Full)
        .wcag_level(WcagLevel::AA);
    let audit = engine.run_audit(request).await.expect("audit should run");

    assert_eq!(
        audit.tools_run,
        vec![
            "markup-rules",
            "structure-rules",
            "contrast-checker",
            "keyboard-tester",
            "cognitive-checker",
            "care-sector-checker"
        ]
    );
    assert!(audit.failures.is_empty(), "{:?}", audit.failures);
    assert!(audit.issues.iter().any(|i| i.kind == "image-alt"));
    assert!(audit
        .issues
        .iter()
        .any(|i| i.kind == "insufficient-contrast" && i.tool == "contrast-checker"));

    let summary = audit.summary();
    assert_eq!(summary.total, summary.critical + summary.serious + summary.moderate + summary.minor);
    for severity in Severity::ALL {
        assert_eq!(summary.count(severity), audit.issues.bucket(severity).count());
    }

    let stored = engine.get_audit(&audit.id).await.expect("audit is stored");
    assert_eq!(stored.id, audit.id);

    let score = engine.score(&audit.id).await.expect("audit can be scored");
    assert_eq!(*score, ScoringEngine::calculate(&audit));

    let json = generate_report(&audit, &score, OutputFormat::Json);
    let parsed: Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(parsed["audit"]["summary"]["total"], summary.total);
    assert_eq!(parsed["score"]["score"], score.score);
}

#[tokio::test]
async fn test_page_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.html");
    std::fs::write(
        &path,
        r#"<!DOCTYPE html><html lang="en"><head><title>Plain</title></head>
           <body><main><h1>Hello</h1><p>Welcome.</p></main></body></html>"#,
    )
    .unwrap();

    let engine = static_engine(Config::default());
    let url = format!("file://{}", path.display());
    let audit = engine
        .run_audit(engine.request(&url).mode(AuditMode::Summary))
        .await
        .unwrap();
    assert!(audit.issues.is_empty(), "{:?}", audit.issues);

    let score = engine.score(&audit.id).await.unwrap();
    assert_eq!(score.score, 100);
    assert_eq!(score.rating, Rating::Outstanding);
}

#[tokio::test]
async fn test_compare_skips_disabled_browser() {
    let mut config = Config::default();
    config.browsers.webkit.enabled = false;
    let engine = static_engine(config);

    let outcomes = engine
        .compare_browsers(&fixture("care_home.html"), WcagLevel::AA)
        .await;
    assert_eq!(
        outcomes.keys().copied().collect::<Vec<_>>(),
        vec![BrowserTarget::Chromium, BrowserTarget::Firefox]
    );
    for outcome in outcomes.values() {
        let record = outcome.record().expect("both targets complete");
        assert_eq!(record.mode, AuditMode::Summary);
        assert_eq!(record.tools_run, vec!["markup-rules"]);
    }

    let direct = engine
        .run_audit(engine.request(&fixture("care_home.html")).browser(BrowserTarget::Webkit))
        .await;
    assert!(matches!(direct, Err(Error::BrowserDisabled(BrowserTarget::Webkit))));
}

/// Page that answers only the serialized document and counts closes
struct DocumentOnlyPage {
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for DocumentOnlyPage {
    fn url(&self) -> &str {
        "https://flaky.test/"
    }

    async fn evaluate(&self, probe: &Probe, _args: Value) -> Result<Value> {
        match probe.name {
            "document-html" => Ok(json!("<html><head><title>Flaky</title></head><body><img src=x></body></html>")),
            other => Err(Error::Script {
                probe: other.to_string(),
                message: "execution context was destroyed".to_string(),
            }),
        }
    }

    async fn press_key(&self, _key: Key) -> Result<()> {
        Err(Error::Script {
            probe: "keyboard".to_string(),
            message: "execution context was destroyed".to_string(),
        })
    }

    async fn focus(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FlakyAutomation {
    load: bool,
    navigations: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl FlakyAutomation {
    fn new(load: bool) -> Arc<Self> {
        Arc::new(Self {
            load,
            navigations: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Automation for FlakyAutomation {
    fn enabled_targets(&self) -> Vec<BrowserTarget> {
        BrowserTarget::ALL.to_vec()
    }

    async fn navigate(&self, _url: &str, _target: BrowserTarget) -> Result<Navigation> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        let page = Box::new(DocumentOnlyPage {
            closes: Arc::clone(&self.closes),
        });
        if self.load {
            Ok(Navigation::Loaded(page))
        } else {
            Ok(Navigation::Failed {
                page: Some(page),
                error: "Timeout 30000ms exceeded".to_string(),
            })
        }
    }
}

#[tokio::test]
async fn test_navigation_failure_is_fatal_for_the_run() {
    let automation = FlakyAutomation::new(false);
    let engine = AuditEngine::new(automation.clone(), Config::default());

    let result = engine.run_audit(engine.request("https://flaky.test/")).await;
    match result {
        Err(Error::Navigation(message)) => assert!(message.contains("Timeout")),
        other => panic!("expected a navigation error, got {:?}", other.map(|r| r.id)),
    }
    assert_eq!(automation.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_analyzers_do_not_abort_the_audit() {
    let automation = FlakyAutomation::new(true);
    let engine = AuditEngine::new(automation.clone(), Config::default());

    let audit = engine
        .run_audit(engine.request("https://flaky.test/").mode(AuditMode::Full))
        .await
        .expect("partial results are still a completed audit");

    assert_eq!(audit.tools_run.len(), 6);
    assert!(audit.failures.iter().any(|f| f.tool == "contrast-checker"));
    assert!(audit.failures.iter().any(|f| f.tool == "cognitive-checker"));
    assert!(audit.issues.iter().any(|i| i.kind == "image-alt"));
    assert!(audit.issues.iter().all(|i| i.tool != "contrast-checker"));
    assert_eq!(automation.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(automation.closes.load(Ordering::SeqCst), 1);
}
