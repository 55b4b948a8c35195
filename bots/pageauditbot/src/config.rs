// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration management for pageauditbot

use serde::Deserialize;
use std::path::Path;

use crate::error::Result;
use crate::model::{AuditMode, BrowserTarget, WcagLevel};
use crate::severity::Severity;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Which browser targets may be used
    #[serde(default)]
    pub browsers: BrowsersConfig,

    /// Page loading
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Defaults for audit requests
    #[serde(default)]
    pub audit: AuditConfig,

    /// In-memory audit and score stores
    #[serde(default)]
    pub store: StoreConfig,

    /// Keyboard flow simulation
    #[serde(default)]
    pub keyboard: KeyboardConfig,

    /// Sector-specific heuristics
    #[serde(default)]
    pub domain: DomainConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowsersConfig {
    #[serde(default)]
    pub chromium: BrowserConfig,

    #[serde(default)]
    pub firefox: BrowserConfig,

    #[serde(default)]
    pub webkit: BrowserConfig,

    /// Target used when a request does not name one
    #[serde(default = "default_browser")]
    pub default: BrowserTarget,
}

impl Default for BrowsersConfig {
    fn default() -> Self {
        Self {
            chromium: BrowserConfig::default(),
            firefox: BrowserConfig::default(),
            webkit: BrowserConfig::default(),
            default: default_browser(),
        }
    }
}

impl BrowsersConfig {
    pub fn is_enabled(&self, target: BrowserTarget) -> bool {
        match target {
            BrowserTarget::Chromium => self.chromium.enabled,
            BrowserTarget::Firefox => self.firefox.enabled,
            BrowserTarget::Webkit => self.webkit.enabled,
        }
    }

    /// Enabled targets in comparison order
    pub fn enabled_targets(&self) -> Vec<BrowserTarget> {
        BrowserTarget::ALL
            .into_iter()
            .filter(|t| self.is_enabled(*t))
            .collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_browser() -> BrowserTarget {
    BrowserTarget::Chromium
}

#[derive(Debug, Deserialize, Clone)]
pub struct NavigationConfig {
    /// Page load timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("pageauditbot/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    #[serde(default = "default_mode")]
    pub default_mode: AuditMode,

    #[serde(default = "default_wcag_level")]
    pub default_wcag_level: WcagLevel,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            default_wcag_level: default_wcag_level(),
        }
    }
}

fn default_mode() -> AuditMode {
    AuditMode::Full
}

fn default_wcag_level() -> WcagLevel {
    WcagLevel::AA
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Completed audits kept before the oldest is evicted
    #[serde(default = "default_capacity")]
    pub max_audits: usize,

    /// Score records kept before the oldest is evicted
    #[serde(default = "default_capacity")]
    pub max_scores: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_audits: default_capacity(),
            max_scores: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeyboardConfig {
    /// Upper bound on simulated forward-tab steps
    #[serde(default = "default_max_tab_steps")]
    pub max_tab_steps: usize,

    /// Focusable elements sampled for a visible focus indicator
    #[serde(default = "default_focus_sample")]
    pub focus_sample: usize,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            max_tab_steps: default_max_tab_steps(),
            focus_sample: default_focus_sample(),
        }
    }
}

fn default_max_tab_steps() -> usize {
    50
}

fn default_focus_sample() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct DomainConfig {
    /// Severity of an emergency control rendered below 16px
    #[serde(default = "default_too_small_severity")]
    pub emergency_too_small_severity: Severity,

    /// Class fragment that marks domain-branded elements
    #[serde(default = "default_brand_marker")]
    pub brand_class_marker: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            emergency_too_small_severity: default_too_small_severity(),
            brand_class_marker: default_brand_marker(),
        }
    }
}

fn default_too_small_severity() -> Severity {
    Severity::Critical
}

fn default_brand_marker() -> String {
    "nhs".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::warn!("Config file {} not found, using defaults and environment", path.display());
        }

        let builder = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("PAGEAUDITBOT")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let parsed: Config = config.try_deserialize()?;

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.navigation.timeout_secs, 30);
        assert_eq!(config.audit.default_mode, AuditMode::Full);
        assert_eq!(config.audit.default_wcag_level, WcagLevel::AA);
        assert_eq!(config.keyboard.max_tab_steps, 50);
        assert_eq!(config.keyboard.focus_sample, 10);
        assert_eq!(config.domain.emergency_too_small_severity, Severity::Critical);
        assert_eq!(config.browsers.enabled_targets(), BrowserTarget::ALL.to_vec());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/pageauditbot.toml").expect("defaults");
        assert_eq!(config.store.max_audits, 500);
    }

    #[test]
    fn test_env_overrides_apply_without_file() {
        std::env::set_var("PAGEAUDITBOT__KEYBOARD__MAX_TAB_STEPS", "12");
        let loaded = Config::load("/nonexistent/pageauditbot-env.toml");
        std::env::remove_var("PAGEAUDITBOT__KEYBOARD__MAX_TAB_STEPS");

        let config = loaded.expect("env-only config");
        assert_eq!(config.keyboard.max_tab_steps, 12);
        assert_eq!(config.navigation.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pageauditbot.toml");
        std::fs::write(
            &path,
            "[browsers.firefox]\nenabled = false\n\n[navigation]\ntimeout_secs = 5\n\n[audit]\ndefault_mode = \"summary\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).expect("config should parse");
        assert!(!config.browsers.is_enabled(BrowserTarget::Firefox));
        assert_eq!(
            config.browsers.enabled_targets(),
            vec![BrowserTarget::Chromium, BrowserTarget::Webkit]
        );
        assert_eq!(config.navigation.timeout_secs, 5);
        assert_eq!(config.audit.default_mode, AuditMode::Summary);
    }
}
