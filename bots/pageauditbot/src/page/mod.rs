// SPDX-License-Identifier: PMPL-1.0-or-later
//! Page automation collaborator.
//!
//! The audit core never drives a browser itself. It talks to an
//! [`Automation`] that navigates to a URL and hands back a [`PageHandle`];
//! analyzers then query the rendered DOM through named [`Probe`]s and
//! simulate keyboard input.
//!
//! [`StaticAutomation`] is the in-crate implementation: it loads markup over
//! HTTP or from disk and answers every probe by analysing the markup.

pub mod probes;
mod static_page;
mod style;

pub use static_page::{StaticAutomation, StaticPage};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::BrowserTarget;

/// A named DOM query.
///
/// `script` is the JavaScript a live browser driver evaluates (the function
/// receives the probe arguments as its single parameter). `name` identifies
/// the query for implementations that answer natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub name: &'static str,
    pub script: &'static str,
}

/// Keys the analyzers can simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    ShiftTab,
    Enter,
    Escape,
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Tab => write!(f, "Tab"),
            Key::ShiftTab => write!(f, "Shift+Tab"),
            Key::Enter => write!(f, "Enter"),
            Key::Escape => write!(f, "Escape"),
        }
    }
}

/// A loaded page. Every call is a suspension point.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// URL the page was loaded from
    fn url(&self) -> &str;

    /// Run a probe against the DOM and return its serializable result
    async fn evaluate(&self, probe: &Probe, args: Value) -> Result<Value>;

    /// Simulate one key press
    async fn press_key(&self, key: Key) -> Result<()>;

    /// Move focus to the first element matching `selector`
    async fn focus(&self, selector: &str) -> Result<()>;

    /// Release the page
    async fn close(&self) -> Result<()>;
}

/// Evaluate a probe and decode its result into `T`
pub async fn evaluate_as<T: DeserializeOwned>(
    page: &dyn PageHandle,
    probe: &Probe,
    args: Value,
) -> Result<T> {
    let value = page.evaluate(probe, args).await?;
    serde_json::from_value(value).map_err(|e| Error::Script {
        probe: probe.name.to_string(),
        message: format!("unexpected result shape: {}", e),
    })
}

/// Outcome of a navigation attempt
pub enum Navigation {
    Loaded(Box<dyn PageHandle>),
    /// The page may still need closing even though it never loaded
    Failed {
        page: Option<Box<dyn PageHandle>>,
        error: String,
    },
}

impl std::fmt::Debug for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Navigation::Loaded(page) => f.debug_tuple("Loaded").field(&page.url()).finish(),
            Navigation::Failed { error, .. } => {
                f.debug_struct("Failed").field("error", error).finish()
            }
        }
    }
}

/// Browser automation collaborator
#[async_trait]
pub trait Automation: Send + Sync {
    /// Targets this automation may be asked to use
    fn enabled_targets(&self) -> Vec<BrowserTarget>;

    /// Load `url` in `target`. Errors are reserved for targets that cannot
    /// be used at all; a page that fails to load is a [`Navigation::Failed`].
    async fn navigate(&self, url: &str, target: BrowserTarget) -> Result<Navigation>;
}
