//! Page driver seam
//!
//! The pagination controller and the enrichment scheduler only talk to pages
//! through [`PageDriver`]. A browser-automation backend and the bundled
//! HTTP driver both plug in here, as do the scripted fakes used in tests.

use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// A matched element, detached from the live document
///
/// `selector` and `index` identify the node again when the driver needs to
/// act on it (click, scroll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub visible: bool,
}

impl ElementHandle {
    /// Returns an attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Options for [`PageDriver::click`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Skip actionability checks (visibility, overlap)
    pub force: bool,
}

/// Scripted interactions a driver can perform on the current page
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    /// Scroll the `index`-th match of `selector` into view
    ScrollIntoView { selector: String, index: usize },

    /// Move the virtual pointer just inside the element's box
    PointerNear { selector: String, index: usize },

    /// Press a key on the focused document
    PressKey(String),

    /// POST `form` to `endpoint` as a background request and append the
    /// returned markup to the element matched by `container`
    AppendFragment {
        endpoint: String,
        form: Vec<(String, String)>,
        container: String,
    },
}

/// Minimal browser-like page primitive
///
/// One driver owns one isolated browsing context. It is never shared between
/// concurrent tasks.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url`, returning the serialized document
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<String>;

    /// All elements matching a CSS selector, in document order
    async fn query_selector_all(&self, selector: &str) -> DriverResult<Vec<ElementHandle>>;

    /// Clicks an element previously returned by `query_selector_all`
    async fn click(&mut self, target: &ElementHandle, options: ClickOptions) -> DriverResult<()>;

    /// Runs a scripted interaction on the current page
    async fn evaluate(&mut self, command: &DriverCommand) -> DriverResult<serde_json::Value>;

    /// Current serialized document
    async fn content(&self) -> DriverResult<String>;

    /// URL of the current page, if one is loaded
    fn current_url(&self) -> Option<String>;

    /// Releases the browsing context
    async fn close(&mut self) -> DriverResult<()>;

    /// Waits until `selector` matches at least one element
    ///
    /// Returns `Ok(false)` when the timeout elapses first.
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
        interval: Duration,
    ) -> DriverResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.query_selector_all(selector).await?.is_empty() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Opens isolated page drivers
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> DriverResult<Box<dyn PageDriver>>;
}

/// Parses a CSS selector, mapping failures to a driver error
pub(crate) fn parse_selector(selector: &str) -> DriverResult<scraper::Selector> {
    scraper::Selector::parse(selector)
        .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))
}
