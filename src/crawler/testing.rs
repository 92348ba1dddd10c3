//! Scripted in-memory drivers for exercising the crawl state machines

use crate::crawler::driver::{ClickOptions, DriverCommand, DriverFactory, ElementHandle, PageDriver};
use crate::crawler::http_driver::{select_handles, splice_fragment};
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A driver whose page evolves according to a script
///
/// - Each successful click replaces the document with the next queued page
/// - Each `AppendFragment` consumes the next queued fragment
/// - The first `n` navigations can be made to fail
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    document: String,
    url: Option<String>,
    click_pages: VecDeque<String>,
    fragments: VecDeque<String>,
    failing_navigations: usize,
    fail_clicks: bool,
    clicks: Vec<ElementHandle>,
    commands: Vec<DriverCommand>,
    navigations: usize,
    closed: bool,
}

impl ScriptedDriver {
    pub fn new(html: &str) -> Self {
        Self {
            document: html.to_string(),
            ..Default::default()
        }
    }

    /// Page shown after the next successful click
    pub fn on_click(mut self, html: &str) -> Self {
        self.click_pages.push_back(html.to_string());
        self
    }

    /// Markup returned by the next background request
    pub fn on_append(mut self, fragment: &str) -> Self {
        self.fragments.push_back(fragment.to_string());
        self
    }

    pub fn failing_navigations(mut self, count: usize) -> Self {
        self.failing_navigations = count;
        self
    }

    pub fn fail_clicks(&mut self) {
        self.fail_clicks = true;
    }

    pub fn clicks(&self) -> &[ElementHandle] {
        &self.clicks
    }

    pub fn commands(&self) -> &[DriverCommand] {
        &self.commands
    }

    pub fn navigations(&self) -> usize {
        self.navigations
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<String> {
        self.navigations += 1;
        if self.failing_navigations > 0 {
            self.failing_navigations -= 1;
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        self.url = Some(url.to_string());
        Ok(self.document.clone())
    }

    async fn query_selector_all(&self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        select_handles(&self.document, selector)
    }

    async fn click(&mut self, target: &ElementHandle, _options: ClickOptions) -> DriverResult<()> {
        if self.fail_clicks {
            return Err(DriverError::Command("scripted click failure".to_string()));
        }
        self.clicks.push(target.clone());
        if let Some(next) = self.click_pages.pop_front() {
            self.document = next;
        }
        Ok(())
    }

    async fn evaluate(&mut self, command: &DriverCommand) -> DriverResult<serde_json::Value> {
        self.commands.push(command.clone());
        match command {
            DriverCommand::AppendFragment { container, .. } => {
                let Some(fragment) = self.fragments.pop_front() else {
                    return Ok(json!({ "appended": false, "length": 0 }));
                };
                if fragment.len() <= 50 {
                    return Ok(json!({ "appended": false, "length": fragment.len() }));
                }
                self.document = splice_fragment(&self.document, container, &fragment)?;
                Ok(json!({ "appended": true, "length": fragment.len() }))
            }
            _ => Ok(json!(true)),
        }
    }

    async fn content(&self) -> DriverResult<String> {
        Ok(self.document.clone())
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// How a detail page should behave when fetched
#[derive(Debug, Clone)]
pub enum DetailPage {
    Html(String),
    Fail,
    Panic,
}

/// Counters shared between a factory and the drivers it opened
#[derive(Debug, Default)]
pub struct FactoryStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub dropped: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

/// Opens drivers that serve canned detail pages by URL
#[derive(Debug, Clone, Default)]
pub struct DetailFactory {
    pages: Arc<Mutex<HashMap<String, DetailPage>>>,
    delay: Duration,
    pub stats: Arc<FactoryStats>,
}

impl DetailFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page(self, url: &str, page: DetailPage) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), page);
        }
        self
    }
}

#[async_trait]
impl DriverFactory for DetailFactory {
    async fn open(&self) -> DriverResult<Box<dyn PageDriver>> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DetailDriver {
            pages: Arc::clone(&self.pages),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
            document: None,
            url: None,
        }))
    }
}

struct DetailDriver {
    pages: Arc<Mutex<HashMap<String, DetailPage>>>,
    delay: Duration,
    stats: Arc<FactoryStats>,
    document: Option<String>,
    url: Option<String>,
}

impl Drop for DetailDriver {
    fn drop(&mut self) {
        self.stats.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageDriver for DetailDriver {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<String> {
        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        let page = self
            .pages
            .lock()
            .ok()
            .and_then(|pages| pages.get(url).cloned());

        match page {
            Some(DetailPage::Html(html)) => {
                self.url = Some(url.to_string());
                self.document = Some(html.clone());
                Ok(html)
            }
            Some(DetailPage::Panic) => panic!("scripted panic for {}", url),
            Some(DetailPage::Fail) | None => Err(DriverError::Status {
                url: url.to_string(),
                status: 500,
            }),
        }
    }

    async fn query_selector_all(&self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        select_handles(self.document.as_deref().ok_or(DriverError::NoPage)?, selector)
    }

    async fn click(&mut self, _target: &ElementHandle, _options: ClickOptions) -> DriverResult<()> {
        Err(DriverError::Unsupported("click".to_string()))
    }

    async fn evaluate(&mut self, _command: &DriverCommand) -> DriverResult<serde_json::Value> {
        Ok(json!(true))
    }

    async fn content(&self) -> DriverResult<String> {
        self.document.clone().ok_or(DriverError::NoPage)
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one scripted listing driver, then detail drivers
pub struct SessionFactory {
    listing: Mutex<Option<ScriptedDriver>>,
    pub details: DetailFactory,
}

impl SessionFactory {
    pub fn new(listing: ScriptedDriver, details: DetailFactory) -> Self {
        Self {
            listing: Mutex::new(Some(listing)),
            details,
        }
    }
}

#[async_trait]
impl DriverFactory for SessionFactory {
    async fn open(&self) -> DriverResult<Box<dyn PageDriver>> {
        let listing = self.listing.lock().ok().and_then(|mut slot| slot.take());
        match listing {
            Some(driver) => Ok(Box::new(driver)),
            None => self.details.open().await,
        }
    }
}
