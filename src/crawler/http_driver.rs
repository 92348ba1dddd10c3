//! HTTP-backed page driver
//!
//! This driver handles static markup only:
//! - Navigation is a plain GET with a per-request timeout
//! - Element queries, visibility and content come from the held document
//! - Clicks are unsupported, so pagination falls through to the
//!   background-request path
//! - `AppendFragment` performs the background POST itself and splices the
//!   returned markup into the listing container

use crate::config::CrawlerConfig;
use crate::crawler::driver::{
    parse_selector, ClickOptions, DriverCommand, DriverFactory, ElementHandle, PageDriver,
};
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Fragments this short are treated as "nothing loaded"
const MIN_FRAGMENT_LEN: usize = 50;

/// Builds an HTTP client with the configured user agent and proxy
///
/// # Example
///
/// ```no_run
/// use hashtag_harvester::config::CrawlerConfig;
/// use hashtag_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Page driver over a shared HTTP connection pool
///
/// Each instance keeps its own document and URL, so instances are isolated
/// even though they share the underlying client.
#[derive(Debug)]
pub struct HttpPageDriver {
    client: Client,
    current_url: Option<Url>,
    document: Option<String>,
}

impl HttpPageDriver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            current_url: None,
            document: None,
        }
    }

    fn document(&self) -> DriverResult<&str> {
        self.document.as_deref().ok_or(DriverError::NoPage)
    }

    fn element_exists(&self, selector: &str, index: usize) -> DriverResult<bool> {
        Ok(select_handles(self.document()?, selector)?.len() > index)
    }

    async fn append_fragment(
        &mut self,
        endpoint: &str,
        form: &[(String, String)],
        container: &str,
    ) -> DriverResult<serde_json::Value> {
        let base = self.current_url.clone().ok_or(DriverError::NoPage)?;
        let target = base
            .join(endpoint)
            .map_err(|e| DriverError::Command(format!("bad endpoint {}: {}", endpoint, e)))?;

        let response = self
            .client
            .post(target.clone())
            .header("X-Requested-With", "XMLHttpRequest")
            .header(reqwest::header::REFERER, base.as_str())
            .form(form)
            .send()
            .await
            .map_err(|e| DriverError::Command(format!("POST {} failed: {}", target, e)))?;

        let status = response.status();
        let fragment = response
            .text()
            .await
            .map_err(|e| DriverError::Command(format!("reading {} failed: {}", target, e)))?;

        if !status.is_success() || fragment.trim().len() <= MIN_FRAGMENT_LEN {
            tracing::debug!(
                "Background request to {} returned {} with {} bytes",
                target,
                status,
                fragment.len()
            );
            return Ok(json!({ "appended": false, "length": fragment.len() }));
        }

        let spliced = splice_fragment(self.document()?, container, &fragment)?;
        self.document = Some(spliced);

        Ok(json!({ "appended": true, "length": fragment.len() }))
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        self.current_url = Some(final_url);
        self.document = Some(body.clone());
        Ok(body)
    }

    async fn query_selector_all(&self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        select_handles(self.document()?, selector)
    }

    async fn click(&mut self, target: &ElementHandle, _options: ClickOptions) -> DriverResult<()> {
        Err(DriverError::Unsupported(format!(
            "click on '{}' needs a scripting engine",
            target.selector
        )))
    }

    async fn evaluate(&mut self, command: &DriverCommand) -> DriverResult<serde_json::Value> {
        match command {
            DriverCommand::ScrollIntoView { selector, index }
            | DriverCommand::PointerNear { selector, index } => {
                Ok(json!(self.element_exists(selector, *index)?))
            }
            DriverCommand::PressKey(_) => Ok(json!(self.document.is_some())),
            DriverCommand::AppendFragment {
                endpoint,
                form,
                container,
            } => self.append_fragment(endpoint, form, container).await,
        }
    }

    async fn content(&self) -> DriverResult<String> {
        self.document().map(str::to_string)
    }

    fn current_url(&self) -> Option<String> {
        self.current_url.as_ref().map(Url::to_string)
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.document = None;
        self.current_url = None;
        Ok(())
    }
}

/// Opens [`HttpPageDriver`]s sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpDriverFactory {
    client: Client,
}

impl HttpDriverFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DriverFactory for HttpDriverFactory {
    async fn open(&self) -> DriverResult<Box<dyn PageDriver>> {
        Ok(Box::new(HttpPageDriver::new(self.client.clone())))
    }
}

fn classify_error(url: &str, timeout: Duration, error: reqwest::Error) -> DriverError {
    if error.is_timeout() {
        DriverError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        DriverError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Collects detached handles for every match of `selector`
pub(crate) fn select_handles(document: &str, selector: &str) -> DriverResult<Vec<ElementHandle>> {
    let parsed = parse_selector(selector)?;
    let html = Html::parse_document(document);

    let handles = html
        .select(&parsed)
        .enumerate()
        .map(|(index, element)| ElementHandle {
            selector: selector.to_string(),
            index,
            tag: element.value().name().to_string(),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: element.text().collect::<String>().trim().to_string(),
            visible: is_visible(element),
        })
        .collect();

    Ok(handles)
}

/// An element is hidden if it or any ancestor is hidden via attribute or inline style
fn is_visible(element: ElementRef<'_>) -> bool {
    let hidden = |el: ElementRef<'_>| {
        if el.value().attr("hidden").is_some() {
            return true;
        }
        el.value()
            .attr("style")
            .map(|style| {
                let style: String = style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase();
                style.contains("display:none") || style.contains("visibility:hidden")
            })
            .unwrap_or(false)
    };

    if hidden(element) {
        return false;
    }

    !element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(hidden)
}

/// Inserts `fragment` as the last children of the first `container` match
///
/// Returns the re-serialized document.
pub(crate) fn splice_fragment(
    document: &str,
    container: &str,
    fragment: &str,
) -> DriverResult<String> {
    let selector = parse_selector(container)?;
    let html = Html::parse_document(document);
    let serialized = html.root_element().html();

    let target = html
        .select(&selector)
        .next()
        .ok_or_else(|| DriverError::ElementMissing(container.to_string()))?;

    let outer = target.html();
    let closing = format!("</{}>", target.value().name());
    let start = serialized
        .find(&outer)
        .ok_or_else(|| DriverError::ElementMissing(container.to_string()))?;
    let insert_at = start + outer.len() - closing.len();

    let mut spliced = String::with_capacity(serialized.len() + fragment.len());
    spliced.push_str(&serialized[..insert_at]);
    spliced.push_str(fragment);
    spliced.push_str(&serialized[insert_at..]);
    Ok(spliced)
}
