//! Headless Chrome backend over the DevTools protocol.
//!
//! Every session is its own Chrome process with a throwaway profile
//! directory. Element queries run as page scripts that return plain JSON
//! snapshots, so nothing holds a live DOM handle across an await.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use shelfwatch_core::ExtractionConfig;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{BrowserDriver, BrowserSession};
use crate::error::{PageError, ScraperError};
use crate::page::{ElementSnapshot, PageQuery, CONTAINER_SELECTOR};

const SNAPSHOT_FN: &str = r"
const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
const snap = (el) => {
  const attrs = {};
  for (const a of el.attributes) attrs[a.name.toLowerCase()] = a.value;
  if (el.checked) attrs.checked = 'checked';
  if (el.disabled) attrs.disabled = 'disabled';
  const r = el.getBoundingClientRect();
  const img = el.tagName === 'IMG';
  return {
    tag: el.tagName.toLowerCase(),
    text: clean(el.innerText || el.textContent),
    attrs,
    width: r.width || (img ? el.naturalWidth : 0) || 0,
    height: r.height || (img ? el.naturalHeight : 0) || 0,
    current_src: img && el.currentSrc ? el.currentSrc : null,
    parent_text: el.parentElement ? clean(el.parentElement.innerText) : null,
  };
};
const fail = (e) => ({ invalid_selector: String((e && e.message) || e) });
";

const SELECT_JS: &str = r"(() => {
__SNAPSHOT__
  let nodes;
  try { nodes = document.querySelectorAll(__SELECTOR__); } catch (e) { return fail(e); }
  return { elements: Array.from(nodes, snap) };
})()";

const SELECT_IN_CONTAINER_JS: &str = r"(() => {
__SNAPSHOT__
  const label = __LABEL__.toLowerCase();
  let best = null;
  let bestLen = Infinity;
  try {
    for (const c of document.querySelectorAll(__CONTAINERS__)) {
      const text = clean(c.innerText);
      if (!text.toLowerCase().includes(label) || !c.querySelector(__ITEMS__)) continue;
      if (text.length < bestLen) { best = c; bestLen = text.length; }
    }
  } catch (e) { return fail(e); }
  return { elements: best ? Array.from(best.querySelectorAll(__ITEMS__), snap) : [] };
})()";

const NAV_STATUS_JS: &str = r"(() => {
  const nav = performance.getEntriesByType('navigation')[0];
  return nav && nav.responseStatus ? nav.responseStatus : null;
})()";

const CONSENT_JS: &str = r"(() => {
  const direct = document.querySelector('#onetrust-accept-btn-handler, #accept-recommended-btn-handler');
  if (direct) { direct.click(); return true; }
  const wanted = /^(accept all|accept all cookies|accept cookies|accept|agree|i agree|allow all|allow all cookies)$/i;
  for (const el of document.querySelectorAll('button, [role=button], a')) {
    const text = (el.innerText || '').replace(/\s+/g, ' ').trim();
    if (wanted.test(text)) { el.click(); return true; }
  }
  return false;
})()";

#[derive(Debug, Deserialize)]
struct QueryReply {
    #[serde(default)]
    elements: Vec<ElementSnapshot>,
    #[serde(default)]
    invalid_selector: Option<String>,
}

pub struct ChromeDriver {
    headless: bool,
    chrome_path: Option<String>,
    user_agent: String,
}

impl ChromeDriver {
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let profile_dir = std::env::temp_dir().join(format!("shelfwatch-{}", Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled");
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScraperError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Browser(format!("launch failed: {e}")))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "devtools handler stopped");
                    break;
                }
            }
        });

        let mut session = ChromeSession {
            browser: Some(browser),
            handler: Some(handler),
            page: None,
            profile_dir,
        };

        match session.open_page(&self.user_agent).await {
            Ok(()) => Ok(Box::new(session)),
            Err(err) => {
                if let Err(close_err) = session.close().await {
                    tracing::warn!(error = %close_err, "failed to tear down half-started browser");
                }
                Err(err)
            }
        }
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<ChromePage>,
    profile_dir: PathBuf,
}

impl ChromeSession {
    async fn open_page(&mut self, user_agent: &str) -> Result<(), ScraperError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("session already closed".to_string()))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::Browser(format!("new page: {e}")))?;
        page.set_user_agent(user_agent_override(user_agent))
            .await
            .map_err(|e| ScraperError::Browser(format!("set user agent: {e}")))?;
        self.page = Some(ChromePage { page });
        Ok(())
    }

    fn tab(&self) -> Result<&ChromePage, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<Option<u16>, ScraperError> {
        let tab = self.tab()?;
        tab.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        let status = match tab.page.evaluate(NAV_STATUS_JS).await {
            Ok(result) => result.into_value::<Option<u16>>().ok().flatten(),
            Err(err) => {
                tracing::debug!(url, error = %err, "navigation status unavailable");
                None
            }
        };
        Ok(status)
    }

    async fn dismiss_consent(&self) -> Result<bool, ScraperError> {
        let result = self
            .tab()?
            .page
            .evaluate(CONSENT_JS)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        let dismissed = result.into_value::<bool>().map_err(PageError::from)?;
        Ok(dismissed)
    }

    fn page(&self) -> &dyn PageQuery {
        if let Some(tab) = &self.page {
            return tab;
        }
        &CLOSED_PAGE
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::Browser(format!("close: {e}")));
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "browser process did not exit cleanly");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Err(err) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!(
                dir = %self.profile_dir.display(),
                error = %err,
                "profile directory not removed"
            );
        }
        closed
    }
}

struct ChromePage {
    page: Page,
}

impl ChromePage {
    async fn query(&self, script: String) -> Result<Vec<ElementSnapshot>, PageError> {
        let reply: QueryReply = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?
            .into_value()?;
        match reply.invalid_selector {
            Some(reason) => Err(PageError::InvalidSelector {
                selector: String::new(),
                reason,
            }),
            None => Ok(reply.elements),
        }
    }
}

/// The `Network.setUserAgentOverride` command `Page::set_user_agent` sends.
fn user_agent_override(user_agent: &str) -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams::new(user_agent)
}

fn js_string(value: &str) -> Result<String, PageError> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl PageQuery for ChromePage {
    async fn content(&self) -> Result<String, PageError> {
        self.page
            .content()
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))
    }

    async fn select(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        let script = SELECT_JS
            .replace("__SNAPSHOT__", SNAPSHOT_FN)
            .replace("__SELECTOR__", &js_string(selector)?);
        self.query(script).await.map_err(|err| with_selector(err, selector))
    }

    async fn select_in_container(
        &self,
        label: &str,
        item_selector: &str,
    ) -> Result<Vec<ElementSnapshot>, PageError> {
        let script = SELECT_IN_CONTAINER_JS
            .replace("__SNAPSHOT__", SNAPSHOT_FN)
            .replace("__LABEL__", &js_string(label)?)
            .replace("__CONTAINERS__", &js_string(CONTAINER_SELECTOR)?)
            .replace("__ITEMS__", &js_string(item_selector)?);
        self.query(script)
            .await
            .map_err(|err| with_selector(err, item_selector))
    }
}

fn with_selector(err: PageError, selector: &str) -> PageError {
    match err {
        PageError::InvalidSelector { reason, .. } => PageError::InvalidSelector {
            selector: selector.to_owned(),
            reason,
        },
        other => other,
    }
}

/// Stands in for the tab once a session has been closed.
struct ClosedPage;

static CLOSED_PAGE: ClosedPage = ClosedPage;

#[async_trait]
impl PageQuery for ClosedPage {
    async fn content(&self) -> Result<String, PageError> {
        Err(PageError::Evaluation("session closed".to_string()))
    }

    async fn select(&self, _selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        Err(PageError::Evaluation("session closed".to_string()))
    }

    async fn select_in_container(
        &self,
        _label: &str,
        _item_selector: &str,
    ) -> Result<Vec<ElementSnapshot>, PageError> {
        Err(PageError::Evaluation("session closed".to_string()))
    }
}
