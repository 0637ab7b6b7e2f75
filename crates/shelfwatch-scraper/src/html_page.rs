//! [`PageQuery`] over a static HTML document.
//!
//! Used by the HTTP driver and by tests. Layout boxes are unknown for static
//! markup, so element sizes come from `width`/`height` attributes.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::PageError;
use crate::page::{ElementSnapshot, PageQuery, CONTAINER_SELECTOR};

const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

#[derive(Debug, Default)]
pub struct HtmlPage {
    document: RwLock<String>,
}

impl HtmlPage {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(html.into()),
        }
    }

    /// Swaps in a freshly loaded document.
    pub fn replace(&self, html: String) {
        *self.document.write().unwrap_or_else(PoisonError::into_inner) = html;
    }

    fn source(&self) -> String {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn select_sync(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.source());
        Ok(html.select(&selector).map(snapshot).collect())
    }

    fn select_in_container_sync(
        &self,
        label: &str,
        item_selector: &str,
    ) -> Result<Vec<ElementSnapshot>, PageError> {
        let items = parse_selector(item_selector)?;
        let containers = parse_selector(CONTAINER_SELECTOR)?;
        let needle = label.to_lowercase();
        let html = Html::parse_document(&self.source());

        let best = html
            .select(&containers)
            .filter_map(|container| {
                let text = visible_text(container);
                let qualifies = text.to_lowercase().contains(&needle)
                    && container.select(&items).next().is_some();
                qualifies.then_some((text.len(), container))
            })
            .min_by_key(|(len, _)| *len);

        Ok(best
            .map(|(_, container)| container.select(&items).map(snapshot).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PageQuery for HtmlPage {
    async fn content(&self) -> Result<String, PageError> {
        Ok(self.source())
    }

    async fn select(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        self.select_sync(selector)
    }

    async fn select_in_container(
        &self,
        label: &str,
        item_selector: &str,
    ) -> Result<Vec<ElementSnapshot>, PageError> {
        self.select_in_container_sync(label, item_selector)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
        selector: selector.to_owned(),
        reason: format!("{e:?}"),
    })
}

fn snapshot(el: ElementRef<'_>) -> ElementSnapshot {
    let attrs = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect::<std::collections::BTreeMap<_, _>>();
    let width = attrs.get("width").map_or(0.0, |v| parse_dimension(v));
    let height = attrs.get("height").map_or(0.0, |v| parse_dimension(v));
    let parent_text = el.parent().and_then(ElementRef::wrap).map(visible_text);

    ElementSnapshot {
        tag: el.value().name().to_ascii_lowercase(),
        text: visible_text(el),
        attrs,
        width,
        height,
        current_src: None,
        parent_text,
    }
}

fn parse_dimension(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches("px")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

fn visible_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            out.push(' ');
            collect_text(child_el, out);
            out.push(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn select_snapshots_text_attrs_and_size() {
        let page = HtmlPage::new(
            r#"<main><img src="/c.jpg" width="300px" height="450" alt="Cover"><p> Hello
               <b>world</b><script>var x = "hidden";</script></p></main>"#,
        );
        let imgs = page.select("main img").await.unwrap();
        assert_eq!(imgs.len(), 1);
        assert_eq!(imgs[0].tag, "img");
        assert_eq!(imgs[0].attr("alt"), Some("Cover"));
        assert!((imgs[0].width - 300.0).abs() < f64::EPSILON);
        assert!((imgs[0].height - 450.0).abs() < f64::EPSILON);

        let paras = page.select("p").await.unwrap();
        assert_eq!(paras[0].text, "Hello world");
    }

    #[tokio::test]
    async fn parent_text_covers_enclosing_section() {
        let page = HtmlPage::new("<section><h2>Summary</h2><p>Body text.</p></section>");
        let headings = page.select("h2").await.unwrap();
        assert_eq!(headings[0].parent_text.as_deref(), Some("Summary Body text."));
    }

    #[tokio::test]
    async fn invalid_selector_is_an_error() {
        let page = HtmlPage::new("<p>x</p>");
        let err = page.select("p[").await.unwrap_err();
        assert!(matches!(err, PageError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn select_in_container_picks_tightest_labelled_container() {
        let page = HtmlPage::new(
            r#"<div id="outer">
                 <button>Add to basket</button>
                 <div id="conditions">
                   <h3>Select condition</h3>
                   <button>Very Good £6.99</button>
                   <button>Good £5.49</button>
                 </div>
               </div>"#,
        );
        let items = page
            .select_in_container("select condition", "button")
            .await
            .unwrap();
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Very Good £6.99", "Good £5.49"]);
    }

    #[tokio::test]
    async fn select_in_container_without_label_is_empty() {
        let page = HtmlPage::new("<div><button>£1.00</button></div>");
        let items = page
            .select_in_container("select condition", "button")
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn replace_swaps_document() {
        let page = HtmlPage::default();
        page.replace("<title>Loaded</title>".to_string());
        assert!(page.content().await.unwrap().contains("Loaded"));
    }
}
