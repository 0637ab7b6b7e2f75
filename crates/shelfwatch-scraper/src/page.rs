//! The query capability extractors run against.
//!
//! A loaded page, whether a live browser tab or a static HTML document, is
//! reduced to three questions: what is the serialized document, which
//! elements match a selector, and which items live inside the container
//! labelled with some text. Extraction strategies are plain functions over
//! this trait, so they can be exercised against [`crate::HtmlPage`] without
//! a browser.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PageError;

/// A point-in-time copy of one DOM element.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercased tag name.
    pub tag: String,
    /// Rendered text, whitespace-collapsed. Script and style content excluded.
    pub text: String,
    pub attrs: BTreeMap<String, String>,
    /// Layout box width in CSS pixels; `0.0` when unknown.
    #[serde(default)]
    pub width: f64,
    /// Layout box height in CSS pixels; `0.0` when unknown.
    #[serde(default)]
    pub height: f64,
    /// `HTMLImageElement.currentSrc` for live images.
    #[serde(default)]
    pub current_src: Option<String>,
    /// Rendered text of the parent element.
    #[serde(default)]
    pub parent_text: Option<String>,
}

impl ElementSnapshot {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .map(String::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Returns `true` for boolean attributes (`disabled`, `checked`) and for
    /// ARIA states equal to `"true"`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        match self.attrs.get(name) {
            None => false,
            Some(v) if name.starts_with("aria-") => v.eq_ignore_ascii_case("true"),
            Some(v) => !v.eq_ignore_ascii_case("false"),
        }
    }

    #[must_use]
    pub fn has_class(&self, needle: &str) -> bool {
        self.attrs.get("class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|c| c.to_ascii_lowercase().contains(needle))
        })
    }
}

#[async_trait]
pub trait PageQuery: Send + Sync {
    /// Serialized document HTML.
    async fn content(&self) -> Result<String, PageError>;

    /// Snapshots every element matching the CSS `selector`, in document order.
    async fn select(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError>;

    /// Finds the tightest container (`section`, `div`, `fieldset`, `form`,
    /// list) whose text contains `label` case-insensitively and which holds at
    /// least one `item_selector` match, then snapshots those matches.
    async fn select_in_container(
        &self,
        label: &str,
        item_selector: &str,
    ) -> Result<Vec<ElementSnapshot>, PageError>;
}

/// Element kinds considered as containers by [`PageQuery::select_in_container`].
pub(crate) const CONTAINER_SELECTOR: &str = "section, div, fieldset, form, ul, ol";

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(attrs: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..ElementSnapshot::default()
        }
    }

    #[test]
    fn aria_flags_require_true() {
        let el = snapshot(&[("aria-pressed", "false"), ("aria-checked", "true")]);
        assert!(!el.flag("aria-pressed"));
        assert!(el.flag("aria-checked"));
        assert!(!el.flag("aria-selected"));
    }

    #[test]
    fn boolean_attributes_are_presence_based() {
        let el = snapshot(&[("disabled", ""), ("checked", "checked")]);
        assert!(el.flag("disabled"));
        assert!(el.flag("checked"));
    }

    #[test]
    fn attr_ignores_blank_values() {
        let el = snapshot(&[("src", "  "), ("alt", " Cover ")]);
        assert_eq!(el.attr("src"), None);
        assert_eq!(el.attr("alt"), Some("Cover"));
    }

    #[test]
    fn has_class_matches_substrings_per_class() {
        let el = snapshot(&[("class", "tile Tile--Selected")]);
        assert!(el.has_class("selected"));
        assert!(!el.has_class("disabled"));
    }
}
