use std::sync::LazyLock;

use regex::Regex;

use super::text::{clean_text, truncate_chars};
use super::{select_or_empty, Probes};
use crate::page::PageQuery;

/// Region queries for summary/description blocks, most specific first.
const DESCRIPTION_SELECTORS: [&str; 9] = [
    "[data-testid='product-summary']",
    "[data-testid='product-description']",
    "#product-summary",
    ".product-summary",
    "[itemprop='description']",
    "#product-description",
    ".product-description",
    "#description",
    ".description",
];

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [role='heading']";
const META_SELECTORS: [&str; 2] = [
    "meta[name='description']",
    "meta[property='og:description']",
];

/// Minimum length for heading-discovered text; shorter blocks are usually
/// tab labels or "read more" stubs.
const HEADING_MIN_CHARS: usize = 40;
const HEADING_MAX_CHARS: usize = 1500;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)summary|description").expect("valid heading regex"));

/// Description cascade: region selectors, then heading discovery, then the
/// meta description.
pub async fn extract_description(page: &dyn PageQuery, probes: &mut Probes) -> Option<String> {
    probes.push("desc:selector");
    for selector in DESCRIPTION_SELECTORS {
        let found = select_or_empty(page, selector)
            .await
            .into_iter()
            .map(|el| clean_text(&el.text))
            .find(|text| !text.is_empty());
        if found.is_some() {
            return found;
        }
    }

    probes.push("desc:heading");
    if let Some(text) = from_heading(page).await {
        return Some(text);
    }

    probes.push("desc:meta");
    for selector in META_SELECTORS {
        let found = select_or_empty(page, selector)
            .await
            .into_iter()
            .filter_map(|el| el.attr("content").map(clean_text))
            .find(|text| !text.is_empty());
        if found.is_some() {
            return found;
        }
    }

    probes.push("desc:none");
    None
}

async fn from_heading(page: &dyn PageQuery) -> Option<String> {
    select_or_empty(page, HEADING_SELECTOR)
        .await
        .into_iter()
        .filter(|heading| HEADING_RE.is_match(&heading.text))
        .find_map(|heading| {
            let section = clean_text(heading.parent_text.as_deref()?);
            let heading_text = clean_text(&heading.text);
            let body = section
                .strip_prefix(heading_text.as_str())
                .unwrap_or(section.as_str())
                .trim();
            (body.chars().count() >= HEADING_MIN_CHARS)
                .then(|| truncate_chars(body, HEADING_MAX_CHARS))
        })
}
