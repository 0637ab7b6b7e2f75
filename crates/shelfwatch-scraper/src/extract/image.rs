use std::sync::LazyLock;

use regex::Regex;

use super::jsonld::{image_urls, offers, product_nodes};
use super::{select_or_empty, Probes, MAIN_REGION_SELECTORS};
use crate::page::{ElementSnapshot, PageQuery};

static LOGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(?:logo|icon)s?(?:[^a-z]|$)|sprite|favicon|placeholder|trustpilot|default[-_]?og|og[-_]?default|default[-_]?(?:share|social)|no[-_]?image",
    )
    .expect("valid logo regex")
});

const META_IMAGE_SELECTORS: [&str; 5] = [
    "meta[property='og:image']",
    "meta[property='og:image:secure_url']",
    "meta[name='og:image']",
    "meta[name='twitter:image']",
    "meta[property='twitter:image']",
];

/// Both layout dimensions must reach this many CSS pixels.
const MIN_CONTENT_IMAGE_PX: f64 = 180.0;
/// Portrait images (height/width at or above this) are cover-shaped and
/// score double.
const PORTRAIT_RATIO: f64 = 1.2;

/// Rejects assets that are branding rather than product imagery: SVGs and
/// anything whose URL or alt text looks like a logo, icon, sprite, favicon,
/// placeholder, review badge or the site's default share image.
#[must_use]
#[allow(clippy::case_sensitive_file_extension_comparisons)] // url_lower is already lowercased
pub fn is_logo(url: &str, alt: Option<&str>) -> bool {
    let url_lower = url.to_ascii_lowercase();
    let path = url_lower.split(['?', '#']).next().unwrap_or(&url_lower);
    if path.ends_with(".svg") || url_lower.starts_with("data:image/svg") {
        return true;
    }
    LOGO_RE.is_match(&url_lower) || alt.is_some_and(|a| LOGO_RE.is_match(a))
}

/// Image cascade: social meta tags, then JSON-LD, then the largest
/// qualifying image in the main content region.
pub async fn extract_image(
    page: &dyn PageQuery,
    page_url: &str,
    probes: &mut Probes,
) -> Option<String> {
    probes.push("img:og");
    for selector in META_IMAGE_SELECTORS {
        for el in select_or_empty(page, selector).await {
            if let Some(url) = el.attr("content").and_then(|raw| accept(page_url, raw, None)) {
                return Some(url);
            }
        }
    }

    probes.push("img:ld-json");
    match page.content().await {
        Ok(html) => {
            for node in product_nodes(&html) {
                let mut urls = image_urls(node.get("image"));
                for offer in offers(&node) {
                    urls.extend(image_urls(offer.get("image")));
                }
                if let Some(url) = urls.iter().find_map(|raw| accept(page_url, raw, None)) {
                    return Some(url);
                }
            }
        }
        Err(err) => tracing::debug!(error = %err, "page content unavailable for JSON-LD images"),
    }

    probes.push("img:dom");
    if let Some(url) = largest_content_image(page, page_url).await {
        return Some(url);
    }

    probes.push("img:none");
    None
}

async fn largest_content_image(page: &dyn PageQuery, page_url: &str) -> Option<String> {
    let mut images = Vec::new();
    for region in MAIN_REGION_SELECTORS {
        images = select_or_empty(page, &format!("{region} img")).await;
        if !images.is_empty() {
            break;
        }
    }
    if images.is_empty() {
        images = select_or_empty(page, "img").await;
    }

    images
        .iter()
        .filter(|img| img.width >= MIN_CONTENT_IMAGE_PX && img.height >= MIN_CONTENT_IMAGE_PX)
        .filter_map(|img| {
            let url = accept(page_url, &image_source(img)?, img.attr("alt"))?;
            Some((score(img), url))
        })
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, url)| url)
}

fn score(img: &ElementSnapshot) -> f64 {
    let area = img.width * img.height;
    if img.height / img.width >= PORTRAIT_RATIO {
        area * 2.0
    } else {
        area
    }
}

/// `srcset` (largest descriptor), then `src`, `data-src`, `currentSrc`.
fn image_source(img: &ElementSnapshot) -> Option<String> {
    img.attr("srcset")
        .and_then(largest_srcset_entry)
        .or_else(|| img.attr("src").map(str::to_owned))
        .or_else(|| img.attr("data-src").map(str::to_owned))
        .or_else(|| img.current_src.clone())
}

fn largest_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let weight = parts
                .next()
                .and_then(|d| d.trim_end_matches(['w', 'x']).parse::<f64>().ok())
                .unwrap_or(1.0);
            Some((weight, url))
        })
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, url)| url.to_owned())
}

fn accept(page_url: &str, raw: &str, alt: Option<&str>) -> Option<String> {
    let url = absolutize_url(page_url, raw)?;
    if is_logo(&url, alt) {
        tracing::debug!(url, "rejected logo-like image candidate");
        return None;
    }
    Some(url)
}

fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() {
        return None;
    }
    let base = reqwest::Url::parse(base_url).ok()?;
    let joined = base.join(&candidate).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HtmlPage;

    const PAGE_URL: &str = "https://shop.example/en-gb/products/dune";

    async fn run(html: &str) -> (Option<String>, Vec<String>) {
        let page = HtmlPage::new(html);
        let mut probes = Probes::default();
        let got = extract_image(&page, PAGE_URL, &mut probes).await;
        (got, probes.into_inner())
    }

    #[test]
    fn logo_predicate_rejects_branding() {
        assert!(is_logo("https://cdn.example/logo.svg", None));
        assert!(is_logo("https://cdn.example/cover.SVG?v=2", None));
        assert!(is_logo("https://cdn.example/img/site-sprite.png", None));
        assert!(is_logo("https://cdn.example/favicon-32.png", None));
        assert!(is_logo("https://cdn.example/trustpilot-stars.png", None));
        assert!(is_logo("https://cdn.example/default-og-image.jpg", None));
        assert!(is_logo("https://cdn.example/placeholder.jpg", None));
        assert!(is_logo("https://cdn.example/a.jpg", Some("Company Logo")));
        assert!(!is_logo("https://cdn.example/covers/9780441013593.jpg", Some("Dune")));
    }

    #[test]
    fn logo_words_match_whole_tokens_only() {
        assert!(!is_logo(
            "https://cdn.example/covers/silicon-valley-9780000000000.jpg",
            Some("Silicon Valley")
        ));
        assert!(!is_logo("https://cdn.example/covers/lexicon.jpg", Some("Iconic Designs")));
        assert!(!is_logo("https://cdn.example/covers/ecologo.jpg", None));
        assert!(is_logo("https://cdn.example/static/site-logo.png", None));
        assert!(is_logo("https://cdn.example/icons/cart.png", None));
        assert!(is_logo("https://cdn.example/img/apple-touch-icon.png", None));
    }

    #[test]
    fn srcset_prefers_widest_entry() {
        assert_eq!(
            largest_srcset_entry("/s.jpg 320w, /l.jpg 1024w, /m.jpg 640w").as_deref(),
            Some("/l.jpg")
        );
        assert_eq!(largest_srcset_entry("/a.jpg 1x, /b.jpg 2x").as_deref(), Some("/b.jpg"));
    }

    #[test]
    fn absolutize_resolves_relative_and_rejects_non_http() {
        assert_eq!(
            absolutize_url(PAGE_URL, "/img/c.jpg?w=1&amp;h=2").as_deref(),
            Some("https://shop.example/img/c.jpg?w=1&h=2")
        );
        assert_eq!(
            absolutize_url(PAGE_URL, "//cdn.example/c.jpg").as_deref(),
            Some("https://cdn.example/c.jpg")
        );
        assert_eq!(absolutize_url(PAGE_URL, "data:image/png;base64,AAAA"), None);
        assert_eq!(absolutize_url("not a url", "/c.jpg"), None);
    }

    #[tokio::test]
    async fn og_image_wins_when_not_a_logo() {
        let (got, probes) = run(
            r#"<meta property="og:image" content="/covers/dune.jpg">
               <script type="application/ld+json">{"@type":"Book","image":"/covers/other.jpg"}</script>"#,
        )
        .await;
        assert_eq!(got.as_deref(), Some("https://shop.example/covers/dune.jpg"));
        assert_eq!(probes, vec!["img:og"]);
    }

    #[tokio::test]
    async fn svg_og_image_falls_through_to_json_ld() {
        let (got, probes) = run(
            r#"<meta property="og:image" content="https://shop.example/static/logo.svg">
               <script type="application/ld+json">
                 {"@type":"Product","image":["https://cdn.example/covers/dune.jpg"]}
               </script>"#,
        )
        .await;
        assert_eq!(got.as_deref(), Some("https://cdn.example/covers/dune.jpg"));
        assert_eq!(probes, vec!["img:og", "img:ld-json"]);
    }

    #[tokio::test]
    async fn json_ld_offer_image_is_used() {
        let (got, _) = run(
            r#"<script type="application/ld+json">
                 {"@type":"Book","offers":[{"price":"4.00","image":{"url":"/o/cover.jpg"}}]}
               </script>"#,
        )
        .await;
        assert_eq!(got.as_deref(), Some("https://shop.example/o/cover.jpg"));
    }

    #[tokio::test]
    async fn largest_portrait_content_image_wins() {
        let (got, probes) = run(
            r#"<header><img src="/banner.jpg" width="1200" height="400"></header>
               <main>
                 <img src="/small.jpg" width="120" height="180">
                 <img src="/wide.jpg" width="400" height="300">
                 <img data-src="/cover.jpg" width="300" height="450">
                 <img src="/icons/badge.png" width="600" height="900">
               </main>"#,
        )
        .await;
        // wide: 120_000; cover: 135_000 * 2 = 270_000; badge rejected.
        assert_eq!(got.as_deref(), Some("https://shop.example/cover.jpg"));
        assert_eq!(probes, vec!["img:og", "img:ld-json", "img:dom"]);
    }

    #[tokio::test]
    async fn no_candidates_records_none() {
        let (got, probes) = run("<main><img src='/tiny.jpg' width='50' height='50'></main>").await;
        assert!(got.is_none());
        assert_eq!(probes.last().map(String::as_str), Some("img:none"));
    }
}
