use super::text::first_number;
use super::{select_or_empty, Probes};
use crate::page::{ElementSnapshot, PageQuery};

const CLASS_SELECTORS: [&str; 4] = [
    ".rating-value",
    "[class*='rating-value']",
    "[class*='ratingValue']",
    "[data-rating]",
];

/// Average rating shown on the page, if any.
pub async fn extract_rating(page: &dyn PageQuery, probes: &mut Probes) -> Option<f64> {
    probes.push("rating:itemprop");
    let found = select_or_empty(page, "[itemprop='ratingValue']")
        .await
        .iter()
        .find_map(|el| rating_value(el, "content"));
    if found.is_some() {
        return found;
    }

    probes.push("rating:class");
    for selector in CLASS_SELECTORS {
        let found = select_or_empty(page, selector)
            .await
            .iter()
            .find_map(|el| rating_value(el, "data-rating"));
        if found.is_some() {
            return found;
        }
    }

    probes.push("rating:none");
    None
}

/// The number in `attr`, falling back to the element's text.
fn rating_value(el: &ElementSnapshot, attr: &str) -> Option<f64> {
    el.attr(attr)
        .and_then(first_number)
        .or_else(|| first_number(&el.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HtmlPage;

    async fn run(html: &str) -> (Option<f64>, Vec<String>) {
        let page = HtmlPage::new(html);
        let mut probes = Probes::default();
        let got = extract_rating(&page, &mut probes).await;
        (got, probes.into_inner())
    }

    #[tokio::test]
    async fn itemprop_content_wins() {
        let (got, probes) = run(
            r#"<meta itemprop="ratingValue" content="4.3">
               <span class="rating-value">2.0</span>"#,
        )
        .await;
        assert_eq!(got, Some(4.3));
        assert_eq!(probes, vec!["rating:itemprop"]);
    }

    #[tokio::test]
    async fn itemprop_text_is_parsed() {
        let (got, _) = run(r#"<span itemprop="ratingValue">Rated 4,5 / 5</span>"#).await;
        assert_eq!(got, Some(4.5));
    }

    #[tokio::test]
    async fn rating_class_fallback() {
        let (got, probes) = run(r#"<div class="product-rating-value"> 3.8 stars</div>"#).await;
        assert_eq!(got, Some(3.8));
        assert_eq!(probes, vec!["rating:itemprop", "rating:class"]);
    }

    #[tokio::test]
    async fn data_rating_attribute() {
        let (got, _) = run(r#"<div data-rating="4.75"><i></i><i></i></div>"#).await;
        assert_eq!(got, Some(4.75));
    }

    #[tokio::test]
    async fn non_numeric_rating_is_none() {
        let (got, probes) = run(r#"<span itemprop="ratingValue">no reviews yet</span>"#).await;
        assert!(got.is_none());
        assert_eq!(probes.last().map(String::as_str), Some("rating:none"));
    }
}
