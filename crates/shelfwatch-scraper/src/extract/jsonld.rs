//! schema.org JSON-LD helpers for product pages.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const PRODUCT_TYPES: [&str; 2] = ["Product", "Book"];

/// Returns every JSON-LD node typed `Product` or `Book`, in document order.
///
/// Blocks that fail to parse are skipped.
pub(crate) fn product_nodes(html: &str) -> Vec<Value> {
    let mut results = Vec::new();

    for cap in SCRIPT_RE.captures_iter(html) {
        let Some(json_text) = cap.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(json_text) else {
            continue;
        };

        // Accept top-level object, array, or @graph container.
        let mut candidates: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let graphs: Vec<Value> = candidates
            .iter()
            .filter_map(|item| item.get("@graph").and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect();
        candidates.extend(graphs);

        results.extend(candidates.into_iter().filter(is_product));
    }

    results
}

/// `@type` may be a plain string or an array of strings.
fn is_product(item: &Value) -> bool {
    let Some(type_node) = item.get("@type") else {
        return false;
    };
    let matches = |s: &str| PRODUCT_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t));
    if let Some(s) = type_node.as_str() {
        matches(s)
    } else if let Some(arr) = type_node.as_array() {
        arr.iter().filter_map(Value::as_str).any(matches)
    } else {
        false
    }
}

/// `offers` as a list, whether the node holds one offer or many.
pub(crate) fn offers(node: &Value) -> Vec<&Value> {
    as_list(node.get("offers"))
}

pub(crate) fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Numbers may be JSON numbers or strings in the wild.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Image URLs from an `image` property: a string, an `ImageObject`, or a
/// list of either.
pub(crate) fn image_urls(value: Option<&Value>) -> Vec<String> {
    as_list(value)
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => item
                .get("url")
                .or_else(|| item.get("contentUrl"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_product_and_book_nodes_including_graph() {
        let html = r#"
            <script type="application/ld+json">{"@type":"Organization","name":"Shop"}</script>
            <script type="application/ld+json">
              {"@context":"https://schema.org","@graph":[{"@type":["Book","Product"],"name":"Dune"}]}
            </script>
            <script type="application/ld+json">[{"@type":"Product","name":"Mug"}]</script>
            <script type="application/ld+json">{ not json</script>
        "#;
        let nodes = product_nodes(html);
        let names: Vec<&str> = nodes
            .iter()
            .filter_map(|n| n.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["Dune", "Mug"]);
    }

    #[test]
    fn image_urls_accepts_strings_objects_and_lists() {
        let value = serde_json::json!(["a.jpg", {"url": "b.jpg"}, {"contentUrl": "c.jpg"}, 4]);
        assert_eq!(image_urls(Some(&value)), vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert!(image_urls(None).is_empty());
    }

    #[test]
    fn offers_normalizes_single_offer() {
        let node = serde_json::json!({"@type": "Product", "offers": {"price": "7.50"}});
        assert_eq!(offers(&node).len(), 1);
    }
}
