//! Text cleanup and money parsing shared by the field extractors.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|([a-zA-Z][a-zA-Z0-9]{1,31}));")
        .expect("valid entity regex")
});

/// A currency symbol (or a three-letter code) followed by an amount.
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(£|\$|€|\bGBP\b|\bUSD\b|\bEUR\b)\s?(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)",
    )
    .expect("valid money regex")
});

/// A plain amount; commas are only accepted as thousands separators.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").expect("valid amount regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("valid number regex"));

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "pound" => "£",
        "euro" => "€",
        "dollar" => "$",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        "hellip" => "…",
        "mdash" => "—",
        "ndash" => "–",
        "lsquo" => "‘",
        "rsquo" => "’",
        "ldquo" => "“",
        "rdquo" => "”",
        "laquo" => "«",
        "raquo" => "»",
        "bull" => "•",
        "middot" => "·",
        "eacute" => "é",
        "egrave" => "è",
        "aacute" => "á",
        "agrave" => "à",
        "ouml" => "ö",
        "uuml" => "ü",
        "auml" => "ä",
        "ccedil" => "ç",
        "szlig" => "ß",
        _ => return None,
    };
    Some(decoded)
}

/// Decodes named, decimal (`&#163;`) and hex (`&#xA3;`) character references.
///
/// Unknown names and invalid code points are left untouched.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }
    ENTITY_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let numeric = caps
                .get(1)
                .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
                .or_else(|| caps.get(2).and_then(|dec| dec.as_str().parse::<u32>().ok()));
            if let Some(code) = numeric {
                return char::from_u32(code).map_or_else(|| whole.to_owned(), String::from);
            }
            caps.get(3)
                .and_then(|name| named_entity(name.as_str()))
                .map_or_else(|| whole.to_owned(), str::to_owned)
        })
        .into_owned()
}

/// Decodes entities, then collapses all whitespace runs (including NBSP) to
/// single spaces.
#[must_use]
pub fn clean_text(input: &str) -> String {
    decode_entities(input)
        .split(|c: char| c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps a currency symbol or code to its ISO 4217 code.
#[must_use]
pub fn currency_for_symbol(symbol: &str) -> Option<&'static str> {
    match symbol.trim() {
        "£" | "GBP" => Some("GBP"),
        "$" | "USD" => Some("USD"),
        "€" | "EUR" => Some("EUR"),
        _ => None,
    }
}

/// Parses a bare amount such as `"6.99"`, `"£1,299.00"` or `" 7.5 "` into a
/// two-decimal value. Signed amounts and decimal commas (`"1.234,56"`) are
/// rejected.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let unprefixed = ["£", "$", "€", "GBP", "USD", "EUR"]
        .iter()
        .find_map(|symbol| trimmed.strip_prefix(symbol))
        .unwrap_or(trimmed);
    let amount = ["GBP", "USD", "EUR"]
        .iter()
        .find_map(|code| unprefixed.strip_suffix(code))
        .unwrap_or(unprefixed)
        .trim();
    if !AMOUNT_RE.is_match(amount) {
        return None;
    }
    amount
        .replace(',', "")
        .parse::<Decimal>()
        .ok()
        .map(|d| d.round_dp(2).normalize())
}

/// A price found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyMatch {
    pub amount: Decimal,
    pub currency: Option<&'static str>,
}

/// Finds every `<symbol><amount>` occurrence in `text`, in order.
#[must_use]
pub fn find_money(text: &str) -> Vec<MoneyMatch> {
    MONEY_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let amount = parse_amount(caps.get(2)?.as_str())?;
            let currency = caps.get(1).and_then(|m| currency_for_symbol(m.as_str()));
            Some(MoneyMatch { amount, currency })
        })
        .collect()
}

/// First numeric substring of `text` as a finite float. A decimal comma is
/// accepted (`"4,5"`).
#[must_use]
pub fn first_number(text: &str) -> Option<f64> {
    let m = NUMBER_RE.find(text)?;
    m.as_str()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Truncates to at most `max_chars` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_decimal_and_hex_references() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry &#163;5 &#xA3;6 &pound;7 &hellip;"),
            "Tom & Jerry £5 £6 £7 …"
        );
    }

    #[test]
    fn leaves_unknown_and_invalid_references() {
        assert_eq!(decode_entities("&bogus; &#xD800; a&b"), "&bogus; &#xD800; a&b");
    }

    #[test]
    fn clean_text_collapses_nbsp_and_newlines() {
        assert_eq!(clean_text(" A&nbsp;tale\n\n of\ttwo "), "A tale of two");
    }

    #[test]
    fn parses_symbol_prefixed_amounts() {
        let found = find_money("Was £12.50, now £6.99 or $8");
        let amounts: Vec<String> = found.iter().map(|m| m.amount.to_string()).collect();
        assert_eq!(amounts, vec!["12.5", "6.99", "8"]);
        assert_eq!(found[0].currency, Some("GBP"));
        assert_eq!(found[2].currency, Some("USD"));
    }

    #[test]
    fn parses_space_after_symbol_and_codes() {
        let found = find_money("€ 4.20 and GBP 3.10");
        assert_eq!(found[0].amount, Decimal::new(420, 2));
        assert_eq!(found[0].currency, Some("EUR"));
        assert_eq!(found[1].amount, Decimal::new(310, 2));
        assert_eq!(found[1].currency, Some("GBP"));
    }

    #[test]
    fn thousands_separators_are_dropped() {
        let found = find_money("£1,299.00");
        assert_eq!(found[0].amount, Decimal::from(1299));
    }

    #[test]
    fn parse_amount_is_two_decimal_safe() {
        assert_eq!(parse_amount("6.99"), Some(Decimal::new(699, 2)));
        assert_eq!(parse_amount("7.50"), Some(Decimal::new(75, 1)));
        assert_eq!(parse_amount("3.14159"), Some(Decimal::new(314, 2)));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn parse_amount_rejects_signs_and_decimal_commas() {
        assert_eq!(parse_amount("-7.50"), None);
        assert_eq!(parse_amount(" -3 "), None);
        assert_eq!(parse_amount("1.234,56"), None);
        assert_eq!(parse_amount("12,5"), None);
        assert_eq!(parse_amount("1,299.00"), Some(Decimal::from(1299)));
        assert_eq!(parse_amount("£ 6.99"), Some(Decimal::new(699, 2)));
        assert_eq!(parse_amount("8.00 GBP"), Some(Decimal::from(8)));
    }

    #[test]
    fn first_number_accepts_decimal_comma() {
        assert_eq!(first_number("Rated 4,5 out of 5"), Some(4.5));
        assert_eq!(first_number("4.25"), Some(4.25));
        assert_eq!(first_number("no stars"), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("£££££", 3), "£££");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
