//! Price, currency and availability.
//!
//! Availability is read first and independently of price: a page that says
//! "currently unavailable" may still render stale prices, and the reconciler
//! lets availability win. The price cascade stops at the first strategy that
//! yields an in-bound amount; every strategy that runs leaves a probe tag.

use rust_decimal::Decimal;
use serde_json::Value;
use shelfwatch_core::ExtractionConfig;

use super::jsonld::{as_list, offers, product_nodes, scalar_text};
use super::text::{decode_entities, find_money, parse_amount};
use super::{main_region, select_or_empty, Probes};
use crate::page::{ElementSnapshot, PageQuery};

const UNAVAILABLE_PHRASES: [&str; 2] = ["currently unavailable", "out of stock"];

const CONDITION_LABEL: &str = "select condition";
const CONDITION_OPTION_SELECTOR: &str =
    "button, [role='radio'], [role='button'], [role='option'], label, input[type='radio']";
const SELECTED_CLASSES: [&str; 3] = ["selected", "active", "checked"];

const DOM_PRICE_SELECTOR: &str =
    "[class*='price'], [id*='price'], [data-testid*='price'], [data-price]";

pub const PROBE_WIDGET: &str = "price:wob-conditions";
pub const PROBE_LD_JSON: &str = "price:ld-json";
pub const PROBE_MICRODATA: &str = "price:microdata";
pub const PROBE_DOM: &str = "price:dom";
pub const PROBE_RAW_HTML: &str = "price:raw-html";
pub const PROBE_NONE: &str = "price:none";
pub const PROBE_UNAVAILABLE: &str = "avail:unavailable";

/// What the price extractor concluded about the offer on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferOutcome {
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PriceHit {
    price: Decimal,
    currency: Option<String>,
}

pub async fn extract_offer(
    page: &dyn PageQuery,
    config: &ExtractionConfig,
    probes: &mut Probes,
) -> OfferOutcome {
    let unavailable = is_unavailable(page).await;
    if unavailable {
        probes.push(PROBE_UNAVAILABLE);
    }

    let hit = 'cascade: {
        probes.push(PROBE_WIDGET);
        if let Some(hit) = condition_widget(page, config).await {
            break 'cascade Some(hit);
        }

        let html = match page.content().await {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::debug!(
                    error = %err,
                    "page content unavailable; skipping source-based price strategies"
                );
                None
            }
        };

        probes.push(PROBE_LD_JSON);
        if let Some(hit) = html.as_deref().and_then(|h| structured_data(h, config)) {
            break 'cascade Some(hit);
        }

        probes.push(PROBE_MICRODATA);
        if let Some(hit) = microdata(page, config).await {
            break 'cascade Some(hit);
        }

        probes.push(PROBE_DOM);
        if let Some(hit) = dom_price(page, config).await {
            break 'cascade Some(hit);
        }

        probes.push(PROBE_RAW_HTML);
        html.as_deref().and_then(|h| first_in_bounds(&decode_entities(h), config))
    };

    match hit {
        Some(PriceHit { price, currency }) => OfferOutcome {
            price: Some(price),
            currency: Some(currency.unwrap_or_else(|| config.default_currency.clone())),
            unavailable,
        },
        None => {
            probes.push(PROBE_NONE);
            OfferOutcome {
                price: None,
                currency: standalone_currency(page).await,
                unavailable,
            }
        }
    }
}

async fn is_unavailable(page: &dyn PageQuery) -> bool {
    main_region(page).await.iter().any(|region| {
        let lower = region.text.to_lowercase();
        UNAVAILABLE_PHRASES.iter().any(|p| lower.contains(p))
    })
}

/// The storefront's condition picker: a labelled group of tiles such as
/// "Very Good £6.99 / Good £5.49". The selected tile wins; otherwise the
/// cheapest enabled tile.
async fn condition_widget(page: &dyn PageQuery, config: &ExtractionConfig) -> Option<PriceHit> {
    let options = match page
        .select_in_container(CONDITION_LABEL, CONDITION_OPTION_SELECTOR)
        .await
    {
        Ok(options) => options,
        Err(err) => {
            tracing::debug!(error = %err, "condition widget query failed");
            return None;
        }
    };

    let priced: Vec<(bool, PriceHit)> = options
        .iter()
        .filter(|option| !is_disabled(option))
        .filter_map(|option| {
            let money = find_money(&option.text)
                .into_iter()
                .find(|m| config.price_in_bounds(m.amount))?;
            let hit = PriceHit {
                price: money.amount,
                currency: money.currency.map(str::to_owned),
            };
            Some((is_selected(option), hit))
        })
        .collect();

    priced
        .iter()
        .find(|(selected, _)| *selected)
        .or_else(|| priced.iter().min_by_key(|(_, hit)| hit.price))
        .map(|(_, hit)| hit.clone())
}

fn is_disabled(option: &ElementSnapshot) -> bool {
    option.flag("disabled") || option.flag("aria-disabled") || option.has_class("disabled")
}

fn is_selected(option: &ElementSnapshot) -> bool {
    let by_state = ["aria-pressed", "aria-checked", "aria-selected", "checked"]
        .iter()
        .any(|name| option.flag(name))
        || option
            .attr("data-selected")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let by_class = option.attrs.get("class").is_some_and(|classes| {
        classes.split_whitespace().any(|class| {
            let class = class.to_ascii_lowercase();
            SELECTED_CLASSES.iter().any(|s| {
                class == *s || class == format!("is-{s}") || class.ends_with(&format!("--{s}"))
            })
        })
    });

    by_state || by_class
}

/// Minimum in-bound offer price across every Product/Book node.
fn structured_data(html: &str, config: &ExtractionConfig) -> Option<PriceHit> {
    let mut hits: Vec<PriceHit> = Vec::new();
    let mut first_currency: Option<String> = None;

    for node in product_nodes(html) {
        for offer in offers(&node) {
            // AggregateOffer may nest its own offers one level down.
            let nested = as_list(offer.get("offers"));
            for entry in std::iter::once(offer).chain(nested) {
                collect_offer_prices(entry, config, &mut hits, &mut first_currency);
            }
        }
    }

    let mut best = hits.into_iter().min_by_key(|hit| hit.price)?;
    if best.currency.is_none() {
        best.currency = first_currency;
    }
    Some(best)
}

fn collect_offer_prices(
    offer: &Value,
    config: &ExtractionConfig,
    hits: &mut Vec<PriceHit>,
    first_currency: &mut Option<String>,
) {
    let offer_currency = offer.get("priceCurrency").and_then(scalar_text);

    let mut candidates: Vec<(Option<&Value>, Option<String>)> = vec![
        (offer.get("price"), offer_currency.clone()),
        (offer.get("lowPrice"), offer_currency.clone()),
    ];
    for spec in as_list(offer.get("priceSpecification")) {
        let currency = spec
            .get("priceCurrency")
            .and_then(scalar_text)
            .or_else(|| offer_currency.clone());
        candidates.push((spec.get("price"), currency));
    }

    for (value, currency) in candidates {
        let currency = currency.map(|c| c.trim().to_ascii_uppercase()).filter(|c| !c.is_empty());
        if first_currency.is_none() {
            first_currency.clone_from(&currency);
        }
        let Some(price) = value.and_then(scalar_text).and_then(|raw| parse_amount(&raw)) else {
            continue;
        };
        if config.price_in_bounds(price) {
            hits.push(PriceHit { price, currency });
        }
    }
}

/// `[itemprop=price]` and `product:price:amount` meta, minimum valid value.
async fn microdata(page: &dyn PageQuery, config: &ExtractionConfig) -> Option<PriceHit> {
    let mut amounts: Vec<Decimal> = Vec::new();

    for el in select_or_empty(page, "[itemprop='price']").await {
        let raw = el
            .attr("content")
            .or_else(|| el.attr("value"))
            .map_or_else(|| el.text.clone(), str::to_owned);
        amounts.extend(parse_amount(&raw));
    }
    for el in select_or_empty(page, "meta[property='product:price:amount']").await {
        amounts.extend(el.attr("content").and_then(parse_amount));
    }

    let price = amounts
        .into_iter()
        .filter(|p| config.price_in_bounds(*p))
        .min()?;
    Some(PriceHit {
        price,
        currency: markup_currency(page).await,
    })
}

async fn markup_currency(page: &dyn PageQuery) -> Option<String> {
    for selector in [
        "[itemprop='priceCurrency']",
        "meta[property='product:price:currency']",
        "meta[property='og:price:currency']",
    ] {
        let found = select_or_empty(page, selector).await.into_iter().find_map(|el| {
            let raw = el.attr("content").map_or_else(|| el.text.clone(), str::to_owned);
            let code = raw.trim().to_ascii_uppercase();
            (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())).then_some(code)
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

async fn dom_price(page: &dyn PageQuery, config: &ExtractionConfig) -> Option<PriceHit> {
    let combined = select_or_empty(page, DOM_PRICE_SELECTOR)
        .await
        .into_iter()
        .map(|el| el.text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    first_in_bounds(&combined, config)
}

fn first_in_bounds(text: &str, config: &ExtractionConfig) -> Option<PriceHit> {
    find_money(text)
        .into_iter()
        .find(|m| config.price_in_bounds(m.amount))
        .map(|m| PriceHit {
            price: m.amount,
            currency: m.currency.map(str::to_owned),
        })
}

/// A currency stated by the page even though no usable price was found.
async fn standalone_currency(page: &dyn PageQuery) -> Option<String> {
    if let Ok(html) = page.content().await {
        for node in product_nodes(&html) {
            let found = offers(&node).into_iter().find_map(|offer| {
                offer
                    .get("priceCurrency")
                    .and_then(scalar_text)
                    .map(|c| c.trim().to_ascii_uppercase())
                    .filter(|c| !c.is_empty())
            });
            if found.is_some() {
                return found;
            }
        }
    }
    markup_currency(page).await
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
