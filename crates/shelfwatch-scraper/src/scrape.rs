//! One extraction attempt: launch, navigate, extract, tear down.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use shelfwatch_core::ExtractionConfig;

use crate::driver::BrowserDriver;
use crate::extract::{extract_all, ExtractionResult};
use crate::navigator;

pub const PROBE_LAUNCH_FAILED: &str = "browser:launch-failed";
pub const PROBE_NAV_FAILED: &str = "nav:failed";
pub const PROBE_EXTRACT_PANICKED: &str = "extract:panicked";

/// Runs a full extraction attempt against `url` in a fresh browser session.
///
/// Failures degrade the result instead of surfacing as errors: a session that
/// cannot start yields an empty result tagged `browser:launch-failed`, and a
/// page that never loads is still handed to the extractors. The session is
/// closed on every path, including a panic inside extraction.
pub async fn scrape(
    driver: &dyn BrowserDriver,
    url: &str,
    config: &ExtractionConfig,
) -> ExtractionResult {
    let mut session = match driver.launch().await {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(url, error = %err, "could not start browser session");
            return ExtractionResult {
                probes: vec![PROBE_LAUNCH_FAILED.to_string()],
                ..ExtractionResult::default()
            };
        }
    };

    let navigation = navigator::load(session.as_ref(), url, config).await;

    let extracted = AssertUnwindSafe(extract_all(session.page(), url, navigation.status, config))
        .catch_unwind()
        .await;

    if let Err(err) = session.close().await {
        tracing::warn!(url, error = %err, "browser session teardown failed");
    }

    let mut result = extracted.unwrap_or_else(|_| {
        tracing::error!(url, "extraction panicked; returning empty result");
        ExtractionResult {
            http_status: navigation.status,
            probes: vec![PROBE_EXTRACT_PANICKED.to_string()],
            ..ExtractionResult::default()
        }
    });
    if !navigation.loaded {
        result.probes.insert(0, PROBE_NAV_FAILED.to_string());
    }

    tracing::info!(
        url,
        status = ?result.http_status,
        price = ?result.price,
        unavailable = result.unavailable,
        probes = result.probes.len(),
        "extraction finished"
    );
    result
}
