//! Page loading with retry, backoff and consent dismissal.

use std::time::Duration;

use rand::Rng;
use shelfwatch_core::ExtractionConfig;

use crate::driver::BrowserSession;
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

/// How navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// HTTP status of the main document, when observable.
    pub status: Option<u16>,
    /// `false` when even the final unguarded attempt failed. Extraction still
    /// runs; the page is whatever the session holds (usually blank).
    pub loaded: bool,
}

/// Loads `url` into `session`.
///
/// Runs `nav_attempts` guarded attempts with exponential backoff between
/// them. A guarded attempt fails on timeout, transport error or HTTP 429.
/// If all of them fail, one last unguarded attempt is made and its outcome
/// taken as-is. Never returns an error.
pub async fn load(
    session: &dyn BrowserSession,
    url: &str,
    config: &ExtractionConfig,
) -> Navigation {
    settle(config).await;

    let timeout = Duration::from_secs(config.nav_timeout_secs);
    let retries = config.nav_attempts.saturating_sub(1);
    let guarded = retry_with_backoff(retries, config.nav_backoff_base_ms, || {
        guarded_goto(session, url, timeout)
    })
    .await;

    let navigation = match guarded {
        Ok(status) => Navigation { status, loaded: true },
        Err(err) => {
            tracing::warn!(url, error = %err, "guarded navigation exhausted; making final attempt");
            match with_timeout(session, url, timeout).await {
                Ok(status) => Navigation { status, loaded: true },
                Err(err) => {
                    tracing::warn!(
                        url,
                        error = %err,
                        "navigation failed; extracting from blank page"
                    );
                    Navigation { status: None, loaded: false }
                }
            }
        }
    };

    if navigation.loaded {
        dismiss_consent(session, url, config).await;
    }
    navigation
}

async fn settle(config: &ExtractionConfig) {
    let delay_ms = if config.settle_max_ms > config.settle_min_ms {
        rand::rng().random_range(config.settle_min_ms..=config.settle_max_ms)
    } else {
        config.settle_min_ms
    };
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

async fn guarded_goto(
    session: &dyn BrowserSession,
    url: &str,
    timeout: Duration,
) -> Result<Option<u16>, ScraperError> {
    let status = with_timeout(session, url, timeout).await?;
    if status == Some(429) {
        return Err(ScraperError::RateLimited {
            url: url.to_owned(),
        });
    }
    Ok(status)
}

async fn with_timeout(
    session: &dyn BrowserSession,
    url: &str,
    timeout: Duration,
) -> Result<Option<u16>, ScraperError> {
    match tokio::time::timeout(timeout, session.goto(url)).await {
        Ok(result) => result,
        Err(_) => Err(ScraperError::NavigationTimeout {
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

async fn dismiss_consent(session: &dyn BrowserSession, url: &str, config: &ExtractionConfig) {
    let bound = Duration::from_secs(config.consent_timeout_secs);
    match tokio::time::timeout(bound, session.dismiss_consent()).await {
        Ok(Ok(true)) => tracing::debug!(url, "dismissed consent overlay"),
        Ok(Ok(false)) => {}
        Ok(Err(err)) => tracing::debug!(url, error = %err, "consent dismissal failed"),
        Err(_) => tracing::debug!(url, "consent dismissal timed out"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::page::PageQuery;
    use crate::HtmlPage;

    enum Step {
        Status(u16),
        Fail,
        Hang,
    }

    struct ScriptedSession {
        steps: Mutex<VecDeque<Step>>,
        gotos: AtomicU32,
        consent_calls: AtomicU32,
        consent_hangs: bool,
        page: HtmlPage,
    }

    impl ScriptedSession {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                gotos: AtomicU32::new(0),
                consent_calls: AtomicU32::new(0),
                consent_hangs: false,
                page: HtmlPage::default(),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn goto(&self, url: &str) -> Result<Option<u16>, ScraperError> {
            self.gotos.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Status(code)) => Ok(Some(code)),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Some(200))
                }
                Some(Step::Fail) | None => Err(ScraperError::Navigation {
                    url: url.to_owned(),
                    reason: "connection reset".to_owned(),
                }),
            }
        }

        async fn dismiss_consent(&self) -> Result<bool, ScraperError> {
            self.consent_calls.fetch_add(1, Ordering::SeqCst);
            if self.consent_hangs {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(true)
        }

        fn page(&self) -> &dyn PageQuery {
            &self.page
        }

        async fn close(&mut self) -> Result<(), ScraperError> {
            Ok(())
        }
    }

    const URL: &str = "https://shop.example/p/1";

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success() {
        let session = ScriptedSession::new(vec![Step::Status(200)]);
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert_eq!(nav, Navigation { status: Some(200), loaded: true });
        assert_eq!(session.gotos.load(Ordering::SeqCst), 1);
        assert_eq!(session.consent_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried() {
        let session =
            ScriptedSession::new(vec![Step::Status(429), Step::Fail, Step::Status(200)]);
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert_eq!(nav.status, Some(200));
        assert_eq!(session.gotos.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn final_unguarded_attempt_result_is_taken_as_is() {
        let session = ScriptedSession::new(vec![
            Step::Status(429),
            Step::Status(429),
            Step::Status(429),
            Step::Status(429),
        ]);
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert_eq!(nav, Navigation { status: Some(429), loaded: true });
        assert_eq!(session.gotos.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_yields_null_status_and_skips_consent() {
        let session = ScriptedSession::new(vec![]);
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert_eq!(nav, Navigation { status: None, loaded: false });
        assert_eq!(session.gotos.load(Ordering::SeqCst), 4);
        assert_eq!(session.consent_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_navigation_times_out_and_retries() {
        let session = ScriptedSession::new(vec![Step::Hang, Step::Status(200)]);
        let started = tokio::time::Instant::now();
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert_eq!(nav.status, Some(200));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_consent_dialog_is_abandoned() {
        let mut session = ScriptedSession::new(vec![Step::Status(200)]);
        session.consent_hangs = true;
        let started = tokio::time::Instant::now();
        let nav = load(&session, URL, &ExtractionConfig::default()).await;
        assert!(nav.loaded);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
