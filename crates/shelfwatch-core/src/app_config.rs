use rust_decimal::Decimal;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Tunables for a single extraction attempt and for refresh coordination.
///
/// The price bound and default currency describe the one storefront this
/// deployment targets; they are configuration rather than constants so other
/// storefronts can be pointed at without a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Exclusive lower bound for an accepted price.
    pub price_min: Decimal,
    /// Exclusive upper bound for an accepted price.
    pub price_max: Decimal,
    pub default_currency: String,
    pub cooldown_secs: u64,
    /// Guarded navigation attempts before the final unguarded one.
    pub nav_attempts: u32,
    pub nav_backoff_base_ms: u64,
    pub nav_timeout_secs: u64,
    pub consent_timeout_secs: u64,
    pub settle_min_ms: u64,
    pub settle_max_ms: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
    pub headless: bool,
}

impl ExtractionConfig {
    /// Returns `true` when `price` lies strictly inside the sanity bound.
    #[must_use]
    pub fn price_in_bounds(&self, price: Decimal) -> bool {
        price > self.price_min && price < self.price_max
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            price_min: Decimal::ZERO,
            price_max: Decimal::from(2000),
            default_currency: "GBP".to_string(),
            cooldown_secs: 15,
            nav_attempts: 3,
            nav_backoff_base_ms: 500,
            nav_timeout_secs: 60,
            consent_timeout_secs: 3,
            settle_min_ms: 120,
            settle_max_ms: 320,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            headless: true,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only required by commands that touch Postgres.
    pub database_url: Option<String>,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub extraction: ExtractionConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("extraction", &self.extraction)
            .finish()
    }
}
