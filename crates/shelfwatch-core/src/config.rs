use rust_decimal::Decimal;

use crate::app_config::{AppConfig, ExtractionConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function,
/// so parsing can be tested with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = ExtractionConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| {
            raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| {
            raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_decimal = |var: &str, default: Decimal| -> Result<Decimal, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| {
            raw.parse::<Decimal>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        })
    };

    let database_url = lookup("DATABASE_URL").ok();
    let log_level = or_default("SHELFWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SHELFWATCH_DB_MAX_CONNECTIONS", 10)?;
    let db_min_connections = parse_u32("SHELFWATCH_DB_MIN_CONNECTIONS", 1)?;
    let db_acquire_timeout_secs = parse_u64("SHELFWATCH_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

    let price_min = parse_decimal("SHELFWATCH_PRICE_MIN", defaults.price_min)?;
    let price_max = parse_decimal("SHELFWATCH_PRICE_MAX", defaults.price_max)?;
    if price_min >= price_max {
        return Err(invalid(
            "SHELFWATCH_PRICE_MAX",
            format!("must be greater than SHELFWATCH_PRICE_MIN ({price_min})"),
        ));
    }

    let default_currency =
        or_default("SHELFWATCH_DEFAULT_CURRENCY", &defaults.default_currency).to_ascii_uppercase();
    if default_currency.len() != 3 || !default_currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(
            "SHELFWATCH_DEFAULT_CURRENCY",
            format!("\"{default_currency}\" is not a three-letter currency code"),
        ));
    }

    let settle_min_ms = parse_u64("SHELFWATCH_SETTLE_MIN_MS", defaults.settle_min_ms)?;
    let settle_max_ms = parse_u64("SHELFWATCH_SETTLE_MAX_MS", defaults.settle_max_ms)?;
    if settle_min_ms > settle_max_ms {
        return Err(invalid(
            "SHELFWATCH_SETTLE_MAX_MS",
            format!("must not be less than SHELFWATCH_SETTLE_MIN_MS ({settle_min_ms})"),
        ));
    }

    let extraction = ExtractionConfig {
        price_min,
        price_max,
        default_currency,
        cooldown_secs: parse_u64("SHELFWATCH_COOLDOWN_SECS", defaults.cooldown_secs)?,
        nav_attempts: parse_u32("SHELFWATCH_NAV_ATTEMPTS", defaults.nav_attempts)?,
        nav_backoff_base_ms: parse_u64(
            "SHELFWATCH_NAV_BACKOFF_BASE_MS",
            defaults.nav_backoff_base_ms,
        )?,
        nav_timeout_secs: parse_u64("SHELFWATCH_NAV_TIMEOUT_SECS", defaults.nav_timeout_secs)?,
        consent_timeout_secs: parse_u64(
            "SHELFWATCH_CONSENT_TIMEOUT_SECS",
            defaults.consent_timeout_secs,
        )?,
        settle_min_ms,
        settle_max_ms,
        user_agent: or_default("SHELFWATCH_USER_AGENT", &defaults.user_agent),
        chrome_path: lookup("SHELFWATCH_CHROME_PATH").ok(),
        headless: parse_bool("SHELFWATCH_HEADLESS", defaults.headless)?,
    };

    Ok(AppConfig {
        database_url,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        extraction,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
