use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::recipes::RecipeOrder;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// How long to keep probing the database before giving up at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DbWaitConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl DbWaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for DbWaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            max_attempts: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub recipe_order: RecipeOrder,
    pub db_wait: DbWaitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipe-api".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipe-api-users".into()),
            ttl_minutes: checked_ttl_minutes(parsed_var("JWT_TTL_MINUTES")?.unwrap_or(60 * 24))?,
        };
        let recipe_order = match std::env::var("RECIPE_ORDER") {
            Ok(v) => v
                .parse::<RecipeOrder>()
                .map_err(|e| anyhow::anyhow!("invalid RECIPE_ORDER: {e}"))?,
            Err(_) => RecipeOrder::default(),
        };
        let defaults = DbWaitConfig::default();
        let db_wait = DbWaitConfig {
            interval_secs: parsed_var("DB_WAIT_INTERVAL_SECS")?.unwrap_or(defaults.interval_secs),
            max_attempts: parsed_var("DB_WAIT_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
        };

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_var("APP_PORT")?.unwrap_or(8080),
            jwt,
            recipe_order,
            db_wait,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn checked_ttl_minutes(minutes: i64) -> anyhow::Result<i64> {
    let in_range = minutes
        .checked_mul(60)
        .is_some_and(|secs| secs > 0 && secs <= MAX_JWT_TTL_MINUTES * 60);
    if !in_range {
        anyhow::bail!("invalid JWT_TTL_MINUTES: {minutes} (expected 1..={MAX_JWT_TTL_MINUTES})");
    }
    Ok(minutes)
}

/// Reads an optional env var, failing loudly when it is set but unparsable.
fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_var_reports_bad_values() {
        std::env::set_var("RECIPE_API_TEST_PORT", "not-a-port");
        let err = parsed_var::<u16>("RECIPE_API_TEST_PORT").unwrap_err();
        assert!(err.to_string().contains("RECIPE_API_TEST_PORT"));
        std::env::remove_var("RECIPE_API_TEST_PORT");
    }

    #[test]
    fn ttl_minutes_must_be_positive_and_bounded() {
        assert_eq!(checked_ttl_minutes(60 * 24).unwrap(), 60 * 24);
        assert_eq!(checked_ttl_minutes(MAX_JWT_TTL_MINUTES).unwrap(), MAX_JWT_TTL_MINUTES);
        assert!(checked_ttl_minutes(0).is_err());
        assert!(checked_ttl_minutes(-5).is_err());
        assert!(checked_ttl_minutes(MAX_JWT_TTL_MINUTES + 1).is_err());
        let err = checked_ttl_minutes(i64::MAX).unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));
    }

    #[test]
    fn parsed_var_missing_is_none() {
        let v = parsed_var::<u16>("RECIPE_API_TEST_UNSET_VAR").unwrap();
        assert!(v.is_none());
    }
}
