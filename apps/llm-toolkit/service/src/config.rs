use std::env;
use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_AUTH_SIGNING_KEY: &str = "your-secret-key-change-in-production";
const DEFAULT_AUTH_TOKEN_ISSUER: &str = "llm-toolkit";
const DEFAULT_AUTH_ACCESS_TTL_MINUTES: i64 = 60 * 24 * 7;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_BUCKET_PREFIX: &str = "llm-toolkit";
const DEFAULT_DATASET_BUCKET: &str = "llm-toolkit-datasets";
const DEFAULT_ARTIFACT_BUCKET: &str = "llm-toolkit-artifacts";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub log_json: bool,
    pub auth_signing_key: String,
    pub auth_token_issuer: String,
    pub auth_access_ttl_minutes: i64,
    pub password_hash_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub default_region: String,
    pub bucket_prefix: String,
    pub dataset_bucket: String,
    pub artifact_bucket: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid LT_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env_or_default("LT_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter = env_or_default("LT_LOG_FILTER", DEFAULT_LOG_FILTER);

        let log_json = env::var("LT_LOG_FORMAT")
            .ok()
            .map(|value| value.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let auth_signing_key = env_or_default("LT_AUTH_SIGNING_KEY", DEFAULT_AUTH_SIGNING_KEY);
        let auth_token_issuer = env_or_default("LT_AUTH_TOKEN_ISSUER", DEFAULT_AUTH_TOKEN_ISSUER);

        let auth_access_ttl_minutes = env::var("LT_AUTH_ACCESS_TTL_MINUTES")
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_AUTH_ACCESS_TTL_MINUTES);

        let password_hash_cost = env::var("LT_PASSWORD_HASH_COST")
            .ok()
            .and_then(|value| value.trim().parse::<u32>().ok())
            .map(|value| value.clamp(4, 31))
            .unwrap_or(bcrypt::DEFAULT_COST);

        let cors_allowed_origins =
            parse_csv(env_or_default("LT_CORS_ORIGINS", DEFAULT_CORS_ORIGINS));

        let default_region = env_or_default("LT_DEFAULT_REGION", DEFAULT_REGION);
        let bucket_prefix = env_or_default("LT_BUCKET_PREFIX", DEFAULT_BUCKET_PREFIX);
        let dataset_bucket = env_or_default("LT_DATASET_BUCKET", DEFAULT_DATASET_BUCKET);
        let artifact_bucket = env_or_default("LT_ARTIFACT_BUCKET", DEFAULT_ARTIFACT_BUCKET);

        Ok(Self {
            bind_addr,
            log_filter,
            log_json,
            auth_signing_key,
            auth_token_issuer,
            auth_access_ttl_minutes,
            password_hash_cost,
            cors_allowed_origins,
            default_region,
            bucket_prefix,
            dataset_bucket,
            artifact_bucket,
        })
    }
}

#[cfg(test)]
impl Config {
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            log_json: false,
            auth_signing_key: "llm-toolkit-test-signing-key".to_string(),
            auth_token_issuer: "llm-toolkit-test".to_string(),
            auth_access_ttl_minutes: DEFAULT_AUTH_ACCESS_TTL_MINUTES,
            password_hash_cost: 4,
            cors_allowed_origins: parse_csv(DEFAULT_CORS_ORIGINS.to_string()),
            default_region: DEFAULT_REGION.to_string(),
            bucket_prefix: DEFAULT_BUCKET_PREFIX.to_string(),
            dataset_bucket: DEFAULT_DATASET_BUCKET.to_string(),
            artifact_bucket: DEFAULT_ARTIFACT_BUCKET.to_string(),
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_csv(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_csv};

    #[test]
    fn test_fixture_uses_cheap_hashing_and_ephemeral_port() {
        let config = Config::for_tests();
        assert_eq!(config.bind_addr.port(), 0);
        assert_eq!(config.password_hash_cost, 4);
        assert_eq!(config.auth_access_ttl_minutes, 10_080);
        assert_eq!(config.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn parse_csv_drops_blank_segments() {
        let parsed = parse_csv(" http://a.test , ,http://b.test,".to_string());
        assert_eq!(parsed, vec!["http://a.test", "http://b.test"]);
    }
}
