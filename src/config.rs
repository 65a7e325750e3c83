use crate::error::BridgeError;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_tls: bool,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id: String,
    pub mqtt_keepalive_secs: u64,
    pub mqtt_topics: Vec<String>,

    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_database: String,
    pub db_pool_size: u32,

    pub store_retry_max: u32,
    pub store_retry_backoff_ms: u64,
}

impl Config {
    /// Reads configuration from the environment (a `.env` file is honored).
    /// A missing or unparseable required variable is fatal before any
    /// connection is attempted.
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenv().ok();

        let mqtt_host = require("MQTT_BROKER_URL")?;
        let mqtt_port = require("MQTT_BROKER_PORT")?
            .parse::<u16>()
            .map_err(|_| invalid("MQTT_BROKER_PORT"))?;
        let mqtt_tls = env::var("MQTT_TLS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let mqtt_username = optional("MQTT_BROKER_USERNAME");
        let mqtt_password = optional("MQTT_BROKER_PASSWORD");
        let mqtt_client_id = optional("MQTT_CLIENT_ID")
            .unwrap_or_else(|| format!("databridge-{}", std::process::id()));
        let mqtt_keepalive_secs: u64 = parse_or("MQTT_KEEPALIVE_SECS", 30)?;

        let mqtt_topics = split_topics(&require("MQTT_TOPICS")?);
        if mqtt_topics.is_empty() {
            return Err(BridgeError::ConfigurationMissing(
                "MQTT_TOPICS contains no topic filters".to_string(),
            ));
        }

        let db_host = require("DB_HOST")?;
        let db_port = require("DB_PORT")?
            .parse::<u16>()
            .map_err(|_| invalid("DB_PORT"))?;
        let db_user = require("DB_USER")?;
        let db_password = require("DB_PASSWORD")?;
        let db_database = require("DB_DATABASE")?;
        let db_pool_size: u32 = parse_or("DB_POOL_SIZE", 10)?;

        let store_retry_max: u32 = parse_or("BRIDGE_STORE_RETRY_MAX", 5)?;
        let store_retry_backoff_ms: u64 = parse_or("BRIDGE_STORE_RETRY_BACKOFF_MS", 500)?;

        Ok(Self {
            mqtt_host,
            mqtt_port,
            mqtt_tls,
            mqtt_username,
            mqtt_password,
            mqtt_client_id,
            mqtt_keepalive_secs,
            mqtt_topics,
            db_host,
            db_port,
            db_user,
            db_password,
            db_database,
            db_pool_size,
            store_retry_max,
            store_retry_backoff_ms,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_database
        )
    }

    pub fn mqtt_keepalive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keepalive_secs)
    }

    pub fn store_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.store_retry_backoff_ms)
    }
}

fn split_topics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn require(key: &str) -> Result<String, BridgeError> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BridgeError::ConfigurationMissing(key.to_string()))
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, BridgeError> {
    match optional(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| invalid(key)),
        None => Ok(default),
    }
}

fn invalid(key: &str) -> BridgeError {
    BridgeError::ConfigurationMissing(format!("{key} is not a valid number"))
}

#[cfg(test)]
mod tests {
    use super::split_topics;

    #[test]
    fn splits_comma_separated_topic_filters() {
        let topics = split_topics("LinkForge/+/+/+/+/dev/+/telemetry, LinkForge/7/#");
        assert_eq!(
            topics,
            vec![
                "LinkForge/+/+/+/+/dev/+/telemetry".to_string(),
                "LinkForge/7/#".to_string(),
            ]
        );
    }

    #[test]
    fn drops_empty_entries() {
        assert!(split_topics(" , ,").is_empty());
        assert_eq!(split_topics("a,,b").len(), 2);
    }

    #[test]
    fn rejects_numbers_out_of_the_target_range() {
        std::env::set_var("DATABRIDGE_TEST_PARSE_POOL_SIZE", "5000000000");
        let result: Result<u32, _> = super::parse_or("DATABRIDGE_TEST_PARSE_POOL_SIZE", 10);
        assert!(result.is_err());
        std::env::remove_var("DATABRIDGE_TEST_PARSE_POOL_SIZE");

        let fallback: u32 =
            super::parse_or("DATABRIDGE_TEST_PARSE_UNSET", 10).expect("default applies");
        assert_eq!(fallback, 10);
    }
}
