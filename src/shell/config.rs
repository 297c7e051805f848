// Application configuration read from the process environment.
//
// Variables
// - MONGODB_HOST, MONGODB_PORT (required)
// - MONGODB_USER, MONGODB_PASSWORD (empty when unset)
// - CONNECT_MAX_ATTEMPTS, CONNECT_INITIAL_DELAY_MS (retry policy overrides)
// - CARD_STORE_BACKEND: `remote` (default) or `in_memory`

use crate::shared::infrastructure::connection::ConnectionParameters;
use crate::shared::infrastructure::connection::retry_policy::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DATABASE_NAME: &str = "shinkansen-travel";
pub const CARD_COLLECTION_NAME: &str = "card";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStoreBackend {
    Remote,
    InMemory,
}

impl FromStr for CardStoreBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, ()> {
        match value {
            "remote" => Ok(CardStoreBackend::Remote),
            "in_memory" => Ok(CardStoreBackend::InMemory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionParameters,
    pub retry_policy: RetryPolicy,
    pub card_store: CardStoreBackend,
    pub database_name: String,
    pub collection_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let defaults = RetryPolicy::default();

        let connection = ConnectionParameters {
            host: required("MONGODB_HOST")?,
            port: parse("MONGODB_PORT", required("MONGODB_PORT")?)?,
            username: lookup("MONGODB_USER").unwrap_or_default(),
            password: lookup("MONGODB_PASSWORD").unwrap_or_default(),
        };
        let retry_policy = RetryPolicy {
            max_attempts: match lookup("CONNECT_MAX_ATTEMPTS") {
                Some(value) => parse_positive("CONNECT_MAX_ATTEMPTS", value)?,
                None => defaults.max_attempts,
            },
            initial_delay: match lookup("CONNECT_INITIAL_DELAY_MS") {
                Some(value) => Duration::from_millis(parse("CONNECT_INITIAL_DELAY_MS", value)?),
                None => defaults.initial_delay,
            },
            multiplier: defaults.multiplier,
        };
        let card_store = match lookup("CARD_STORE_BACKEND") {
            Some(value) => parse("CARD_STORE_BACKEND", value)?,
            None => CardStoreBackend::Remote,
        };

        Ok(Self {
            connection,
            retry_policy,
            card_store,
            database_name: DATABASE_NAME.to_string(),
            collection_name: CARD_COLLECTION_NAME.to_string(),
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::Invalid { name, value }),
    }
}

fn parse_positive(name: &'static str, value: String) -> Result<u32, ConfigError> {
    match parse::<u32>(name, value.clone())? {
        0 => Err(ConfigError::Invalid { name, value }),
        parsed => Ok(parsed),
    }
}
