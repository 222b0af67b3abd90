use anyhow::{bail, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firebase,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirebaseCredential {
    /// Legacy database secret, sent as `auth=`.
    DatabaseSecret(String),
    /// OAuth2 access token, sent as `access_token=`.
    AccessToken(String),
}

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub reconnect: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub serial: SerialSettings,
    pub alert_debounce: Option<Duration>,
    pub store_backend: StoreBackend,
    pub firebase_database_url: Option<String>,
    pub firebase_credential: Option<FirebaseCredential>,
    pub shutdown_grace: Duration,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("SERIAL_PORT").unwrap_or_else(|| "/dev/ttyUSB0".to_string());
        let baud_rate = var("SERIAL_BAUD_RATE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(9600);
        let reconnect = var("SERIAL_RECONNECT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let alert_debounce = var("ALERT_DEBOUNCE_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let store_backend = match var("REMOTE_STORE")
            .unwrap_or_else(|| "firebase".to_string())
            .to_lowercase()
            .as_str()
        {
            "firebase" => StoreBackend::Firebase,
            "memory" => StoreBackend::Memory,
            other => bail!("Unknown REMOTE_STORE '{}', expected 'firebase' or 'memory'", other),
        };

        let firebase_database_url = var("FIREBASE_DATABASE_URL");
        let firebase_credential = match (
            var("FIREBASE_ACCESS_TOKEN"),
            var("FIREBASE_DATABASE_SECRET"),
        ) {
            (Some(token), _) => Some(FirebaseCredential::AccessToken(token)),
            (None, Some(secret)) => Some(FirebaseCredential::DatabaseSecret(secret)),
            (None, None) => None,
        };

        let shutdown_grace = Duration::from_secs(
            var("SHUTDOWN_GRACE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        );

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            serial: SerialSettings {
                port,
                baud_rate,
                reconnect,
            },
            alert_debounce,
            store_backend,
            firebase_database_url,
            firebase_credential,
            shutdown_grace,
            log_level,
        })
    }
}
