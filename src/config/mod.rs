use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub websocket: WebsocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketConfig {
    /// Interval between server pings in seconds (default: 5)
    pub heartbeat_interval_secs: u64,
    /// A connection silent for longer than this is dropped (default: 30)
    pub client_timeout_secs: u64,
}

impl WebsocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: parse_var("APP_PORT", "8000")?,
            },
            websocket: WebsocketConfig {
                heartbeat_interval_secs: parse_var("WS_HEARTBEAT_INTERVAL_SECS", "5")?,
                client_timeout_secs: parse_var("WS_CLIENT_TIMEOUT_SECS", "30")?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, AppError> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::Config(format!("invalid value for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.websocket.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.websocket.client_timeout(), Duration::from_secs(30));
    }
}
