//! # Engine Configuration
//!
//! Configuration for the payment QR engine.
//! The signing secret is loaded from environment variables.

use chrono::Duration;
use qr_core::{QrError, QrResult};
use std::env;

/// Minimum accepted signing secret length, in bytes
const MIN_SECRET_LEN: usize = 32;

/// Default validity window for issued intents
const DEFAULT_QR_TTL_SECS: i64 = 600;

/// Default upper bound on the settlement call to the order store
const DEFAULT_SETTLEMENT_TIMEOUT_SECS: u64 = 10;

/// Payment QR engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shared HMAC secret for QR payload signing
    pub signing_secret: String,

    /// Validity window for issued intents (`expires_at - issued_at`)
    pub qr_ttl: Duration,

    /// Upper bound on the settlement call; a timeout is treated as a
    /// retryable settlement failure, never as success
    pub settlement_timeout: std::time::Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `QR_SIGNING_SECRET` (at least 32 bytes)
    ///
    /// Optional:
    /// - `QR_TTL_SECS` (default 600)
    /// - `SETTLEMENT_TIMEOUT_SECS` (default 10)
    pub fn from_env() -> QrResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let signing_secret = env::var("QR_SIGNING_SECRET")
            .map_err(|_| QrError::Configuration("QR_SIGNING_SECRET not set".to_string()))?;

        let mut config = Self::new(signing_secret)?;

        if let Ok(raw) = env::var("QR_TTL_SECS") {
            let secs: i64 = raw.parse().map_err(|_| {
                QrError::Configuration(format!("QR_TTL_SECS is not a number: {raw}"))
            })?;
            if secs <= 0 {
                return Err(QrError::Configuration(
                    "QR_TTL_SECS must be positive".to_string(),
                ));
            }
            config.qr_ttl = Duration::seconds(secs);
        }

        if let Ok(raw) = env::var("SETTLEMENT_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                QrError::Configuration(format!("SETTLEMENT_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.settlement_timeout = std::time::Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Create config with an explicit secret and default windows
    pub fn new(signing_secret: impl Into<String>) -> QrResult<Self> {
        let signing_secret = signing_secret.into();

        if signing_secret.len() < MIN_SECRET_LEN {
            return Err(QrError::Configuration(format!(
                "QR signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            signing_secret,
            qr_ttl: Duration::seconds(DEFAULT_QR_TTL_SECS),
            settlement_timeout: std::time::Duration::from_secs(DEFAULT_SETTLEMENT_TIMEOUT_SECS),
        })
    }

    /// Builder: override the validity window (for tests)
    pub fn with_qr_ttl(mut self, ttl: Duration) -> Self {
        self.qr_ttl = ttl;
        self
    }

    /// Builder: override the settlement timeout (for tests)
    pub fn with_settlement_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new(SECRET).unwrap();
        assert_eq!(config.qr_ttl, Duration::minutes(10));
        assert_eq!(
            config.settlement_timeout,
            std::time::Duration::from_secs(10)
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = EngineConfig::new("too-short");
        assert!(matches!(result, Err(QrError::Configuration(_))));
    }

    #[test]
    fn test_from_env_missing_secret() {
        env::remove_var("QR_SIGNING_SECRET");

        let result = EngineConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new(SECRET)
            .unwrap()
            .with_qr_ttl(Duration::seconds(30))
            .with_settlement_timeout(std::time::Duration::from_millis(250));
        assert_eq!(config.qr_ttl, Duration::seconds(30));
        assert_eq!(
            config.settlement_timeout,
            std::time::Duration::from_millis(250)
        );
    }
}
