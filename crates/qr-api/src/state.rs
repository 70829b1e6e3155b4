//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment QR engine, the demo order book, and configuration.

use crate::orders::{InMemoryOrderStore, OrderBook};
use qr_core::SharedOrderStore;
use qr_engine::{EngineConfig, PaymentQrEngine};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Seconds between expiry sweep passes
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Interval between expiry sweep passes
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment QR engine
    pub engine: Arc<PaymentQrEngine>,
    /// Demo order book (the engine's order store collaborator)
    pub orders: Arc<InMemoryOrderStore>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the AppState from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let orders = Arc::new(load_order_book()?);

        let engine_config = EngineConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize engine: {}", e))?;
        let order_store: SharedOrderStore = orders.clone();
        let engine = Arc::new(PaymentQrEngine::new(engine_config, order_store));

        Ok(Self {
            engine,
            orders,
            config,
        })
    }
}

/// Load the demo order book from config file
fn load_order_book() -> anyhow::Result<InMemoryOrderStore> {
    let config_paths = [
        "config/orders.toml",
        "../config/orders.toml",
        "../../config/orders.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let book: OrderBook = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            let store = InMemoryOrderStore::from_seed(book);
            tracing::info!("Loaded {} orders from {}", store.len(), path);
            return Ok(store);
        }
    }

    tracing::warn!("No order book found, starting with an empty order store");
    Ok(InMemoryOrderStore::new())
}
