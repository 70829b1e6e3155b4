//! # QR-Settle RS
//!
//! Signed QR payment intent issuance and verification service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export QR_SIGNING_SECRET=<at least 32 bytes>
//!
//! # Run the server
//! qr-settle
//! ```

use qr_api::{routes, state::AppState};
use qr_engine::run_expiry_sweep;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Orders loaded: {}", state.orders.len());
    info!(
        "Expiry sweep every {}s",
        state.config.sweep_interval_secs
    );

    // Background expiry sweep
    tokio::spawn(run_expiry_sweep(
        state.engine.clone(),
        state.config.sweep_interval(),
    ));

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🚀 QR-Settle starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("🧾 Issue: POST http://{}/api/v1/qr", addr);
        info!("🔔 Callback: POST http://{}/webhook/gateway", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  ▦ QR-Settle RS ▦
  ━━━━━━━━━━━━━━━━━━━━━━━
  Signed QR payment intents
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
