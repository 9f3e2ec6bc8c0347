//! HTTP server for the exchange.
//!
//! Endpoints: health, deposit/withdraw, create/cancel order, order/market/
//! balance reads, admin fee configuration. State is optionally restored from
//! `SNAPSHOT_PATH` at startup.

use dex_matching_engine::api;
use dex_matching_engine::auth::AuthConfig;
use dex_matching_engine::{Exchange, FilePersistence};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let _ = env_logger::try_init();
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let exchange = match std::env::var("SNAPSHOT_PATH") {
        Ok(path) => {
            let persistence = FilePersistence::new(&path);
            match persistence.load() {
                Ok(Some(snapshot)) => {
                    eprintln!("restored state from {}", path);
                    Exchange::from_snapshot(
                        snapshot,
                        Arc::new(dex_matching_engine::events::LogEventSink),
                    )
                }
                Ok(None) => Exchange::new(),
                Err(e) => {
                    eprintln!("failed to load snapshot from {}: {}", path, e);
                    std::process::exit(1);
                }
            }
        }
        Err(_) => Exchange::new(),
    };

    let app = api::create_router_with(exchange, AuthConfig::from_env());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    eprintln!("listening on http://{}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .expect("serve");
}
