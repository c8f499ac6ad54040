use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};

mod domain;
mod error;
mod rest;
mod storage;

use rest::AppState;
use storage::DbConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up database");
    let connection = Arc::new(DbConnection::init().await?);

    let state = AppState::new(connection);
    let app = rest::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
