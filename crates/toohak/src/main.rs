//! Server binary: reads the listen address from the environment and
//! runs until terminated.

use toohak::ToohakServer;

/// `TOOHAK_ADDR` wins when set; otherwise `PORT` on all interfaces,
/// defaulting to 3000.
fn listen_addr() -> String {
    if let Ok(addr) = std::env::var("TOOHAK_ADDR") {
        return addr;
    }
    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(3000);
    format!("0.0.0.0:{port}")
}

#[tokio::main]
async fn main() -> Result<(), toohak::ToohakError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let server = ToohakServer::builder().bind(&listen_addr()).build().await?;
    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "toohak listening");
    }
    server.run().await
}
