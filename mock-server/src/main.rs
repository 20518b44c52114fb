use mock_server::{AuthConfig, Store};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "mock_server=debug,tower_http=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = AuthConfig::default();
    let auth = AuthConfig {
        username: std::env::var("AUTH_USERNAME").unwrap_or(defaults.username),
        password: std::env::var("AUTH_PASSWORD").unwrap_or(defaults.password),
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    mock_server::run_with(listener, Store::seeded(auth)).await
}
