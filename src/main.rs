use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Fails closed when the signing secret is absent.
    let config = vetdesk::config::AppConfig::from_env()?;

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "vetdesk",
        "vetdesk starting: RUST_LOG='{}', http_port={}, token_ttl_secs={}",
        rust_log, config.http_port, config.token_ttl_secs
    );

    vetdesk::server::run(config).await
}
