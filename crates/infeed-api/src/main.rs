//! Binary entrypoint for the Infeed API server.
use infeed_api::{run, ServiceConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config path from INFEED_CONFIG, listen address overridable with INFEED_ADDR
    let config = ServiceConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(config).await
}
