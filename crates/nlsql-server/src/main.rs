//! NL2SQL server binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use nlsql_server::{build_app_state, Server, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "nlsql_server=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("nlsql-server v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env()?;
    settings.validate().map_err(anyhow::Error::msg)?;

    let bind_addr = settings.bind_addr.clone();
    let state = build_app_state(&settings).await?;

    Server::new(bind_addr, state).serve().await?;
    Ok(())
}
