use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use vibe_fortune::{
    config::config_loader, infrastructure::axum_http::http_serve,
    infrastructure::postgres::postgres_connection, observability,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Server exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability()?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    http_serve::start(Arc::new(dotenvy_env), Arc::new(postgres_pool)).await?;

    Ok(())
}
