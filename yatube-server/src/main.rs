use actix_web::HttpServer;
use anyhow::Context;
use tracing::info;

use yatube_server::data::memory::MemoryStore;
use yatube_server::infrastructure::config::AppConfig;
use yatube_server::infrastructure::database::{create_pool, run_migrations};
use yatube_server::infrastructure::logging::init_logging;
use yatube_server::presentation::routes::{AppState, Repositories, build_app};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let repos = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.database_max_connections)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            Repositories::postgres(pool)
        }
        None => Repositories::in_memory(MemoryStore::new()),
    };

    let bind_address = (config.host.clone(), config.port);
    let state = AppState::new(config, repos);

    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    HttpServer::new(move || build_app(state.clone()))
        .bind(bind_address)?
        .run()
        .await?;

    Ok(())
}
