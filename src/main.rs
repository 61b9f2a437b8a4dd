use log::{error, info, warn};
use std::sync::Arc;

use prepserver::config::AppConfig;
use prepserver::main_module::run_axum_server;
use prepserver::practice_test::templates::TestTemplates;
use prepserver::security::TokenVerifier;
use prepserver::shared::state::AppState;
use prepserver::shared::utils::create_pool;
use prepserver::store::postgres::run_migrations;
use prepserver::store::{PgStore, Repositories};
use prepserver::taxonomy::Taxonomy;

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let repos = match &config.database {
        Some(db) => {
            let pool = create_pool(db)?;
            run_migrations(&pool)?;
            info!("Connected to PostgreSQL ({} max connections)", db.max_connections);
            Repositories::postgres(PgStore::new(pool, db.query_timeout))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Repositories::in_memory()
        }
    };

    let templates = match &config.test_templates_path {
        Some(path) => TestTemplates::load_from_file(path)?,
        None => TestTemplates::default(),
    };

    Ok(AppState::new(
        repos,
        Taxonomy::standard(),
        TokenVerifier::new(&config.jwt_secret),
    )
    .with_templates(templates))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    if config.jwt_secret_is_default {
        warn!("JWT_SECRET not set, using the development secret");
    }

    let state = match build_state(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Startup failed: {e:#}");
            return Err(e);
        }
    };

    run_axum_server(state, &config.server, &config.bind_address()).await?;
    info!("Server stopped");
    Ok(())
}
