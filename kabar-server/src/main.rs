use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ri-utilizziamo le funzioni e strutture definite in lib.rs
use kabar_server::config::ServerConfig;
use kabar_server::messaging::{DisconnectedClient, GatewayClient, MessagingClient};
use kabar_server::{bind_display_offset, build_sqlite_url, connect_pool, routes, run_migrations, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env().context("load configuration")?;

    // Costruisci l'URL del database SQLite
    let db_url = build_sqlite_url(&config.database_url).context("build sqlite DATABASE_URL")?;
    tracing::info!(database_url = %db_url, "using database");
    // Connetti al database ed esegui le migrazioni
    let pool = connect_pool(&db_url).await.context("connect to sqlite")?;
    run_migrations(&pool).await.context("run migrations")?;
    bind_display_offset(&pool, config.tz_offset).await?;

    let client: Arc<dyn MessagingClient> = match &config.gateway_url {
        Some(url) => {
            tracing::info!(gateway = %url, "forwarding sends to messaging gateway");
            Arc::new(GatewayClient::new(url.clone()))
        }
        None => {
            tracing::warn!("KABAR_GATEWAY_URL not set, outbound sends will fail until a gateway is configured");
            Arc::new(DisconnectedClient)
        }
    };

    // Crea lo stato dell'applicazione condiviso e le rotte
    let state = Arc::new(AppState::new(pool, client, &config));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("bind tcp listener")?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
