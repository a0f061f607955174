use anyhow::Context;
use axum::http::StatusCode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time::UtcOffset;

pub mod broadcast;
pub mod config;
pub mod controllers;
pub mod error;
pub mod history;
pub mod ingest;
pub mod messaging;
pub mod registry;
pub mod routes;
pub mod store;

use broadcast::Broadcaster;
use config::ServerConfig;
use history::SnapshotReader;
use ingest::IngestPipeline;
use messaging::MessagingClient;
use registry::SubscriberRegistry;
use store::MessageStore;

/// Stato condiviso tra gli handler: ogni componente è posseduto qui e passato
/// esplicitamente, niente variabili globali di processo.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub registry: Arc<SubscriberRegistry>,
    pub pipeline: IngestPipeline,
    pub history: SnapshotReader,
    /// Client di messaggistica esterno (invio verso la rete).
    pub client: Arc<dyn MessagingClient>,
    /// Limite per ogni singola write sul WebSocket.
    pub ws_write_timeout: Duration,
}

impl AppState {
    /// Collega store, registro, broadcaster e pipeline a partire dal pool già migrato.
    pub fn new(pool: SqlitePool, client: Arc<dyn MessagingClient>, config: &ServerConfig) -> Self {
        let store = MessageStore::new(pool.clone());
        let registry = Arc::new(SubscriberRegistry::new(config.ws_queue_capacity));
        let broadcaster = Broadcaster::new(registry.clone());
        let pipeline = IngestPipeline::new(
            store.clone(),
            broadcaster,
            config.own_jid.clone(),
            config.tz_offset,
        );
        Self {
            pool,
            registry,
            pipeline,
            history: SnapshotReader::new(store),
            client,
            ws_write_timeout: config.ws_write_timeout,
        }
    }
}

// Dato un percorso di file, restituisce un URL SQLite valido. Crea le directory genitrici se non esistono.
pub fn sqlite_url_for_path(p: &Path) -> anyhow::Result<String> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dirs for {:?}", parent))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&abs)
        .with_context(|| format!("create/open sqlite file {:?}", abs))?;
    let s = abs.to_string_lossy().replace('\\', "/");
    Ok(format!("sqlite:///{}", s.trim_start_matches('/')))
}

/// Risolve il valore grezzo di DATABASE_URL in un URL SQLite.
/// Accetta un percorso di file, un URL "sqlite://" oppure "sqlite::memory:".
pub fn build_sqlite_url(raw: &str) -> anyhow::Result<String> {
    if raw == "sqlite::memory:" {
        return Ok(raw.to_string());
    }
    // Rimuovi il prefisso "sqlite://" se presente, per ottenere il percorso del file.
    // sqlite:///abs/path -> /abs/path, sqlite://rel.db -> rel.db
    let path_part = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw);
    sqlite_url_for_path(&PathBuf::from(path_part))
}

// Connessione al database e creazione del pool.
pub async fn connect_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = if db_url.contains(":memory:") {
        // un database in memoria vive finché la sua unica connessione resta aperta
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_url)
            .await
    } else {
        SqlitePool::connect(db_url).await
    };
    pool.with_context(|| format!("connect to sqlite via {}", db_url))
}

// Esegue le migrazioni del database. Crea le tabelle se non esistono.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            sender    TEXT NOT NULL,
            message   TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(sender, message, timestamp)
        );"#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp, id);"#,
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );"#,
    ];
    // applica ogni statement di migrazione
    for s in &stmts {
        sqlx::query(s)
            .execute(pool)
            .await
            .with_context(|| format!("apply migration: {}", s.trim().chars().take(40).collect::<String>()))?;
    }
    Ok(())
}

/// Lega il database all'offset di visualizzazione con cui è stato creato.
///
/// L'offset fa parte della stringa timestamp, quindi della chiave di deduplica
/// e dell'ordinamento: con un offset diverso una riconsegna diventerebbe una
/// seconda riga. Il primo avvio lo registra, quelli successivi devono coincidere.
pub async fn bind_display_offset(pool: &SqlitePool, offset: UtcOffset) -> anyhow::Result<()> {
    let wanted = offset.whole_seconds().to_string();
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ('tz_offset_seconds', ?)")
        .bind(&wanted)
        .execute(pool)
        .await
        .context("record display offset")?;

    let stored: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'tz_offset_seconds'")
        .fetch_one(pool)
        .await
        .context("read display offset")?;
    if stored != wanted {
        anyhow::bail!(
            "database was created with display offset {stored}s, configured offset is {wanted}s; \
             KABAR_TZ_OFFSET_HOURS cannot change for an existing database"
        );
    }
    Ok(())
}

/// Controlla lo stato di salute del database tentando di acquisire una connessione dal pool.
pub async fn health_with_pool(pool: &SqlitePool) -> StatusCode {
    match pool.acquire().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
