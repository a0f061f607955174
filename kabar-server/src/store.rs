//! Message store: log durevole dei messaggi su SQLite con commit idempotente.

use kabar_core::{CommitStatus, Message};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lo store è l'unica sorgente di verità per lo storico: nessuna cache in memoria.
#[derive(Debug, Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserisce il messaggio se la tripla (sender, message, timestamp) non esiste già.
    /// Un duplicato non è un errore: ritorna `Unchanged`.
    pub async fn commit(&self, msg: &Message) -> StoreResult<CommitStatus> {
        // il conflitto sul vincolo UNIQUE è risolto da SQLite, mai riportato al chiamante
        let result = sqlx::query(
            "INSERT INTO messages (sender, message, timestamp) VALUES (?, ?, ?)
             ON CONFLICT(sender, message, timestamp) DO NOTHING",
        )
        .bind(&msg.sender)
        .bind(&msg.body)
        .bind(&msg.timestamp)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(CommitStatus::Unchanged)
        } else {
            Ok(CommitStatus::Stored)
        }
    }

    /// Copia point-in-time dello storico, in ordine crescente di timestamp.
    /// A parità di timestamp vale l'ordine di inserimento.
    pub async fn snapshot(&self) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT sender, message, timestamp FROM messages ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<Message> {
                Ok(Message {
                    sender: row.try_get("sender")?,
                    body: row.try_get("message")?,
                    timestamp: row.try_get("timestamp")?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
