#![allow(dead_code)]

use async_trait::async_trait;
use kabar_core::{Jid, SendReceipt};
use kabar_server::config::ServerConfig;
use kabar_server::messaging::{ClientError, MessagingClient};
use kabar_server::{connect_pool, run_migrations, AppState};
use std::sync::{Arc, Mutex};

/// Client di messaggistica finto: registra gli invii, oppure li rifiuta tutti.
#[derive(Default)]
pub struct RecordingClient {
    pub sent: Mutex<Vec<(Jid, String)>>,
    pub fail: bool,
}

impl RecordingClient {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Self::default() })
    }

    pub fn sent(&self) -> Vec<(Jid, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    async fn send_text(&self, to: &Jid, body: &str) -> Result<SendReceipt, ClientError> {
        if self.fail {
            return Err(ClientError::NotConnected);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.clone(), body.to_string()));
        Ok(SendReceipt {
            id: format!("MSG{}", sent.len()),
            timestamp: "2025-11-02T10:20:30Z".to_string(),
        })
    }
}

pub async fn memory_state(client: Arc<dyn MessagingClient>) -> Arc<AppState> {
    memory_state_with(client, &ServerConfig::default()).await
}

pub async fn memory_state_with(client: Arc<dyn MessagingClient>, config: &ServerConfig) -> Arc<AppState> {
    let pool = connect_pool("sqlite::memory:").await.expect("connect");
    run_migrations(&pool).await.expect("migrate");
    Arc::new(AppState::new(pool, client, config))
}
