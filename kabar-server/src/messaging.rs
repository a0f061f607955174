//! Seam verso il client di messaggistica esterno (pairing e protocollo di rete
//! vivono fuori da questo processo).

use async_trait::async_trait;
use kabar_core::{Jid, SendReceipt};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("messaging client is not connected")]
    NotConnected,
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway rejected send with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Invia un messaggio di testo; ritorna la ricevuta della rete.
    async fn send_text(&self, to: &Jid, body: &str) -> Result<SendReceipt, ClientError>;
}

/// Client usato quando nessun gateway è configurato: ogni invio fallisce.
#[derive(Debug, Clone, Default)]
pub struct DisconnectedClient;

#[async_trait]
impl MessagingClient for DisconnectedClient {
    async fn send_text(&self, to: &Jid, _body: &str) -> Result<SendReceipt, ClientError> {
        tracing::warn!(recipient = %to, "send attempted without a messaging gateway");
        Err(ClientError::NotConnected)
    }
}

#[derive(Debug, Serialize)]
struct GatewaySend<'a> {
    to: String,
    text: &'a str,
}

/// Inoltra gli invii a un processo gateway che mantiene la sessione dell'account
/// (`POST {base}/send`, risposta JSON `SendReceipt`).
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/send", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MessagingClient for GatewayClient {
    async fn send_text(&self, to: &Jid, body: &str) -> Result<SendReceipt, ClientError> {
        let resp = self
            .http
            .post(self.send_url())
            .json(&GatewaySend {
                to: to.to_string(),
                text: body,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let receipt = resp.json::<SendReceipt>().await?;
        tracing::info!(recipient = %to, id = %receipt.id, "message sent through gateway");
        Ok(receipt)
    }
}
