use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::{Jid, Message};
/*
    http dto per le richieste http
*/
// Send message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Numero di telefono nudo, il server viene aggiunto lato bridge.
    pub recipient: String,
    pub message: String,
}

/// Ricevuta restituita dal client di messaggistica dopo un invio riuscito.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: String,
    pub response: SendReceipt,
    /// false se l'invio è riuscito ma la copia locale non è stata salvata.
    pub recorded: bool,
}

// Receive message: lista ordinata oppure marcatore esplicito di storico vuoto
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiveMessagesResponse {
    Messages { received_messages: Vec<Message> },
    Empty { message: String },
}

impl ReceiveMessagesResponse {
    pub const EMPTY_MARKER: &'static str = "No received messages";

    pub fn from_history(messages: Vec<Message>) -> Self {
        if messages.is_empty() {
            Self::Empty {
                message: Self::EMPTY_MARKER.to_string(),
            }
        } else {
            Self::Messages {
                received_messages: messages,
            }
        }
    }
}

/// Evento di messaggio consegnato dal client di messaggistica esterno.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender: Jid,
    /// Istante registrato dalla rete (RFC3339, qualsiasi offset).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Testo del messaggio; assente per eventi senza payload testuale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
}

/// Esito del commit idempotente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitStatus {
    #[serde(rename = "stored")]
    Stored,
    #[serde(rename = "unchanged")]
    Unchanged,
}

/// Risposta a POST /events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAck {
    pub status: CommitStatus,
    pub message: Message,
}
