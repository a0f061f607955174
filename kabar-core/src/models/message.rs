use serde::{Deserialize, Serialize};

/// Messaggio canonico: persistito nello store e notificato via WS.
///
/// La tripla (sender, body, timestamp) è l'identità logica del messaggio:
/// due ingest con la stessa tripla sono lo stesso messaggio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    /// Sul wire il testo viaggia come "message".
    #[serde(rename = "message")]
    pub body: String,
    pub timestamp: String, // canonico, vedi utils::time
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp: timestamp.into(),
        }
    }
}
