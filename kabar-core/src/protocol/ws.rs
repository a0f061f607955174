/* Questo file definisce come i dati "viaggiano" sul web socket.
    WsMessage è l'envelope { type, payload }. Il canale è solo server -> client:
    Message -> nuovo messaggio committato nello store
    Eventuali frame inviati dal client vengono letti e scartati.
*/
use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Messaggio WS con envelope { type, payload }.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    /// Server → Client: evento di nuovo messaggio.
    #[serde(rename = "message")]
    Message(Message),
}
