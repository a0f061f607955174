//! kabar-core: tipi condivisi tra server e client (messaggio canonico, DTO HTTP, messaggi WS, errori, JID).
//! Niente I/O.

pub mod error;
pub mod models;
pub mod protocol;
pub mod utils;

// Re-export utili per ridurre i percorsi nel crate server
pub use error::Error;
pub use models::{jid::Jid, jid::JidError, message::Message};
pub use protocol::http::{
    CommitStatus, EventAck, InboundEvent, ReceiveMessagesResponse, SendMessageRequest,
    SendMessageResponse, SendReceipt,
};
pub use protocol::ws::WsMessage;
pub use utils::{canonical_timestamp, display_offset, TimestampError, DEFAULT_OFFSET_HOURS};
