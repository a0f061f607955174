pub mod http;
pub mod ws;

// Re-export comodi
pub use http::{
    CommitStatus, EventAck, InboundEvent, ReceiveMessagesResponse, SendMessageRequest,
    SendMessageResponse, SendReceipt,
};
pub use ws::WsMessage;
