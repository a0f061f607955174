pub mod jid;
pub mod message;

// Re-export per comodità
pub use jid::Jid;
pub use message::Message;
