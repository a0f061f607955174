//! Pipeline di ingest: normalizza gli input in un `Message` canonico,
//! lo committa nello store e avvia il fan-out.

use kabar_core::{canonical_timestamp, CommitStatus, InboundEvent, Jid, Message, TimestampError};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

use crate::broadcast::Broadcaster;
use crate::store::{MessageStore, StoreError};

/// Le due origini possibili di un messaggio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Evento consegnato dal client di messaggistica esterno.
    External(InboundEvent),
    /// Invio originato localmente e già accettato dalla rete.
    LocalSend { body: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mapping esaustivo origine -> messaggio canonico.
///
/// `now` è l'istante di commit, usato solo per gli invii locali.
pub fn canonicalize(
    inbound: Inbound,
    own_jid: &Jid,
    offset: UtcOffset,
    now: OffsetDateTime,
) -> Result<Message, TimestampError> {
    let msg = match inbound {
        Inbound::External(event) => Message {
            sender: event.sender.to_string(),
            body: event.conversation.unwrap_or_default(),
            timestamp: canonical_timestamp(event.timestamp, offset)?,
        },
        Inbound::LocalSend { body } => Message {
            sender: own_jid.to_string(),
            body,
            timestamp: canonical_timestamp(now, offset)?,
        },
    };
    Ok(msg)
}

#[derive(Debug, Clone)]
pub struct IngestPipeline {
    store: MessageStore,
    broadcaster: Broadcaster,
    own_jid: Jid,
    offset: UtcOffset,
}

impl IngestPipeline {
    pub fn new(store: MessageStore, broadcaster: Broadcaster, own_jid: Jid, offset: UtcOffset) -> Self {
        Self {
            store,
            broadcaster,
            own_jid,
            offset,
        }
    }

    pub fn own_jid(&self) -> &Jid {
        &self.own_jid
    }

    /// Normalizza, committa e pubblica un singolo input.
    ///
    /// Anche un commit `Unchanged` viene ripubblicato: i subscriber tollerano
    /// consegne duplicate. Un errore dello store non viene pubblicato.
    pub async fn ingest(&self, inbound: Inbound) -> Result<(CommitStatus, Message), IngestError> {
        let msg = canonicalize(inbound, &self.own_jid, self.offset, OffsetDateTime::now_utc())?;

        let status = match self.store.commit(&msg).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(sender = %msg.sender, timestamp = %msg.timestamp, error = %e, "failed to persist message");
                return Err(e.into());
            }
        };

        match status {
            CommitStatus::Stored => {
                tracing::info!(sender = %msg.sender, timestamp = %msg.timestamp, "message stored")
            }
            CommitStatus::Unchanged => {
                tracing::debug!(sender = %msg.sender, timestamp = %msg.timestamp, "duplicate message ignored")
            }
        }

        self.broadcaster.publish(&msg);
        Ok((status, msg))
    }

    /// Percorso per gli eventi consegnati dal client esterno.
    pub async fn ingest_event(&self, event: InboundEvent) -> Result<(CommitStatus, Message), IngestError> {
        self.ingest(Inbound::External(event)).await
    }

    /// Percorso per un invio locale riuscito: la copia speculare entra nello storico.
    pub async fn record_local_send(&self, body: impl Into<String>) -> Result<(CommitStatus, Message), IngestError> {
        self.ingest(Inbound::LocalSend { body: body.into() }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn own() -> Jid {
        Jid::new("6285123945816", "s.whatsapp.net")
    }

    #[test]
    fn external_event_uses_event_fields() {
        let event = InboundEvent {
            sender: Jid::new("628111", "s.whatsapp.net"),
            timestamp: datetime!(2025-11-02 10:00:00 UTC),
            conversation: Some("hi".to_string()),
        };
        let msg = canonicalize(
            Inbound::External(event),
            &own(),
            offset!(+7),
            datetime!(2030-01-01 00:00:00 UTC),
        )
        .unwrap();

        assert_eq!(msg.sender, "628111@s.whatsapp.net");
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.timestamp, "2025-11-02T17:00:00.000000000+07:00");
    }

    #[test]
    fn external_event_without_text_has_empty_body() {
        let event = InboundEvent {
            sender: Jid::new("628111", "s.whatsapp.net"),
            timestamp: datetime!(2025-11-02 10:00:00 UTC),
            conversation: None,
        };
        let msg = canonicalize(Inbound::External(event), &own(), offset!(+7), OffsetDateTime::now_utc()).unwrap();
        assert_eq!(msg.body, "");
    }

    #[test]
    fn local_send_uses_own_identity_and_commit_time() {
        let msg = canonicalize(
            Inbound::LocalSend { body: "hello".to_string() },
            &own(),
            offset!(+7),
            datetime!(2025-11-02 23:30:00.25 UTC),
        )
        .unwrap();

        assert_eq!(msg.sender, "6285123945816@s.whatsapp.net");
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.timestamp, "2025-11-03T06:30:00.250000000+07:00");
    }

    #[test]
    fn event_beyond_representable_range_is_an_error() {
        let event = InboundEvent {
            sender: Jid::new("628111", "s.whatsapp.net"),
            timestamp: datetime!(9999-12-31 23:00:00 UTC),
            conversation: Some("hi".to_string()),
        };
        let err = canonicalize(Inbound::External(event), &own(), offset!(+7), OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, TimestampError::OutOfRange(_)));
    }
}
