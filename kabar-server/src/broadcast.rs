//! Fan-out dei messaggi committati verso tutti i subscriber connessi.

use std::sync::Arc;

use kabar_core::Message;
use tokio::sync::mpsc::error::TrySendError;

use crate::registry::{SubscriberRegistry, Visit};

/// Esito di una `publish`: quanti subscriber hanno ricevuto il messaggio in coda
/// e quanti sono stati rimossi per consegna fallita.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// Consegna `msg` a ogni membro del registro al momento della chiamata.
    ///
    /// L'enqueue è non bloccante: una coda piena (client che non drena) o chiusa
    /// (writer terminato) è una consegna fallita e il subscriber viene rimosso subito.
    /// La chiamata completa sempre, indipendentemente dai singoli esiti.
    pub fn publish(&self, msg: &Message) -> PublishReport {
        let shared = Arc::new(msg.clone());
        let mut report = PublishReport::default();

        self.registry.for_each(|id, tx| match tx.try_send(Arc::clone(&shared)) {
            Ok(()) => {
                report.delivered += 1;
                Visit::Keep
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = %id, "subscriber queue full, dropping subscriber");
                report.dropped += 1;
                Visit::Remove
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(subscriber = %id, "subscriber transport closed, dropping subscriber");
                report.dropped += 1;
                Visit::Remove
            }
        });

        tracing::debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            "message published"
        );
        report
    }
}
