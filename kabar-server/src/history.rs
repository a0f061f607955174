use kabar_core::Message;

use crate::store::{MessageStore, StoreResult};

/// Lettura dello storico completo per i client che si connettono a metà conversazione.
/// Nessuna paginazione: restituisce tutto ciò che è committato, in ordine di timestamp.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    store: MessageStore,
}

impl SnapshotReader {
    pub fn new(store: MessageStore) -> Self {
        Self { store }
    }

    pub async fn history(&self) -> StoreResult<Vec<Message>> {
        self.store.snapshot().await
    }
}
