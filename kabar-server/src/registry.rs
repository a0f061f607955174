//! Registro dei subscriber WebSocket attualmente connessi.
//!
//! Ogni subscriber è rappresentato dal lato `Sender` della sua coda di uscita:
//! la scrittura vera sul socket avviene nel task writer della connessione,
//! quindi nessun lock del registro viene mai tenuto durante una write di rete.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use kabar_core::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identità di un push transport registrato.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub type SubscriberTx = mpsc::Sender<Arc<Message>>;

/// Handle restituito da `add`: l'id per la rimozione e la coda da cui il writer legge.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Arc<Message>>,
}

/// Esito di una visita di `for_each`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    /// Il subscriber visitato viene rimosso in modo atomico rispetto all'iterazione.
    Remove,
}

pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, SubscriberTx>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Registra un nuovo transport e restituisce la sua coda di uscita.
    pub fn add(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = SubscriberId::new();
        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber = %id, "subscriber registered");
        Subscription { id, rx }
    }

    /// Deregistra un transport. Idempotente: ritorna false se era già rimosso.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    /// Visita ogni subscriber registrato esattamente una volta.
    ///
    /// `visit` non deve bloccare: viene eseguito con lo shard del membro corrente bloccato.
    /// Un `remove` concorrente completato prima della visita esclude il membro dall'iterazione.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(SubscriberId, &SubscriberTx) -> Visit,
    {
        self.subscribers
            .retain(|id, tx| visit(*id, tx) == Visit::Keep);
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.subscribers.len())
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn add_and_remove() {
        let registry = SubscriberRegistry::new(4);
        let a = registry.add();
        let b = registry.add();
        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(a.id));
        assert!(!registry.contains(a.id));
        assert!(registry.contains(b.id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = SubscriberRegistry::new(4);
        let a = registry.add();
        assert!(registry.remove(a.id));
        assert!(!registry.remove(a.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn for_each_visits_every_member_once() {
        let registry = SubscriberRegistry::new(4);
        let subs: Vec<_> = (0..10).map(|_| registry.add()).collect();

        let mut seen = Vec::new();
        registry.for_each(|id, _| {
            seen.push(id);
            Visit::Keep
        });

        assert_eq!(seen.len(), 10);
        let unique: HashSet<_> = seen.iter().copied().collect();
        let expected: HashSet<_> = subs.iter().map(|s| s.id).collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn for_each_can_remove_the_visited_member() {
        let registry = SubscriberRegistry::new(4);
        let subs: Vec<_> = (0..6).map(|_| registry.add()).collect();
        let doomed: HashSet<_> = subs.iter().step_by(2).map(|s| s.id).collect();

        let mut visits = 0;
        registry.for_each(|id, _| {
            visits += 1;
            if doomed.contains(&id) {
                Visit::Remove
            } else {
                Visit::Keep
            }
        });

        assert_eq!(visits, 6);
        assert_eq!(registry.len(), 3);
        for id in &doomed {
            assert!(!registry.contains(*id));
        }

        // la visita successiva non vede più i membri rimossi
        let mut second = 0;
        registry.for_each(|id, _| {
            assert!(!doomed.contains(&id));
            second += 1;
            Visit::Keep
        });
        assert_eq!(second, 3);
    }

    #[test]
    fn removed_member_is_not_visited() {
        let registry = SubscriberRegistry::new(4);
        let a = registry.add();
        let b = registry.add();
        registry.remove(a.id);

        let mut seen = Vec::new();
        registry.for_each(|id, _| {
            seen.push(id);
            Visit::Keep
        });
        assert_eq!(seen, vec![b.id]);
    }
}
