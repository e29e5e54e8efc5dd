//! Process-wide publish/subscribe channel between the pipeline stages.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use crate::model::{NodeId, Subgraph};

#[derive(Clone, Debug)]
pub enum Event {
    /// The user moved the window; carries the ids the query selected.
    CenterPointQueryChanged {
        center: NodeId,
        radius: usize,
        node_ids: Arc<BTreeSet<NodeId>>,
    },
    /// Layout finished for a window and handed it on for enrichment.
    LayoutDone(Arc<Subgraph>),
    /// A window has been enriched with metadata and genome membership.
    MetadataCacheUpdated(Arc<Subgraph>),
    /// A genome coordinate index became available.
    GenomeIndexReady { genome: String },
}

impl Event {
    fn kind(&self) -> &'static str {
        match self {
            Self::CenterPointQueryChanged { .. } => "center-point-query-changed",
            Self::LayoutDone(_) => "layout-done",
            Self::MetadataCacheUpdated(_) => "metadata-cache-updated",
            Self::GenomeIndexReady { .. } => "genome-index-ready",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered listener and the stream it reads events from.
#[derive(Debug)]
pub struct Subscription {
    pub id: ListenerId,
    pub events: Receiver<Event>,
}

#[derive(Default)]
struct Listeners {
    senders: Vec<(ListenerId, Sender<Event>)>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, events) = crossbeam_channel::unbounded();
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .push((id, sender));
        Subscription { id, events }
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .retain(|(listener, _)| *listener != id);
    }

    /// Delivers `event` to every listener; listeners whose receiver is gone
    /// are dropped.
    pub fn publish(&self, event: Event) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(
            kind = event.kind(),
            listeners = listeners.senders.len(),
            "publishing event"
        );
        listeners
            .senders
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listener_receives_published_events() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(Event::GenomeIndexReady {
            genome: "g1".into(),
        });

        assert!(matches!(first.events.try_recv(), Ok(Event::GenomeIndexReady { .. })));
        assert!(matches!(second.events.try_recv(), Ok(Event::GenomeIndexReady { .. })));
    }

    #[test]
    fn unsubscribed_listener_is_not_served() {
        let bus = EventBus::new();
        let subscription = bus.subscribe();
        bus.unsubscribe(subscription.id);

        bus.publish(Event::LayoutDone(Arc::new(Subgraph::new())));

        assert!(subscription.events.try_recv().is_err());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe());
        let _kept = bus.subscribe();

        bus.publish(Event::LayoutDone(Arc::new(Subgraph::new())));

        assert_eq!(bus.listener_count(), 1);
    }
}
