// ABOUTME: Listener registry keyed by event kind
// ABOUTME: Every listener runs as its own tokio task so dispatch never blocks

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::protocol::messages::{Event, EventKind, EventVariant};

/// Error type listeners may return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Listener = Arc<dyn Fn(Event) -> Option<BoxFuture<'static, Result<(), BoxError>>> + Send + Sync>;

/// Registry of event listeners, owned by one session
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event payload type
    ///
    /// Listeners for the same type are started in registration order.
    pub fn listen<E, F, Fut>(&self, callback: F)
    where
        E: EventVariant,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let listener: Listener = Arc::new(move |event: Event| {
            E::from_event(&event)
                .cloned()
                .map(|payload| Box::pin(callback(payload)) as BoxFuture<'static, _>)
        });

        self.listeners
            .write()
            .entry(E::KIND)
            .or_default()
            .push(listener);
        log::debug!("Registered listener for {:?}", E::KIND);
    }

    /// Number of listeners registered for a kind
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Spawn every listener registered for the event's kind
    ///
    /// Returns immediately with one handle per spawned listener. A listener
    /// that fails or panics is logged and does not affect the others.
    pub fn dispatch(&self, event: &Event) -> Vec<JoinHandle<()>> {
        let kind = event.kind();

        // Snapshot so listeners can register more listeners without deadlocking.
        let listeners: Vec<Listener> = match self.listeners.read().get(&kind) {
            Some(listeners) => listeners.clone(),
            None => return Vec::new(),
        };

        listeners
            .iter()
            .filter_map(|listener| listener(event.clone()))
            .map(|future| {
                tokio::spawn(async move {
                    if let Err(e) = future.await {
                        log::error!("Listener for {:?} failed: {}", kind, e);
                    }
                })
            })
            .collect()
    }
}
