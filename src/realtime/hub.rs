//! # Live Broadcast Hub
//!
//! Routes newly stored responses to the observers of their form.
//!
//! Delivery is best-effort and at-most-once: there is no buffering or replay,
//! so an observer only sees events published while it is subscribed.
//! Each observer owns an unbounded channel, which makes a send non-blocking;
//! a slow connection only grows its own queue and never stalls ingestion.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::{RealtimeError, RealtimeResult};
use super::event::ResponseEvent;

/// Observer identifier
pub type ObserverId = Uuid;

/// Event sender for an observer
pub type EventSender = mpsc::UnboundedSender<Arc<ResponseEvent>>;

/// Event receiver for an observer
pub type EventReceiver = mpsc::UnboundedReceiver<Arc<ResponseEvent>>;

/// Handle the hub uses to reach one observer
#[derive(Debug, Clone)]
pub struct Observer {
    id: ObserverId,
    sender: EventSender,
}

impl Observer {
    /// Create an observer and the receiving end of its event channel
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let observer = Self {
            id: Uuid::new_v4(),
            sender,
        };
        (observer, receiver)
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }
}

/// Outcome of one publish call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Observers subscribed when the publish started
    pub matched: usize,
    /// Events handed to an observer channel
    pub delivered: usize,
    /// Observers whose channel was already closed
    pub failed: usize,
}

/// Per-form observer registry.
///
/// The map is only reachable through these methods. Publishing copies the
/// observer set under a read lock and sends after releasing it, so
/// subscribe/unsubscribe never wait on delivery.
#[derive(Debug, Default)]
pub struct Hub {
    forms: RwLock<HashMap<String, HashMap<ObserverId, EventSender>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a form. Re-subscribing the same observer is a no-op.
    pub fn subscribe(&self, form_id: &str, observer: &Observer) -> RealtimeResult<()> {
        let mut forms = self
            .forms
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;

        forms
            .entry(form_id.to_string())
            .or_default()
            .insert(observer.id, observer.sender.clone());

        debug!(form_id, observer = %observer.id, "observer subscribed");
        Ok(())
    }

    /// Remove an observer. Unknown forms or observers are ignored.
    pub fn unsubscribe(&self, form_id: &str, observer_id: ObserverId) {
        if let Ok(mut forms) = self.forms.write() {
            if let Some(observers) = forms.get_mut(form_id) {
                observers.remove(&observer_id);
                if observers.is_empty() {
                    forms.remove(form_id);
                }
            }
        }
        debug!(form_id, observer = %observer_id, "observer unsubscribed");
    }

    /// Deliver an event to every current observer of `form_id`.
    ///
    /// Never fails: a closed observer is logged, counted, and pruned.
    pub fn publish(&self, form_id: &str, event: ResponseEvent) -> PublishReport {
        let targets: Vec<(ObserverId, EventSender)> = match self.forms.read() {
            Ok(forms) => forms
                .get(form_id)
                .map(|observers| {
                    observers
                        .iter()
                        .map(|(id, sender)| (*id, sender.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => {
                warn!(form_id, "hub lock poisoned, dropping event");
                return PublishReport::default();
            }
        };

        let mut report = PublishReport {
            matched: targets.len(),
            ..Default::default()
        };

        let event = Arc::new(event);
        let mut gone = Vec::new();
        for (id, sender) in targets {
            match sender.send(Arc::clone(&event)) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    warn!(form_id, observer = %id, "observer gone, event not delivered");
                    report.failed += 1;
                    gone.push(id);
                }
            }
        }

        for id in gone {
            self.unsubscribe(form_id, id);
        }

        report
    }

    /// Number of observers subscribed to a form
    pub fn observer_count(&self, form_id: &str) -> usize {
        self.forms
            .read()
            .map(|f| f.get(form_id).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Number of forms with at least one observer
    pub fn form_count(&self) -> usize {
        self.forms.read().map(|f| f.len()).unwrap_or(0)
    }
}
