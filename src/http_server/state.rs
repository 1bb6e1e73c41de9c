//! Shared handler state

use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::ingest::Ingestor;
use crate::realtime::Hub;
use crate::storage::{FormStore, MemoryStore, ResponseStore};

/// State shared by every route
#[derive(Debug, Clone)]
pub struct AppState {
    pub forms: Arc<dyn FormStore>,
    pub responses: Arc<dyn ResponseStore>,
    pub hub: Arc<Hub>,
    pub ingestor: Ingestor,
    pub aggregator: Aggregator,
}

impl AppState {
    pub fn new(forms: Arc<dyn FormStore>, responses: Arc<dyn ResponseStore>) -> Self {
        let hub = Arc::new(Hub::new());
        Self {
            ingestor: Ingestor::new(forms.clone(), responses.clone(), hub.clone()),
            aggregator: Aggregator::new(responses.clone()),
            forms,
            responses,
            hub,
        }
    }

    /// State over a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store)
    }
}
