use std::sync::Arc;

use crate::bus::EventBus;
use crate::config::ViewerConfig;
use crate::store::{BlobStore, Store};

/// Process-wide collaborators, built once at startup and handed to every
/// component that needs them.
#[derive(Clone)]
pub struct AppContext {
    pub config: ViewerConfig,
    pub bus: EventBus,
    pub store: Store,
}

impl AppContext {
    pub fn new(config: ViewerConfig, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            bus: EventBus::new(),
            store: Store::new(blobs),
        }
    }
}
