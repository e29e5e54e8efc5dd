//! Lazy per-node metadata for the visible window.
//!
//! When layout finishes for a window, the cache attaches whatever it already
//! knows, fetches the rest in one batch ordered by file offset, annotates
//! genome membership, and announces the enriched window. Bursts of windows
//! collapse to the newest one through a [`ThrottledRunner`].

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::bus::{Event, EventBus, Subscription};
use crate::model::{ByteOffset, NodeId, NodeMetadata, Subgraph};
use crate::paths::PathComputer;
use crate::throttle::{CancellationToken, Task, ThrottledRunner};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata: {0}")]
    Io(#[from] io::Error),
    #[error("no segment record at byte offset {offset}: {reason}")]
    Parse { offset: ByteOffset, reason: String },
}

/// Batch reader for segment records.
pub trait MetadataSource: Send + Sync {
    /// `requests` is ordered by ascending offset. A malformed record fails the
    /// whole batch.
    fn parse_node_metadata(
        &self,
        requests: &IndexMap<NodeId, ByteOffset>,
    ) -> Result<HashMap<NodeId, NodeMetadata>, MetadataError>;
}

struct CacheInner {
    source: Arc<dyn MetadataSource>,
    paths: Arc<dyn PathComputer>,
    bus: EventBus,
    entries: Mutex<HashMap<NodeId, Arc<NodeMetadata>>>,
    radius: AtomicUsize,
    radius_threshold: usize,
}

impl CacheInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<NodeId, Arc<NodeMetadata>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fills in metadata and genome membership. Returns `false` when the pass
    /// was cancelled before it could finish.
    fn populate(&self, subgraph: &mut Subgraph, token: &CancellationToken) -> bool {
        let mut missing = Vec::new();
        {
            let entries = self.entries();
            for node in subgraph.nodes_mut() {
                for segment in node.segments_mut() {
                    if segment.metadata().is_some() {
                        continue;
                    }
                    match entries.get(&segment.id()) {
                        Some(metadata) => segment.set_metadata(Arc::clone(metadata)),
                        None => missing.push((segment.id(), segment.byte_offset())),
                    }
                }
            }
        }

        // Ascending offsets turn the batch into one forward scan of the file.
        missing.sort_by_key(|&(_, offset)| offset);
        let mut requests = IndexMap::with_capacity(missing.len());
        for (id, offset) in missing {
            requests.entry(id).or_insert(offset);
        }

        if token.is_cancelled() {
            trace!("metadata population cancelled before fetching");
            return false;
        }

        if !requests.is_empty() {
            match self.source.parse_node_metadata(&requests) {
                Ok(parsed) => {
                    let parsed = parsed
                        .into_iter()
                        .map(|(id, metadata)| (id, Arc::new(metadata)))
                        .collect::<HashMap<_, _>>();
                    for node in subgraph.nodes_mut() {
                        for segment in node.segments_mut() {
                            if let Some(metadata) = parsed.get(&segment.id()) {
                                segment.set_metadata(Arc::clone(metadata));
                            }
                        }
                    }
                    debug!(fetched = parsed.len(), "cached node metadata");
                    self.entries().extend(parsed);
                }
                Err(error) => {
                    warn!(%error, requested = requests.len(), "failed to read node metadata");
                }
            }
        }

        if token.is_cancelled() {
            trace!("metadata population cancelled before computing paths");
            return false;
        }

        self.paths.compute_paths(subgraph);
        true
    }

    fn enrich(&self, window: &Subgraph, token: &CancellationToken) {
        let mut subgraph = window.clone();
        if self.populate(&mut subgraph, token) {
            self.bus
                .publish(Event::MetadataCacheUpdated(Arc::new(subgraph)));
        }
    }
}

pub struct NodeMetadataCache {
    inner: Arc<CacheInner>,
    runner: ThrottledRunner,
}

impl NodeMetadataCache {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        paths: Arc<dyn PathComputer>,
        bus: EventBus,
        radius_threshold: usize,
        throttle_interval: Duration,
    ) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(CacheInner {
                source,
                paths,
                bus,
                entries: Mutex::new(HashMap::new()),
                radius: AtomicUsize::new(0),
                radius_threshold,
            }),
            runner: ThrottledRunner::new("metadata", throttle_interval)?,
        })
    }

    fn above_threshold(&self) -> bool {
        self.inner.radius.load(Ordering::SeqCst) >= self.inner.radius_threshold
    }

    /// Tracks the current radius; above the threshold any in-flight fetch is
    /// abandoned.
    pub fn on_center_changed(&self, radius: usize) {
        self.inner.radius.store(radius, Ordering::SeqCst);
        if self.above_threshold() {
            debug!(
                radius,
                threshold = self.inner.radius_threshold,
                "window too large for metadata, stopping retrieval"
            );
            self.runner.stop();
        }
    }

    pub fn on_layout_done(&self, subgraph: Arc<Subgraph>) {
        if self.above_threshold() {
            trace!(nodes = subgraph.node_count(), "skipping metadata for large window");
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.runner
            .run(Task::new(move |token| inner.enrich(&subgraph, token)));
    }

    pub fn handle(&self, event: &Event) {
        match event {
            Event::CenterPointQueryChanged { radius, .. } => self.on_center_changed(*radius),
            Event::LayoutDone(subgraph) => self.on_layout_done(Arc::clone(subgraph)),
            Event::MetadataCacheUpdated(_) | Event::GenomeIndexReady { .. } => {}
        }
    }

    /// Serves bus events on a dedicated thread until the subscription is
    /// removed from the bus.
    pub fn listen(self: &Arc<Self>, subscription: Subscription) -> io::Result<JoinHandle<()>> {
        let cache = Arc::clone(self);
        thread::Builder::new()
            .name("metadata-listener".to_owned())
            .spawn(move || {
                for event in subscription.events.iter() {
                    cache.handle(&event);
                }
                cache.stop();
                trace!("metadata listener finished");
            })
    }

    pub fn cached(&self, id: NodeId) -> Option<Arc<NodeMetadata>> {
        self.inner.entries().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs one population pass on the caller's thread.
    pub fn populate(&self, subgraph: &mut Subgraph, token: &CancellationToken) -> bool {
        self.inner.populate(subgraph, token)
    }

    pub fn stop(&self) {
        self.runner.stop();
    }

    pub fn block(&self) {
        self.runner.block();
    }
}
