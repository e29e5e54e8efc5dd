//! One open file: the graph, its query window and the background services
//! enriching it.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context as _, Result};
use tracing::{debug, info, warn};

use crate::bookmarks::Bookmarks;
use crate::bus::{Event, ListenerId, Subscription};
use crate::cache::{MetadataSource, NodeMetadataCache};
use crate::context::AppContext;
use crate::genome_index::{GenomeIndexService, GenomePoint};
use crate::gfa::{AssemblyGraph, GfaMetadataReader, load_gfa};
use crate::model::{NodeId, Subgraph};
use crate::paths::GenomePathComputer;
use crate::progress::{ProgressReporter, SharedProgress};
use crate::query::{CenterPointQuery, QueryError};

pub struct Session {
    context: AppContext,
    graph: Arc<AssemblyGraph>,
    query: CenterPointQuery,
    cache: Arc<NodeMetadataCache>,
    cache_listener: ListenerId,
    listener_thread: Option<JoinHandle<()>>,
    index: GenomeIndexService,
    progress: SharedProgress,
    bookmarks: Bookmarks,
}

impl Session {
    /// Loads `path` and starts the services that enrich its windows.
    pub fn open(context: AppContext, path: &Path) -> Result<Self> {
        let graph = load_gfa(path)
            .with_context(|| format!("failed to load assembly graph from {}", path.display()))?;
        let source = Arc::new(GfaMetadataReader::new(path));
        Self::from_graph(context, Arc::new(graph), source)
    }

    /// Builds a session over an already loaded graph and an arbitrary
    /// metadata source.
    pub fn from_graph(
        context: AppContext,
        graph: Arc<AssemblyGraph>,
        source: Arc<dyn MetadataSource>,
    ) -> Result<Self> {
        let config = &context.config;
        let paths = Arc::new(GenomePathComputer::new(Arc::clone(&graph)));
        let cache = Arc::new(NodeMetadataCache::new(
            source,
            paths,
            context.bus.clone(),
            config.radius_threshold,
            config.throttle_interval(),
        )
        .context("failed to start the metadata worker")?);

        let subscription = context.bus.subscribe();
        let cache_listener = subscription.id;
        let listener_thread = cache
            .listen(subscription)
            .context("failed to start the metadata listener")?;

        let progress = SharedProgress::new();
        let index = GenomeIndexService::new(
            Arc::clone(&graph),
            context.store.clone(),
            context.bus.clone(),
            Arc::new(progress.clone()) as Arc<dyn ProgressReporter>,
            config.throttle_interval(),
            config.index_progress_steps,
        )
        .context("failed to start the genome index worker")?;

        let bookmarks = Bookmarks::open(context.store.clone(), graph.source())
            .context("failed to read bookmarks")?;

        info!(
            source = %graph.source().display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            genomes = graph.genome_paths().len(),
            "session opened"
        );

        Ok(Self {
            query: CenterPointQuery::new(Arc::clone(&graph)),
            context,
            graph,
            cache,
            cache_listener,
            listener_thread: Some(listener_thread),
            index,
            progress,
            bookmarks,
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn graph(&self) -> &Arc<AssemblyGraph> {
        &self.graph
    }

    pub fn query(&self) -> &CenterPointQuery {
        &self.query
    }

    pub fn cache(&self) -> &NodeMetadataCache {
        &self.cache
    }

    pub fn index(&self) -> &GenomeIndexService {
        &self.index
    }

    pub fn progress(&self) -> &SharedProgress {
        &self.progress
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn bookmarks_mut(&mut self) -> &mut Bookmarks {
        &mut self.bookmarks
    }

    /// Listens for enriched windows and index completions.
    pub fn subscribe(&self) -> Subscription {
        self.context.bus.subscribe()
    }

    /// Moves the window. The query runs synchronously; metadata for the new
    /// window arrives later as [`Event::MetadataCacheUpdated`].
    pub fn navigate(&mut self, center: NodeId, radius: usize) -> Result<Arc<Subgraph>, QueryError> {
        let radius = radius.min(self.context.config.max_radius);
        let node_ids = Arc::clone(self.query.query(center, radius)?);
        debug!(center, radius, visible = node_ids.len(), "window moved");

        self.context.bus.publish(Event::CenterPointQueryChanged {
            center,
            radius,
            node_ids,
        });

        let subgraph = Arc::new(self.query.to_subgraph());
        self.context
            .bus
            .publish(Event::LayoutDone(Arc::clone(&subgraph)));
        Ok(subgraph)
    }

    /// Centers the window on the node covering `base` of `genome`. Returns
    /// `None` if the genome is not indexed or `base` lies past its end.
    pub fn go_to(
        &mut self,
        genome: &str,
        base: u64,
        radius: usize,
    ) -> Option<(GenomePoint, Arc<Subgraph>)> {
        let point = self.index.get_genome_point(genome, base)?;
        match self.navigate(point.node_id, radius) {
            Ok(window) => Some((point, window)),
            Err(error) => {
                warn!(%error, genome, base, "indexed node missing from graph");
                None
            }
        }
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.graph.node_id(name)
    }

    /// Resolves user input as a segment name first, then as a numeric id.
    pub fn resolve_node(&self, input: &str) -> Option<NodeId> {
        let input = input.trim();
        self.node_by_name(input).or_else(|| {
            input
                .parse::<NodeId>()
                .ok()
                .filter(|&id| self.graph.contains(id))
        })
    }

    /// Waits for in-flight enrichment and indexing to finish.
    pub fn settle(&self) {
        self.cache.block();
        self.index.block();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.context.bus.unsubscribe(self.cache_listener);
        self.index.stop();
        if let Some(listener) = self.listener_thread.take()
            && listener.join().is_err()
        {
            warn!("metadata listener panicked");
        }
    }
}
