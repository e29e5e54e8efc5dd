//! Genome coordinate index: maps a base position on a genome to the node that
//! covers it, and back.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::bus::{Event, EventBus};
use crate::gfa::AssemblyGraph;
use crate::model::NodeId;
use crate::progress::ProgressReporter;
use crate::store::{Store, source_key};
use crate::throttle::{CancellationToken, Task, ThrottledRunner};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("genome {0:?} has no path in this graph")]
    UnknownGenome(String),
}

/// Cumulative base at which a node starts on one genome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeIndexPoint {
    pub base: u64,
    pub node_id: NodeId,
    pub path_position: usize,
}

/// Result of a coordinate lookup: the covering node and the 0-based offset
/// inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenomePoint {
    pub node_id: NodeId,
    pub offset: u64,
}

/// One point per non-empty node along a genome path, strictly increasing in
/// `base`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "GenomeIndexRecord", into = "GenomeIndexRecord")]
pub struct GenomeIndex {
    genome: String,
    length: u64,
    points: Vec<GenomeIndexPoint>,
    first_base: HashMap<NodeId, u64>,
}

#[derive(Serialize, Deserialize)]
struct GenomeIndexRecord {
    genome: String,
    length: u64,
    points: Vec<GenomeIndexPoint>,
}

impl From<GenomeIndexRecord> for GenomeIndex {
    fn from(record: GenomeIndexRecord) -> Self {
        Self::from_points(record.genome, record.length, record.points)
    }
}

impl From<GenomeIndex> for GenomeIndexRecord {
    fn from(index: GenomeIndex) -> Self {
        Self {
            genome: index.genome,
            length: index.length,
            points: index.points,
        }
    }
}

impl GenomeIndex {
    fn from_points(genome: String, length: u64, points: Vec<GenomeIndexPoint>) -> Self {
        let mut first_base = HashMap::with_capacity(points.len());
        for point in &points {
            first_base.entry(point.node_id).or_insert(point.base);
        }
        Self {
            genome,
            length,
            points,
            first_base,
        }
    }

    pub fn genome(&self) -> &str {
        &self.genome
    }

    /// Total number of bases along the genome.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn points(&self) -> &[GenomeIndexPoint] {
        &self.points
    }

    pub fn get_genome_point(&self, base: u64) -> Option<GenomePoint> {
        if base >= self.length {
            return None;
        }
        let below = self
            .points
            .partition_point(|point| point.base <= base)
            .checked_sub(1)?;
        let point = self.points.get(below)?;
        Some(GenomePoint {
            node_id: point.node_id,
            offset: base - point.base,
        })
    }

    /// Where `node` starts on this genome; the first visit wins for paths that
    /// pass a node more than once.
    pub fn get_base(&self, node: NodeId) -> Option<u64> {
        self.first_base.get(&node).copied()
    }
}

/// Walks `genome`'s path through `graph`, reporting progress in roughly
/// `steps` increments. Returns `Ok(None)` if cancelled.
pub fn build_index(
    graph: &AssemblyGraph,
    genome: &str,
    progress: &dyn ProgressReporter,
    token: &CancellationToken,
    steps: usize,
) -> Result<Option<GenomeIndex>, IndexError> {
    let path = graph
        .genome_path(genome)
        .ok_or_else(|| IndexError::UnknownGenome(genome.to_owned()))?;

    let total = path.steps.len();
    let stride = (total / steps.max(1)).max(1);
    let mut points = Vec::with_capacity(total);
    let mut base = 0u64;

    progress.report(0, &format!("Indexing {genome}"));

    for (position, &node_id) in path.steps.iter().enumerate() {
        if position % stride == 0 {
            if token.is_cancelled() {
                trace!(genome, position, "index build cancelled");
                return Ok(None);
            }
            let percent = (position * 100 / total).min(99) as u8;
            progress.report(percent, &format!("Indexing {genome}"));
        }

        let length = graph.segment(node_id).map_or(0, |segment| segment.length);
        if length == 0 {
            continue;
        }
        points.push(GenomeIndexPoint {
            base,
            node_id,
            path_position: position,
        });
        base += length;
    }

    progress.report(100, &format!("Indexed {genome}"));
    Ok(Some(GenomeIndex::from_points(genome.to_owned(), base, points)))
}

/// Every genome indexed so far for one source file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoordinateIndex {
    genomes: BTreeMap<String, GenomeIndex>,
}

impl CoordinateIndex {
    pub fn insert(&mut self, index: GenomeIndex) {
        self.genomes.insert(index.genome.clone(), index);
    }

    pub fn contains(&self, genome: &str) -> bool {
        self.genomes.contains_key(genome)
    }

    pub fn genome(&self, genome: &str) -> Option<&GenomeIndex> {
        self.genomes.get(genome)
    }

    pub fn genomes(&self) -> impl Iterator<Item = &str> {
        self.genomes.keys().map(String::as_str)
    }

    pub fn get_genome_point(&self, genome: &str, base: u64) -> Option<GenomePoint> {
        self.genomes.get(genome)?.get_genome_point(base)
    }

    pub fn get_base(&self, genome: &str, node: NodeId) -> Option<u64> {
        self.genomes.get(genome)?.get_base(node)
    }
}

struct ServiceInner {
    graph: Arc<AssemblyGraph>,
    store: Store,
    key: String,
    bus: EventBus,
    index: RwLock<CoordinateIndex>,
    progress: Arc<dyn ProgressReporter>,
    progress_steps: usize,
}

impl ServiceInner {
    fn populate(&self, genome: &str, token: &CancellationToken) {
        let built = match build_index(
            &self.graph,
            genome,
            self.progress.as_ref(),
            token,
            self.progress_steps,
        ) {
            Ok(Some(index)) => index,
            Ok(None) => return,
            Err(error) => {
                warn!(%error, "cannot index genome");
                return;
            }
        };
        if token.is_cancelled() {
            trace!(genome, "discarding index for superseded build");
            return;
        }

        info!(genome, points = built.points.len(), length = built.length, "genome index built");
        let snapshot = {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            index.insert(built);
            index.clone()
        };
        if let Err(error) = self.store.save(&self.key, &snapshot) {
            warn!(%error, key = self.key.as_str(), "failed to persist genome index");
        }

        self.bus.publish(Event::GenomeIndexReady {
            genome: genome.to_owned(),
        });
    }
}

/// Builds coordinate indices off the caller's thread and keeps them, reusing
/// whatever an earlier session persisted for the same file.
pub struct GenomeIndexService {
    inner: Arc<ServiceInner>,
    runner: ThrottledRunner,
    pending: Mutex<Option<(String, Task)>>,
}

impl GenomeIndexService {
    pub fn new(
        graph: Arc<AssemblyGraph>,
        store: Store,
        bus: EventBus,
        progress: Arc<dyn ProgressReporter>,
        throttle_interval: Duration,
        progress_steps: usize,
    ) -> io::Result<Self> {
        let key = format!("{}.genome-index", source_key(graph.source()));
        let index = match store.load::<CoordinateIndex>(&key) {
            Ok(Some(index)) => {
                debug!(key = key.as_str(), genomes = index.genomes.len(), "loaded persisted genome index");
                index
            }
            Ok(None) => CoordinateIndex::default(),
            Err(error) => {
                warn!(%error, key = key.as_str(), "ignoring unreadable genome index");
                CoordinateIndex::default()
            }
        };

        Ok(Self {
            inner: Arc::new(ServiceInner {
                graph,
                store,
                key,
                bus,
                index: RwLock::new(index),
                progress,
                progress_steps,
            }),
            runner: ThrottledRunner::new("genome-index", throttle_interval)?,
            pending: Mutex::new(None),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CoordinateIndex> {
        self.inner.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_indexed(&self, genome: &str) -> bool {
        self.read().contains(genome)
    }

    pub fn indexed_genomes(&self) -> Vec<String> {
        self.read().genomes().map(str::to_owned).collect()
    }

    /// Makes sure `genome` is indexed, building it in the background when no
    /// index exists yet. Asking again for the genome being built leaves that
    /// build running; asking for another genome supersedes it.
    pub fn populate_index(&self, genome: &str) -> Result<(), IndexError> {
        if self.inner.graph.genome_path(genome).is_none() {
            return Err(IndexError::UnknownGenome(genome.to_owned()));
        }

        if self.is_indexed(genome) {
            self.inner.progress.report(100, &format!("Indexed {genome}"));
            self.inner.bus.publish(Event::GenomeIndexReady {
                genome: genome.to_owned(),
            });
            return Ok(());
        }

        let task = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.as_ref() {
                // Same task again, so a build already under way keeps going.
                Some((pending_genome, task)) if pending_genome == genome => task.clone(),
                _ => {
                    let inner = Arc::clone(&self.inner);
                    let owned = genome.to_owned();
                    let task = Task::new(move |token| inner.populate(&owned, token));
                    *pending = Some((genome.to_owned(), task.clone()));
                    task
                }
            }
        };
        self.runner.run(task);
        Ok(())
    }

    pub fn get_genome_point(&self, genome: &str, base: u64) -> Option<GenomePoint> {
        self.read().get_genome_point(genome, base)
    }

    pub fn get_base(&self, genome: &str, node: NodeId) -> Option<u64> {
        self.read().get_base(genome, node)
    }

    pub fn genome_length(&self, genome: &str) -> Option<u64> {
        self.read().genome(genome).map(GenomeIndex::length)
    }

    pub fn stop(&self) {
        self.runner.stop();
    }

    pub fn block(&self) {
        self.runner.block();
    }
}
