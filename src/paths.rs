//! Genome membership of the nodes and edges inside a window.

use std::collections::HashMap;
use std::sync::Arc;

use crate::gfa::AssemblyGraph;
use crate::model::{EdgeId, NodeId, Subgraph};

/// Annotates a subgraph in place with the genomes running through it.
pub trait PathComputer: Send + Sync {
    fn compute_paths(&self, subgraph: &mut Subgraph);
}

/// Walks the genome paths of the loaded graph.
#[derive(Clone, Debug)]
pub struct GenomePathComputer {
    graph: Arc<AssemblyGraph>,
}

impl GenomePathComputer {
    pub fn new(graph: Arc<AssemblyGraph>) -> Self {
        Self { graph }
    }
}

impl PathComputer for GenomePathComputer {
    fn compute_paths(&self, subgraph: &mut Subgraph) {
        // Path steps name segments; an aggregate answers for all its members.
        let mut node_of: HashMap<NodeId, NodeId> = HashMap::new();
        for node in subgraph.nodes() {
            for segment in node.segments() {
                node_of.insert(segment.id(), node.id());
            }
        }
        let resolve = |step: NodeId| node_of.get(&step).copied().unwrap_or(step);

        let mut edges_by_pair: HashMap<(NodeId, NodeId), Vec<EdgeId>> = HashMap::new();
        for edge in subgraph.edges().filter(|edge| !edge.is_dummy()) {
            edges_by_pair
                .entry((edge.source(), edge.target()))
                .or_default()
                .push(edge.id());
        }

        let mut node_genomes: HashMap<NodeId, Vec<&str>> = HashMap::new();
        let mut edge_genomes: HashMap<EdgeId, Vec<&str>> = HashMap::new();

        for path in self.graph.genome_paths() {
            let genome = path.name.as_str();

            for &step in &path.steps {
                if let Some(&node) = node_of.get(&step) {
                    node_genomes.entry(node).or_default().push(genome);
                }
            }

            for pair in path.steps.windows(2) {
                let (from, to) = (resolve(pair[0]), resolve(pair[1]));
                // Consecutive members of one aggregate stay inside it.
                if from == to && pair[0] != pair[1] {
                    continue;
                }
                // Paths may traverse a link against its stored direction.
                for key in [(from, to), (to, from)] {
                    if let Some(ids) = edges_by_pair.get(&key) {
                        for id in ids {
                            edge_genomes.entry(*id).or_default().push(genome);
                        }
                    }
                }
            }
        }

        for (id, genomes) in node_genomes {
            if let Some(node) = subgraph.node_mut(id) {
                for genome in genomes {
                    node.add_genome(genome);
                }
            }
        }

        for edge in subgraph.edges_mut() {
            if let Some(genomes) = edge_genomes.get(&edge.id()) {
                for genome in genomes {
                    edge.add_genome(genome);
                }
            }
        }
    }
}
