use std::collections::{BTreeMap, BTreeSet};

use super::edge::{DummyEdge, Edge, EdgeId, Link};
use super::node::{ByteOffset, HasEdges, Node, NodeId};

/// The nodes and edges materialized for one query window.
///
/// A subgraph has exactly one owner at a time: layout hands it to metadata
/// population, which publishes it as an immutable snapshot. It also hands out
/// the ids of the edges it holds.
#[derive(Clone, Debug)]
pub struct Subgraph {
    center: Option<NodeId>,
    radius: usize,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_edge_id: u64,
}

impl Default for Subgraph {
    fn default() -> Self {
        Self {
            center: None,
            radius: 0,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_edge_id: 1,
        }
    }
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_window(center: NodeId, radius: usize) -> Self {
        Self {
            center: Some(center),
            radius,
            ..Self::default()
        }
    }

    pub fn center(&self) -> Option<NodeId> {
        self.center
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Inserts `node`, returning the node previously stored under its id.
    ///
    /// The stored node's adjacency lists exactly the registered edges that
    /// touch its id, whatever the incoming value carried.
    pub fn add_node(&mut self, node: impl Into<Node>) -> Option<Node> {
        let mut node = node.into();
        let id = node.id();

        node.clear_edges();
        for edge in self.edges.values() {
            if edge.source() == id {
                node.add_outgoing_edge(edge.id());
            }
            if edge.target() == id {
                node.add_incoming_edge(edge.id());
            }
        }

        self.nodes.insert(id, node)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Removes a node together with every edge touching it, and unregisters
    /// those edges from the surviving endpoints.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;

        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| edge.source() == id || edge.target() == id)
            .map(Edge::id)
            .collect();
        for edge_id in touching {
            let Some(edge) = self.edges.remove(&edge_id) else {
                continue;
            };
            for end in [edge.source(), edge.target()] {
                if let Some(other) = self.nodes.get_mut(&end) {
                    other.remove_edge(edge_id);
                }
            }
        }

        Some(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reserves an id no edge of this subgraph uses.
    pub fn next_edge_id(&mut self) -> EdgeId {
        let id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;
        id
    }

    /// Adds `edge` and registers it on whichever endpoints are present.
    pub fn add_edge(&mut self, edge: impl Into<Edge>) -> EdgeId {
        let edge = edge.into();
        let id = edge.id();
        self.next_edge_id = self.next_edge_id.max(id.get() + 1);

        if let Some(source) = self.nodes.get_mut(&edge.source()) {
            source.add_outgoing_edge(id);
        }
        if let Some(target) = self.nodes.get_mut(&edge.target()) {
            target.add_incoming_edge(id);
        }

        self.edges.insert(id, edge);
        id
    }

    pub fn add_link(&mut self, from: NodeId, to: NodeId, byte_offset: ByteOffset) -> EdgeId {
        let id = self.next_edge_id();
        self.add_edge(Link::new(id, from, to, byte_offset))
    }

    /// Adds a layout segment of the real edge behind `original`. Returns
    /// `None` if `original` is not in this subgraph.
    pub fn add_dummy_edge(&mut self, from: NodeId, to: NodeId, original: EdgeId) -> Option<EdgeId> {
        let id = EdgeId::new(self.next_edge_id);
        let dummy = DummyEdge::new(id, from, to, self.edges.get(&original)?);
        Some(self.add_edge(dummy))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Genomes running over edge `id`; a dummy answers with its original's.
    pub fn edge_genomes(&self, id: EdgeId) -> Option<&BTreeSet<String>> {
        let original = self.edges.get(&id)?.original_id();
        self.edges.get(&original)?.genomes()
    }

    /// Number of genomes running over edge `id`, or 1 when none are known.
    pub fn edge_importance(&self, id: EdgeId) -> Option<usize> {
        self.edges.get(&id)?;
        Some(self.edge_genomes(id).map_or(1, BTreeSet::len))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DummyNode, Segment};

    fn pair() -> Subgraph {
        let mut subgraph = Subgraph::new();
        subgraph.add_node(Segment::new(1, 0, 4));
        subgraph.add_node(Segment::new(2, 10, 4));
        subgraph
    }

    #[test]
    fn nodes_are_keyed_by_id() {
        let mut subgraph = Subgraph::for_window(1, 2);
        assert!(subgraph.add_node(Segment::new(1, 0, 4)).is_none());
        assert!(subgraph.add_node(Segment::new(2, 10, 4)).is_none());
        assert!(subgraph.add_node(Segment::new(1, 0, 4)).is_some());

        assert_eq!(subgraph.node_count(), 2);
        assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), [1, 2]);
        assert_eq!(subgraph.center(), Some(1));
    }

    #[test]
    fn edges_register_on_their_endpoints() {
        let mut subgraph = pair();

        let edge = subgraph.add_link(1, 2, 30);

        assert_eq!(subgraph.node(1).unwrap().outgoing_edges(), [edge]);
        assert_eq!(subgraph.node(2).unwrap().incoming_edges(), [edge]);
    }

    #[test]
    fn edge_ids_are_unique_within_a_subgraph() {
        let mut subgraph = pair();

        let first = subgraph.add_link(1, 2, 30);
        let second = subgraph.add_link(1, 2, 30);
        let reserved = subgraph.next_edge_id();

        assert_ne!(first, second);
        assert!(reserved > second);
        assert_eq!(subgraph.edge_count(), 2);
    }

    #[test]
    fn removing_a_node_drops_its_edges_from_the_survivors() {
        let mut subgraph = pair();
        subgraph.add_node(Segment::new(3, 20, 4));
        subgraph.add_link(1, 2, 30);
        let kept = subgraph.add_link(1, 3, 40);
        subgraph.add_link(2, 1, 50);

        assert!(subgraph.remove_node(2).is_some());
        assert!(subgraph.remove_node(2).is_none());

        let survivor = subgraph.node(1).unwrap();
        assert_eq!(survivor.outgoing_edges(), [kept]);
        assert!(survivor.incoming_edges().is_empty());
        assert!(
            survivor
                .outgoing_edges()
                .iter()
                .all(|&id| subgraph.edge(id).is_some())
        );
        assert_eq!(subgraph.edge_count(), 1);
        assert!(!subgraph.contains_node(2));
    }

    #[test]
    fn replacing_a_node_keeps_its_registered_edges() {
        let mut subgraph = pair();
        let edge = subgraph.add_link(1, 2, 30);

        subgraph.add_node(Segment::new(2, 10, 8));

        assert_eq!(subgraph.node(2).unwrap().incoming_edges(), [edge]);
        assert!(subgraph.node(2).unwrap().outgoing_edges().is_empty());
    }

    #[test]
    fn dummy_edges_resolve_genomes_through_the_original() {
        let mut subgraph = pair();
        subgraph.add_node(Node::Dummy(DummyNode::new(100)));
        let real = subgraph.add_link(1, 2, 30);
        let first = subgraph.add_dummy_edge(1, 100, real).unwrap();
        let second = subgraph.add_dummy_edge(100, 2, first).unwrap();

        assert_eq!(subgraph.edge(second).unwrap().original_id(), real);
        assert_eq!(subgraph.edge_importance(second), Some(1));

        for edge in subgraph.edges_mut() {
            edge.add_genome("a");
            edge.add_genome("b");
        }

        assert_eq!(subgraph.edge_importance(real), Some(2));
        assert_eq!(subgraph.edge_importance(first), Some(2));
        assert_eq!(subgraph.edge_importance(second), Some(2));
        assert!(subgraph.add_dummy_edge(1, 2, EdgeId::new(999)).is_none());
        assert_eq!(subgraph.edge_importance(EdgeId::new(999)), None);
    }
}
