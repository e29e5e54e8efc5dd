//! Bounded-radius window around a center node.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use crate::gfa::AssemblyGraph;
use crate::model::{Node, NodeId, Position, Positionable, Segment, Subgraph};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

/// Breadth-first window over both edge directions.
///
/// The query is cheap and synchronous; it runs on the caller's thread and only
/// its consequences are handed to background workers.
#[derive(Debug)]
pub struct CenterPointQuery {
    graph: Arc<AssemblyGraph>,
    center: Option<NodeId>,
    radius: usize,
    depths: BTreeMap<NodeId, usize>,
    node_ids: Arc<BTreeSet<NodeId>>,
}

impl CenterPointQuery {
    pub fn new(graph: Arc<AssemblyGraph>) -> Self {
        Self {
            graph,
            center: None,
            radius: 0,
            depths: BTreeMap::new(),
            node_ids: Arc::default(),
        }
    }

    pub fn graph(&self) -> &Arc<AssemblyGraph> {
        &self.graph
    }

    pub fn center(&self) -> Option<NodeId> {
        self.center
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Recomputes the window. Each node is recorded at its hop distance from
    /// `center`, so the result does not depend on neighbour order.
    pub fn query(
        &mut self,
        center: NodeId,
        radius: usize,
    ) -> Result<&Arc<BTreeSet<NodeId>>, QueryError> {
        if !self.graph.contains(center) {
            return Err(QueryError::UnknownNode(center));
        }

        let mut depths = BTreeMap::from([(center, 0usize)]);
        let mut queue = VecDeque::from([(center, 0usize)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= radius {
                continue;
            }

            for next in self.graph.neighbors(node) {
                if !depths.contains_key(&next) {
                    depths.insert(next, depth + 1);
                    queue.push_back((next, depth + 1));
                }
            }
        }

        self.center = Some(center);
        self.radius = radius;
        self.node_ids = Arc::new(depths.keys().copied().collect());
        self.depths = depths;
        Ok(&self.node_ids)
    }

    pub fn node_ids(&self) -> &Arc<BTreeSet<NodeId>> {
        &self.node_ids
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    /// Replays the last result without traversing again.
    pub fn visit<F>(&self, mut consumer: F)
    where
        F: FnMut(NodeId),
    {
        for &id in self.node_ids.iter() {
            consumer(id);
        }
    }

    /// Materializes the last result as segments plus the links among them.
    ///
    /// Nodes get a provisional placement: one column per hop distance, rows in
    /// id order.
    pub fn to_subgraph(&self) -> Subgraph {
        let Some(center) = self.center else {
            return Subgraph::new();
        };

        let mut subgraph = Subgraph::for_window(center, self.radius);
        let mut rows: BTreeMap<usize, usize> = BTreeMap::new();

        for (&id, &depth) in &self.depths {
            let Some(record) = self.graph.segment(id) else {
                continue;
            };
            let mut node = Node::from(Segment::new(id, record.byte_offset, record.length));
            let row = rows.entry(depth).or_default();
            node.set_position(Position {
                x: depth as f64,
                y: *row as f64,
            });
            *row += 1;
            subgraph.add_node(node);
        }

        for &id in self.node_ids.iter() {
            for link in self.graph.links_from(id) {
                if self.node_ids.contains(&link.to) {
                    subgraph.add_link(link.from, link.to, link.byte_offset);
                }
            }
        }

        subgraph
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::gfa::GraphBuilder;
    use crate::model::HasEdges;

    /// 0 - 1 - 2 - 3 and back from 3 to 0, plus 4 hanging off 2.
    fn ring() -> Arc<AssemblyGraph> {
        let mut builder = GraphBuilder::new("ring.gfa");
        for index in 0..5u64 {
            builder.add_segment(&index.to_string(), 10, index * 100);
        }
        builder.add_link(0, 1, 1000);
        builder.add_link(1, 2, 1010);
        builder.add_link(2, 3, 1020);
        builder.add_link(3, 0, 1030);
        builder.add_link(4, 2, 1040);
        Arc::new(builder.build())
    }

    #[test]
    fn radius_zero_is_just_the_center() {
        let mut query = CenterPointQuery::new(ring());

        let ids = query.query(2, 0).unwrap();

        assert_eq!(ids.iter().copied().collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn traversal_follows_both_directions_and_survives_cycles() {
        let mut query = CenterPointQuery::new(ring());

        let ids = query.query(2, 1).unwrap().clone();
        assert_eq!(ids.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);

        let ids = query.query(2, 10).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(query.depth(0), Some(2));
    }

    #[test]
    fn unknown_center_is_an_error() {
        let mut query = CenterPointQuery::new(ring());

        assert_eq!(query.query(42, 3), Err(QueryError::UnknownNode(42)));
        assert!(query.center().is_none());
    }

    #[test]
    fn visit_replays_the_last_result() {
        let mut query = CenterPointQuery::new(ring());
        query.query(0, 1).unwrap();

        let mut seen = Vec::new();
        query.visit(|id| seen.push(id));

        assert_eq!(seen, [0, 1, 3]);
    }

    #[test]
    fn subgraph_keeps_links_inside_the_window() {
        let mut query = CenterPointQuery::new(ring());
        query.query(0, 1).unwrap();

        let subgraph = query.to_subgraph();

        assert_eq!(subgraph.node_ids().collect::<Vec<_>>(), [0, 1, 3]);
        assert_eq!(subgraph.edge_count(), 2);
        assert_eq!(subgraph.center(), Some(0));
        assert_eq!(subgraph.node(0).unwrap().outgoing_edges().len(), 1);
        assert_eq!(subgraph.node(3).unwrap().position().x, 1.0);
    }

    fn arbitrary_graph() -> impl Strategy<Value = Arc<AssemblyGraph>> {
        (1usize..24)
            .prop_flat_map(|nodes| {
                let edges = proptest::collection::vec((0..nodes, 0..nodes), 0..48);
                (Just(nodes), edges)
            })
            .prop_map(|(nodes, edges)| {
                let mut builder = GraphBuilder::new("arbitrary.gfa");
                for index in 0..nodes {
                    builder.add_segment(&index.to_string(), 1, index as u64);
                }
                for (from, to) in edges {
                    builder.add_link(from as NodeId, to as NodeId, 0);
                }
                Arc::new(builder.build())
            })
    }

    proptest! {
        #[test]
        fn windows_contain_the_center_and_grow_with_radius(
            graph in arbitrary_graph(),
            center_seed in any::<u32>(),
            radius in 0usize..8,
        ) {
            let center = center_seed % graph.node_count() as u32;
            let mut query = CenterPointQuery::new(graph);

            let smaller = query.query(center, radius).unwrap().clone();
            let larger = query.query(center, radius + 1).unwrap().clone();

            prop_assert!(smaller.contains(&center));
            prop_assert!(smaller.is_subset(&larger));
        }
    }
}
