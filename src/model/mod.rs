//! In-memory representation of the materialized graph window.

mod edge;
mod metadata;
mod node;
mod subgraph;

use thiserror::Error;

pub use edge::{AggregateEdge, DummyEdge, Edge, EdgeId, Link, SimpleEdge};
pub use metadata::NodeMetadata;
pub use node::{
    AggregateSegment, ByteOffset, DummyNode, FillNode, HasEdges, HasLength, HasMetadata, Node,
    NodeId, NodeKind, Position, Positionable, Segment,
};
pub use subgraph::Subgraph;

/// Caller bugs: operations that make no sense for the value they target.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("an aggregate needs at least one member")]
    EmptyAggregate,
    #[error("a {} never carries metadata", .0.label())]
    MetadataUnsupported(NodeKind),
}
