use std::collections::BTreeSet;

use super::node::{ByteOffset, NodeId};
use super::ModelError;

/// Edge identity, independent of the endpoints. Ids are handed out by the
/// [`Subgraph`](super::Subgraph) that owns the edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Endpoints {
    id: EdgeId,
    from: NodeId,
    to: NodeId,
    genomes: Option<BTreeSet<String>>,
}

impl Endpoints {
    fn new(id: EdgeId, from: NodeId, to: NodeId) -> Self {
        Self {
            id,
            from,
            to,
            genomes: None,
        }
    }
}

/// A real link between two segments, addressed in the source file.
#[derive(Clone, Debug)]
pub struct Link {
    endpoints: Endpoints,
    byte_offset: ByteOffset,
}

impl Link {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, byte_offset: ByteOffset) -> Self {
        Self {
            endpoints: Endpoints::new(id, from, to),
            byte_offset,
        }
    }

    pub fn byte_offset(&self) -> ByteOffset {
        self.byte_offset
    }
}

/// A real edge without a file record.
#[derive(Clone, Debug)]
pub struct SimpleEdge {
    endpoints: Endpoints,
}

impl SimpleEdge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId) -> Self {
        Self {
            endpoints: Endpoints::new(id, from, to),
        }
    }
}

/// Several real edges bundled between the same merged endpoints.
#[derive(Clone, Debug)]
pub struct AggregateEdge {
    endpoints: Endpoints,
    edges: Vec<Edge>,
}

impl AggregateEdge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, edges: Vec<Edge>) -> Result<Self, ModelError> {
        if edges.is_empty() {
            return Err(ModelError::EmptyAggregate);
        }

        let mut endpoints = Endpoints::new(id, from, to);
        for edge in &edges {
            if let Some(genomes) = edge.genomes() {
                endpoints
                    .genomes
                    .get_or_insert_with(BTreeSet::new)
                    .extend(genomes.iter().cloned());
            }
        }

        Ok(Self { endpoints, edges })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// Layout-only edge segment standing in for part of a longer real edge.
///
/// It refers back to the real edge by id and carries no genomes of its own;
/// [`Subgraph::edge_genomes`](super::Subgraph::edge_genomes) resolves them
/// through the original.
#[derive(Clone, Debug)]
pub struct DummyEdge {
    endpoints: Endpoints,
    original: EdgeId,
}

impl DummyEdge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, original: &Edge) -> Self {
        Self {
            endpoints: Endpoints::new(id, from, to),
            original: original.original_id(),
        }
    }

    pub fn original(&self) -> EdgeId {
        self.original
    }
}

#[derive(Clone, Debug)]
pub enum Edge {
    Link(Link),
    Simple(SimpleEdge),
    Aggregate(AggregateEdge),
    Dummy(DummyEdge),
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.endpoints().id
    }

    /// The real edge this one stands for: itself, or a dummy's original.
    /// Chained dummies always resolve to the real edge.
    pub fn original_id(&self) -> EdgeId {
        match self {
            Self::Dummy(dummy) => dummy.original,
            _ => self.id(),
        }
    }

    pub fn source(&self) -> NodeId {
        self.endpoints().from
    }

    pub fn target(&self) -> NodeId {
        self.endpoints().to
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::Dummy(_))
    }

    /// Genomes recorded on this edge itself. Dummies record none.
    pub fn genomes(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Dummy(_) => None,
            _ => self.endpoints().genomes.as_ref(),
        }
    }

    /// Records that `genome` runs over this edge. Dummies ignore it.
    pub fn add_genome(&mut self, genome: &str) {
        let endpoints = match self {
            Self::Link(link) => &mut link.endpoints,
            Self::Simple(simple) => &mut simple.endpoints,
            Self::Aggregate(aggregate) => &mut aggregate.endpoints,
            Self::Dummy(_) => return,
        };
        endpoints
            .genomes
            .get_or_insert_with(BTreeSet::new)
            .insert(genome.to_owned());
    }

    fn endpoints(&self) -> &Endpoints {
        match self {
            Self::Link(link) => &link.endpoints,
            Self::Simple(simple) => &simple.endpoints,
            Self::Aggregate(aggregate) => &aggregate.endpoints,
            Self::Dummy(dummy) => &dummy.endpoints,
        }
    }
}

impl From<Link> for Edge {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

impl From<SimpleEdge> for Edge {
    fn from(edge: SimpleEdge) -> Self {
        Self::Simple(edge)
    }
}

impl From<AggregateEdge> for Edge {
    fn from(edge: AggregateEdge) -> Self {
        Self::Aggregate(edge)
    }
}

impl From<DummyEdge> for Edge {
    fn from(edge: DummyEdge) -> Self {
        Self::Dummy(edge)
    }
}
