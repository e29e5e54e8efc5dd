use std::collections::BTreeSet;
use std::sync::Arc;

use super::edge::EdgeId;
use super::metadata::NodeMetadata;
use super::ModelError;

pub type NodeId = u32;
pub type ByteOffset = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

pub trait Positionable {
    fn position(&self) -> Position;
    fn set_position(&mut self, position: Position);
}

pub trait HasLength {
    fn length(&self) -> u64;
}

pub trait HasEdges {
    fn incoming_edges(&self) -> &[EdgeId];
    fn outgoing_edges(&self) -> &[EdgeId];
    fn add_incoming_edge(&mut self, edge: EdgeId);
    fn add_outgoing_edge(&mut self, edge: EdgeId);
    /// Forgets `edge` in both directions.
    fn remove_edge(&mut self, edge: EdgeId);
}

pub trait HasMetadata {
    /// Returns the metadata attached so far, or an error for nodes that can
    /// never carry any.
    fn metadata(&self) -> Result<Option<Arc<NodeMetadata>>, ModelError>;

    fn has_metadata(&self) -> bool {
        matches!(self.metadata(), Ok(Some(_)))
    }
}

#[derive(Clone, Debug, Default)]
struct Adjacency {
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

/// A real segment backed by a record in the source file.
#[derive(Clone, Debug)]
pub struct Segment {
    id: NodeId,
    byte_offset: ByteOffset,
    length: u64,
    position: Position,
    adjacency: Adjacency,
    metadata: Option<Arc<NodeMetadata>>,
    genomes: Option<BTreeSet<String>>,
}

impl Segment {
    pub fn new(id: NodeId, byte_offset: ByteOffset, length: u64) -> Self {
        Self {
            id,
            byte_offset,
            length,
            position: Position::default(),
            adjacency: Adjacency::default(),
            metadata: None,
            genomes: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn byte_offset(&self) -> ByteOffset {
        self.byte_offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn metadata(&self) -> Option<&Arc<NodeMetadata>> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Arc<NodeMetadata>) {
        self.metadata = Some(metadata);
    }

    pub fn genomes(&self) -> Option<&BTreeSet<String>> {
        self.genomes.as_ref()
    }

    pub fn add_genome(&mut self, genome: &str) {
        self.genomes
            .get_or_insert_with(BTreeSet::new)
            .insert(genome.to_owned());
    }
}

/// A merged view over several segments collapsed into one drawable node.
#[derive(Clone, Debug)]
pub struct AggregateSegment {
    segments: Vec<Segment>,
    position: Position,
    adjacency: Adjacency,
    genomes: Option<BTreeSet<String>>,
}

impl AggregateSegment {
    pub fn new(segments: Vec<Segment>) -> Result<Self, ModelError> {
        if segments.is_empty() {
            return Err(ModelError::EmptyAggregate);
        }

        Ok(Self {
            segments,
            position: Position::default(),
            adjacency: Adjacency::default(),
            genomes: None,
        })
    }

    /// The aggregate is addressed by its first segment.
    pub fn id(&self) -> NodeId {
        self.segments[0].id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Layout-only placeholder used to route long edges across layers.
#[derive(Clone, Debug)]
pub struct DummyNode {
    id: NodeId,
    position: Position,
    adjacency: Adjacency,
}

impl DummyNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            position: Position::default(),
            adjacency: Adjacency::default(),
        }
    }
}

/// Layout-only spacer with a width but no genomic content.
#[derive(Clone, Debug)]
pub struct FillNode {
    id: NodeId,
    width: u64,
    position: Position,
    adjacency: Adjacency,
}

impl FillNode {
    pub fn new(id: NodeId, width: u64) -> Self {
        Self {
            id,
            width,
            position: Position::default(),
            adjacency: Adjacency::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Segment,
    AggregateSegment,
    Dummy,
    Fill,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::AggregateSegment => "aggregate segment",
            Self::Dummy => "dummy node",
            Self::Fill => "fill node",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Node {
    Segment(Segment),
    AggregateSegment(AggregateSegment),
    Dummy(DummyNode),
    Fill(FillNode),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Segment(segment) => segment.id,
            Self::AggregateSegment(aggregate) => aggregate.id(),
            Self::Dummy(dummy) => dummy.id,
            Self::Fill(fill) => fill.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Segment(_) => NodeKind::Segment,
            Self::AggregateSegment(_) => NodeKind::AggregateSegment,
            Self::Dummy(_) => NodeKind::Dummy,
            Self::Fill(_) => NodeKind::Fill,
        }
    }

    /// The real segments backing this node; empty for layout placeholders.
    pub fn segments(&self) -> &[Segment] {
        match self {
            Self::Segment(segment) => std::slice::from_ref(segment),
            Self::AggregateSegment(aggregate) => &aggregate.segments,
            Self::Dummy(_) | Self::Fill(_) => &[],
        }
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        match self {
            Self::Segment(segment) => std::slice::from_mut(segment),
            Self::AggregateSegment(aggregate) => &mut aggregate.segments,
            Self::Dummy(_) | Self::Fill(_) => &mut [],
        }
    }

    pub fn genomes(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Segment(segment) => segment.genomes.as_ref(),
            Self::AggregateSegment(aggregate) => aggregate.genomes.as_ref(),
            Self::Dummy(_) | Self::Fill(_) => None,
        }
    }

    /// Records that `genome` traverses this node. Placeholders ignore it.
    pub fn add_genome(&mut self, genome: &str) {
        let genomes = match self {
            Self::Segment(segment) => &mut segment.genomes,
            Self::AggregateSegment(aggregate) => &mut aggregate.genomes,
            Self::Dummy(_) | Self::Fill(_) => return,
        };
        genomes
            .get_or_insert_with(BTreeSet::new)
            .insert(genome.to_owned());
    }

    pub(super) fn clear_edges(&mut self) {
        *self.adjacency_mut() = Adjacency::default();
    }

    fn adjacency(&self) -> &Adjacency {
        match self {
            Self::Segment(segment) => &segment.adjacency,
            Self::AggregateSegment(aggregate) => &aggregate.adjacency,
            Self::Dummy(dummy) => &dummy.adjacency,
            Self::Fill(fill) => &fill.adjacency,
        }
    }

    fn adjacency_mut(&mut self) -> &mut Adjacency {
        match self {
            Self::Segment(segment) => &mut segment.adjacency,
            Self::AggregateSegment(aggregate) => &mut aggregate.adjacency,
            Self::Dummy(dummy) => &mut dummy.adjacency,
            Self::Fill(fill) => &mut fill.adjacency,
        }
    }
}

impl From<Segment> for Node {
    fn from(segment: Segment) -> Self {
        Self::Segment(segment)
    }
}

impl From<AggregateSegment> for Node {
    fn from(aggregate: AggregateSegment) -> Self {
        Self::AggregateSegment(aggregate)
    }
}

impl Positionable for Node {
    fn position(&self) -> Position {
        match self {
            Self::Segment(segment) => segment.position,
            Self::AggregateSegment(aggregate) => aggregate.position,
            Self::Dummy(dummy) => dummy.position,
            Self::Fill(fill) => fill.position,
        }
    }

    fn set_position(&mut self, position: Position) {
        match self {
            Self::Segment(segment) => segment.position = position,
            Self::AggregateSegment(aggregate) => aggregate.position = position,
            Self::Dummy(dummy) => dummy.position = position,
            Self::Fill(fill) => fill.position = position,
        }
    }
}

impl HasLength for Node {
    fn length(&self) -> u64 {
        match self {
            Self::Segment(segment) => segment.length,
            // Collapsed paths are drawn at the size of their last member.
            Self::AggregateSegment(aggregate) => aggregate
                .segments
                .last()
                .map_or(0, |segment| segment.length),
            Self::Dummy(_) => 0,
            Self::Fill(fill) => fill.width,
        }
    }
}

impl HasEdges for Node {
    fn incoming_edges(&self) -> &[EdgeId] {
        &self.adjacency().incoming
    }

    fn outgoing_edges(&self) -> &[EdgeId] {
        &self.adjacency().outgoing
    }

    fn add_incoming_edge(&mut self, edge: EdgeId) {
        self.adjacency_mut().incoming.push(edge);
    }

    fn add_outgoing_edge(&mut self, edge: EdgeId) {
        self.adjacency_mut().outgoing.push(edge);
    }

    fn remove_edge(&mut self, edge: EdgeId) {
        let adjacency = self.adjacency_mut();
        adjacency.incoming.retain(|&id| id != edge);
        adjacency.outgoing.retain(|&id| id != edge);
    }
}

impl HasMetadata for Node {
    fn metadata(&self) -> Result<Option<Arc<NodeMetadata>>, ModelError> {
        match self {
            Self::Segment(segment) => Ok(segment.metadata.clone()),
            Self::AggregateSegment(aggregate) => {
                let parts = aggregate
                    .segments
                    .iter()
                    .map(|segment| segment.metadata.as_deref())
                    .collect::<Option<Vec<_>>>();
                Ok(parts.map(|parts| Arc::new(NodeMetadata::merge(parts))))
            }
            Self::Dummy(_) | Self::Fill(_) => Err(ModelError::MetadataUnsupported(self.kind())),
        }
    }

    fn has_metadata(&self) -> bool {
        let segments = self.segments();
        !segments.is_empty() && segments.iter().all(|segment| segment.metadata.is_some())
    }
}
