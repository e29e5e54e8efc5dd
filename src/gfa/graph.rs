use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::model::{ByteOffset, NodeId};

#[derive(Clone, Debug)]
pub struct SegmentRecord {
    pub name: String,
    pub length: u64,
    pub byte_offset: ByteOffset,
}

#[derive(Clone, Copy, Debug)]
pub struct LinkRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub byte_offset: ByteOffset,
}

/// The ordered walk of one genome through the graph.
#[derive(Clone, Debug)]
pub struct GenomePath {
    pub name: String,
    pub steps: Vec<NodeId>,
}

/// Topology of a loaded file: everything except the per-segment sequence,
/// which stays on disk until a window needs it.
#[derive(Clone, Debug)]
pub struct AssemblyGraph {
    source: PathBuf,
    segments: Vec<SegmentRecord>,
    links: Vec<LinkRecord>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    ids_by_name: HashMap<String, NodeId>,
    genomes: Vec<GenomePath>,
}

impl AssemblyGraph {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn node_count(&self) -> usize {
        self.segments.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        (id as usize) < self.segments.len()
    }

    pub fn segment(&self, id: NodeId) -> Option<&SegmentRecord> {
        self.segments.get(id as usize)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn links_from(&self, id: NodeId) -> impl Iterator<Item = &LinkRecord> {
        self.outgoing
            .get(id as usize)
            .into_iter()
            .flatten()
            .map(|&index| &self.links[index])
    }

    pub fn links_to(&self, id: NodeId) -> impl Iterator<Item = &LinkRecord> {
        self.incoming
            .get(id as usize)
            .into_iter()
            .flatten()
            .map(|&index| &self.links[index])
    }

    /// Neighbours over both edge directions.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links_from(id)
            .map(|link| link.to)
            .chain(self.links_to(id).map(|link| link.from))
    }

    pub fn genome_paths(&self) -> &[GenomePath] {
        &self.genomes
    }

    pub fn genome_path(&self, name: &str) -> Option<&GenomePath> {
        self.genomes.iter().find(|path| path.name == name)
    }

    pub fn genome_names(&self) -> impl Iterator<Item = &str> {
        self.genomes.iter().map(|path| path.name.as_str())
    }
}

/// Incremental constructor used by the loader and by tests.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    source: PathBuf,
    segments: Vec<SegmentRecord>,
    links: Vec<LinkRecord>,
    ids_by_name: HashMap<String, NodeId>,
    genomes: Vec<GenomePath>,
}

impl GraphBuilder {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Registers a segment and returns its dense id. A repeated name keeps
    /// its first id.
    pub fn add_segment(&mut self, name: &str, length: u64, byte_offset: ByteOffset) -> NodeId {
        if let Some(&id) = self.ids_by_name.get(name) {
            return id;
        }

        let id = self.segments.len() as NodeId;
        self.segments.push(SegmentRecord {
            name: name.to_owned(),
            length,
            byte_offset,
        });
        self.ids_by_name.insert(name.to_owned(), id);
        id
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn add_link(&mut self, from: NodeId, to: NodeId, byte_offset: ByteOffset) {
        self.links.push(LinkRecord {
            from,
            to,
            byte_offset,
        });
    }

    pub fn add_genome_path(&mut self, name: &str, steps: Vec<NodeId>) {
        self.genomes.push(GenomePath {
            name: name.to_owned(),
            steps,
        });
    }

    pub fn has_genome_paths(&self) -> bool {
        !self.genomes.is_empty()
    }

    pub fn build(self) -> AssemblyGraph {
        let node_count = self.segments.len();
        let mut outgoing = vec![Vec::new(); node_count];
        let mut incoming = vec![Vec::new(); node_count];

        for (index, link) in self.links.iter().enumerate() {
            if let Some(list) = outgoing.get_mut(link.from as usize) {
                list.push(index);
            }
            if let Some(list) = incoming.get_mut(link.to as usize) {
                list.push(index);
            }
        }

        AssemblyGraph {
            source: self.source,
            segments: self.segments,
            links: self.links,
            outgoing,
            incoming,
            ids_by_name: self.ids_by_name,
            genomes: self.genomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_cover_both_directions() {
        let mut builder = GraphBuilder::new("mem.gfa");
        let a = builder.add_segment("a", 3, 0);
        let b = builder.add_segment("b", 3, 10);
        let c = builder.add_segment("c", 3, 20);
        builder.add_link(a, b, 30);
        builder.add_link(c, b, 40);
        let graph = builder.build();

        let mut around_b = graph.neighbors(b).collect::<Vec<_>>();
        around_b.sort_unstable();

        assert_eq!(around_b, [a, c]);
        assert_eq!(graph.neighbors(a).collect::<Vec<_>>(), [b]);
        assert_eq!(graph.neighbors(99).count(), 0);
    }

    #[test]
    fn repeated_segment_names_keep_their_first_id() {
        let mut builder = GraphBuilder::new("mem.gfa");
        let first = builder.add_segment("a", 3, 0);
        let again = builder.add_segment("a", 5, 40);
        let graph = builder.build();

        assert_eq!(first, again);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node_id("a"), Some(first));
        assert_eq!(graph.segment(first).map(|segment| segment.length), Some(3));
    }
}
