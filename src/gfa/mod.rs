//! GFA 1 reading: topology at load time, segment records on demand.

mod graph;
mod metadata;
mod parse;

use thiserror::Error;

pub use graph::{AssemblyGraph, GenomePath, GraphBuilder, LinkRecord, SegmentRecord};
pub use metadata::GfaMetadataReader;
pub use parse::load_gfa;

#[derive(Debug, Error)]
pub enum GfaError {
    #[error("failed to read GFA file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("line {line}: unknown segment {name:?}")]
    UnknownSegment { line: usize, name: String },
}
