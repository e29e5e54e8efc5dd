use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use super::graph::{AssemblyGraph, GraphBuilder};
use super::GfaError;
use crate::model::{ByteOffset, NodeId};

const ORIGIN_TAG: &str = "ORI:Z:";
const LENGTH_TAG: &str = "LN:i:";

/// Fields of an `S` record that the viewer cares about.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SegmentLine<'a> {
    pub(crate) name: &'a str,
    pub(crate) sequence: &'a str,
    pub(crate) length: u64,
    pub(crate) genomes: Vec<&'a str>,
}

pub(crate) fn parse_segment_line(line: &str) -> Result<SegmentLine<'_>, String> {
    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
    if fields.next() != Some("S") {
        return Err("not a segment record".to_owned());
    }

    let name = fields
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| "segment record without a name".to_owned())?;
    let sequence = fields
        .next()
        .ok_or_else(|| format!("segment {name} has no sequence column"))?;

    let mut length = if sequence == "*" {
        0
    } else {
        sequence.len() as u64
    };
    let mut genomes = Vec::new();

    for tag in fields {
        if let Some(value) = tag.strip_prefix(ORIGIN_TAG) {
            genomes.extend(value.split(';').filter(|genome| !genome.is_empty()));
        } else if let Some(value) = tag.strip_prefix(LENGTH_TAG)
            && sequence == "*"
        {
            length = value
                .parse()
                .map_err(|_| format!("segment {name} has an invalid length tag {value:?}"))?;
        }
    }

    Ok(SegmentLine {
        name,
        sequence,
        length,
        genomes,
    })
}

struct PendingLink {
    line: usize,
    from: String,
    to: String,
    byte_offset: ByteOffset,
}

struct PendingPath {
    line: usize,
    name: String,
    steps: Vec<String>,
}

/// Reads the topology of a GFA 1 file in one forward pass.
///
/// Sequences are not kept; every segment and link remembers the byte offset
/// of its record so metadata can be fetched later.
pub fn load_gfa(path: &Path) -> Result<AssemblyGraph, GfaError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut builder = GraphBuilder::new(path);

    let mut links = Vec::new();
    let mut paths = Vec::new();
    let mut origins: Vec<(String, Vec<NodeId>)> = Vec::new();
    let mut origin_index: HashMap<String, usize> = HashMap::new();

    let mut line = String::new();
    let mut offset: ByteOffset = 0;
    let mut line_number = 0usize;

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        line_number += 1;
        let record_offset = offset;
        offset += read as ByteOffset;

        let record = line.trim_end_matches(['\r', '\n']);
        let mut fields = record.split('\t');
        match fields.next() {
            Some("S") => {
                let segment = parse_segment_line(record).map_err(|reason| GfaError::Malformed {
                    line: line_number,
                    reason,
                })?;
                if builder.node_id(segment.name).is_some() {
                    warn!(line = line_number, name = segment.name, "ignoring repeated segment record");
                    continue;
                }
                let id = builder.add_segment(segment.name, segment.length, record_offset);
                for genome in segment.genomes {
                    let index = *origin_index.entry(genome.to_owned()).or_insert_with(|| {
                        origins.push((genome.to_owned(), Vec::new()));
                        origins.len() - 1
                    });
                    origins[index].1.push(id);
                }
            }
            Some("L") => {
                let (Some(from), Some(_), Some(to)) = (fields.next(), fields.next(), fields.next())
                else {
                    return Err(GfaError::Malformed {
                        line: line_number,
                        reason: "link record needs from, orientation and to columns".to_owned(),
                    });
                };
                links.push(PendingLink {
                    line: line_number,
                    from: from.to_owned(),
                    to: to.to_owned(),
                    byte_offset: record_offset,
                });
            }
            Some("P") => {
                let (Some(name), Some(steps)) = (fields.next(), fields.next()) else {
                    return Err(GfaError::Malformed {
                        line: line_number,
                        reason: "path record needs a name and a segment list".to_owned(),
                    });
                };
                paths.push(PendingPath {
                    line: line_number,
                    name: name.to_owned(),
                    steps: steps
                        .split(',')
                        .filter(|step| !step.is_empty())
                        .map(|step| step.trim_end_matches(['+', '-']).to_owned())
                        .collect(),
                });
            }
            _ => {}
        }
    }

    for link in links {
        let from = resolve(&builder, &link.from, link.line)?;
        let to = resolve(&builder, &link.to, link.line)?;
        builder.add_link(from, to, link.byte_offset);
    }

    for path in paths {
        let steps = path
            .steps
            .iter()
            .map(|step| resolve(&builder, step, path.line))
            .collect::<Result<Vec<_>, _>>()?;
        builder.add_genome_path(&path.name, steps);
    }

    if !builder.has_genome_paths() {
        debug!(
            genomes = origins.len(),
            "no path records, deriving genome paths from segment origins"
        );
        for (genome, steps) in origins {
            builder.add_genome_path(&genome, steps);
        }
    }

    let graph = builder.build();
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        genomes = graph.genome_paths().len(),
        "loaded assembly graph"
    );
    Ok(graph)
}

fn resolve(builder: &GraphBuilder, name: &str, line: usize) -> Result<NodeId, GfaError> {
    builder
        .node_id(name)
        .ok_or_else(|| GfaError::UnknownSegment {
            line,
            name: name.to_owned(),
        })
}
