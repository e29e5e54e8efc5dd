use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::parse::parse_segment_line;
use crate::cache::{MetadataError, MetadataSource};
use crate::model::{ByteOffset, NodeId, NodeMetadata};

/// Reads segment records straight from the GFA file by byte offset.
#[derive(Clone, Debug)]
pub struct GfaMetadataReader {
    path: PathBuf,
}

impl GfaMetadataReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataSource for GfaMetadataReader {
    fn parse_node_metadata(
        &self,
        requests: &IndexMap<NodeId, ByteOffset>,
    ) -> Result<HashMap<NodeId, NodeMetadata>, MetadataError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut position: ByteOffset = 0;
        let mut line = String::new();
        let mut parsed = HashMap::with_capacity(requests.len());

        for (&id, &offset) in requests {
            // Ascending offsets keep this a forward scan inside the buffer.
            if offset >= position {
                reader.seek_relative((offset - position) as i64)?;
            } else {
                reader.seek(SeekFrom::Start(offset))?;
            }

            line.clear();
            let read = reader.read_line(&mut line)?;
            position = offset + read as ByteOffset;

            let segment = parse_segment_line(&line)
                .map_err(|reason| MetadataError::Parse { offset, reason })?;
            let genomes = segment.genomes.iter().map(|genome| (*genome).to_owned()).collect();
            parsed.insert(id, NodeMetadata::new(segment.name, segment.sequence, genomes));
        }

        debug!(
            path = %self.path.display(),
            records = parsed.len(),
            "read segment metadata"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const GFA: &str = "H\tVN:Z:1.0\nS\ta\tACGT\tORI:Z:g1\nS\tb\tGG\tORI:Z:g1;g2\nL\ta\t+\tb\t+\t0M\n";

    fn reader() -> (tempfile::NamedTempFile, GfaMetadataReader) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GFA.as_bytes()).unwrap();
        let reader = GfaMetadataReader::new(file.path());
        (file, reader)
    }

    #[test]
    fn reads_requested_segments() {
        let (_file, reader) = reader();
        let requests = IndexMap::from([(0, 11), (1, 29)]);

        let parsed = reader.parse_node_metadata(&requests).unwrap();

        assert_eq!(parsed[&0].name(), "a");
        assert_eq!(parsed[&0].sequence(), "ACGT");
        assert_eq!(parsed[&1].genomes(), ["g1", "g2"]);
    }

    #[test]
    fn backward_offsets_still_resolve() {
        let (_file, reader) = reader();
        let requests = IndexMap::from([(1, 29), (0, 11)]);

        let parsed = reader.parse_node_metadata(&requests).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&1].sequence(), "GG");
    }

    #[test]
    fn offset_off_a_segment_record_fails_the_batch() {
        let (_file, reader) = reader();
        let requests = IndexMap::from([(0, 11), (1, 13)]);

        let error = reader.parse_node_metadata(&requests).unwrap_err();

        assert!(matches!(error, MetadataError::Parse { offset: 13, .. }));
    }
}
