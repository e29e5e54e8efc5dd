use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Sequence-level data for a segment, read lazily from the source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    name: String,
    sequence: String,
    genomes: Vec<String>,
}

impl NodeMetadata {
    pub fn new(name: impl Into<String>, sequence: impl Into<String>, genomes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
            genomes,
        }
    }

    /// Combines the metadata of several segments into one value.
    ///
    /// Names and sequences are rendered as bracketed lists (`[a, b]`), and the
    /// genome lists are unioned keeping the order in which each genome was
    /// first seen.
    pub fn merge<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a NodeMetadata>,
    {
        let mut names = Vec::new();
        let mut sequences = Vec::new();
        let mut genomes = Vec::new();
        let mut seen = HashSet::new();

        for item in items {
            names.push(item.name.as_str());
            sequences.push(item.sequence.as_str());
            for genome in &item.genomes {
                if seen.insert(genome.as_str()) {
                    genomes.push(genome.clone());
                }
            }
        }

        Self {
            name: format!("[{}]", names.join(", ")),
            sequence: format!("[{}]", sequences.join(", ")),
            genomes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn genomes(&self) -> &[String] {
        &self.genomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_nothing_yields_empty_lists() {
        let merged = NodeMetadata::merge(std::iter::empty());

        assert_eq!(merged.name(), "[]");
        assert_eq!(merged.sequence(), "[]");
        assert!(merged.genomes().is_empty());
    }

    #[test]
    fn merging_unions_genomes_in_first_seen_order() {
        let first = NodeMetadata::new("s1", "ACGT", vec!["A".into(), "B".into()]);
        let second = NodeMetadata::new("s2", "TT", vec!["B".into(), "C".into()]);

        let merged = NodeMetadata::merge([&first, &second]);

        assert_eq!(merged.name(), "[s1, s2]");
        assert_eq!(merged.sequence(), "[ACGT, TT]");
        assert_eq!(merged.genomes(), ["A", "B", "C"]);
    }
}
