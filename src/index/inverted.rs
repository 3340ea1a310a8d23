//! Inverted index: lemma to posting list
//!
//! Built in a single streaming pass over the forward index. Each output line
//! is `lemma-id|df|doc1:tf1,doc2:tf2,...` where df equals the posting count.
//! Posting order within a list is document-arrival order and is not a stable
//! contract across rebuilds.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{PapyrusError, Result};
use crate::index::forward::ForwardIndexReader;
use crate::index::types::{LemmaId, Posting};
use crate::tokenizer::term_frequencies;

/// How often build progress is reported, in documents
const PROGRESS_INTERVAL: usize = 5_000;

/// One inverted-index record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvertedEntry {
    pub lemma: LemmaId,
    pub df: u32,
    pub postings: Vec<Posting>,
}

impl InvertedEntry {
    /// Parse an inverted-index line. Malformed `doc:tf` tokens inside the
    /// posting list are skipped without error; a malformed record shape is
    /// reported.
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.splitn(3, '|').collect();
        if fields.len() != 3 {
            return Err(format!("expected 3 pipe-delimited fields, got {}", fields.len()));
        }
        let lemma: i32 = fields[0]
            .parse()
            .map_err(|_| format!("bad lemma id {:?}", fields[0]))?;
        let df: u32 = fields[1]
            .parse()
            .map_err(|_| format!("bad df field {:?}", fields[1]))?;

        let postings = fields[2]
            .split(',')
            .filter(|t| !t.is_empty())
            .filter_map(|token| {
                let (doc_id, tf) = token.rsplit_once(':')?;
                let tf: u32 = tf.parse().ok()?;
                if doc_id.is_empty() {
                    return None;
                }
                Some(Posting::new(doc_id, tf))
            })
            .collect();

        Ok(Self {
            lemma: LemmaId(lemma),
            df,
            postings,
        })
    }

    pub fn to_line(&self) -> String {
        let postings = self
            .postings
            .iter()
            .map(|p| format!("{}:{}", p.doc_id, p.tf))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}|{}|{}", self.lemma, self.df, postings)
    }
}

/// Accumulates posting lists from forward-index records
#[derive(Debug, Default)]
pub struct InvertedIndexBuilder {
    index: HashMap<LemmaId, Vec<Posting>>,
    total_documents: usize,
}

impl InvertedIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream the forward index file and accumulate posting lists
    pub fn build_from_forward(&mut self, forward_path: &Path) -> Result<()> {
        info!(input = %forward_path.display(), "building inverted index");

        for entry in ForwardIndexReader::open(forward_path)? {
            let entry = entry?;
            let freqs = term_frequencies(entry.all_lemmas());
            for (lemma, tf) in freqs {
                self.index
                    .entry(lemma)
                    .or_default()
                    .push(Posting::new(entry.doc_id.clone(), tf));
            }

            self.total_documents += 1;
            if self.total_documents % PROGRESS_INTERVAL == 0 {
                info!(documents = self.total_documents, "inverted index progress");
            }
        }

        info!(
            documents = self.total_documents,
            unique_lemmas = self.index.len(),
            "inverted index built"
        );
        Ok(())
    }

    /// Write the index, one line per lemma, ordered by lemma id
    pub fn save(&self, output: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(output)?);

        let mut lemmas: Vec<&LemmaId> = self.index.keys().collect();
        lemmas.sort();

        for lemma in lemmas {
            let postings = &self.index[lemma];
            let entry = InvertedEntry {
                lemma: *lemma,
                df: postings.len() as u32,
                postings: postings.clone(),
            };
            writeln!(out, "{}", entry.to_line())?;
        }

        out.flush()?;
        info!(
            lemmas = self.index.len(),
            output = %output.display(),
            "inverted index written"
        );
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.total_documents
    }

    pub fn lemma_count(&self) -> usize {
        self.index.len()
    }

    /// Document frequency of a lemma (0 when absent)
    pub fn document_frequency(&self, lemma: LemmaId) -> u32 {
        self.index.get(&lemma).map(|p| p.len() as u32).unwrap_or(0)
    }

    pub fn postings(&self, lemma: LemmaId) -> Option<&[Posting]> {
        self.index.get(&lemma).map(|p| p.as_slice())
    }
}

/// Streaming reader over an inverted index file, reporting malformed records
/// with their byte offset
pub struct InvertedIndexReader {
    lines: std::io::Lines<BufReader<File>>,
    path: std::path::PathBuf,
    offset: u64,
}

impl InvertedIndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|_| PapyrusError::IndexMissing {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.to_path_buf(),
            offset: 0,
        })
    }
}

impl Iterator for InvertedIndexReader {
    type Item = Result<InvertedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let record_offset = self.offset;
            self.offset += line.len() as u64 + 1;

            if line.is_empty() {
                continue;
            }
            return Some(InvertedEntry::parse(&line).map_err(|detail| {
                PapyrusError::malformed(
                    &self.path,
                    format!("byte offset {record_offset}: {detail}"),
                )
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_small_fixture() {
        // Forward index for {PMC1: "cat cat dog", PMC2: "cats"} with
        // cat/cats -> 42, dog -> 7
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("forward_index.txt");
        fs::write(&forward, "PMC1|3|42,42,7||\nPMC2|1|42||\n").unwrap();

        let mut builder = InvertedIndexBuilder::new();
        builder.build_from_forward(&forward).unwrap();

        assert_eq!(builder.document_count(), 2);
        assert_eq!(builder.lemma_count(), 2);
        assert_eq!(builder.document_frequency(LemmaId(42)), 2);
        assert_eq!(builder.document_frequency(LemmaId(7)), 1);

        let postings = builder.postings(LemmaId(42)).unwrap();
        assert_eq!(postings, &[Posting::new("PMC1", 2), Posting::new("PMC2", 1)]);
        assert_eq!(
            builder.postings(LemmaId(7)).unwrap(),
            &[Posting::new("PMC1", 1)]
        );
    }

    #[test]
    fn test_save_and_reread() {
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("forward_index.txt");
        fs::write(&forward, "PMC1|3|42,42,7||\nPMC2|1|42||\n").unwrap();

        let mut builder = InvertedIndexBuilder::new();
        builder.build_from_forward(&forward).unwrap();

        let inverted = dir.path().join("inverted_index.txt");
        builder.save(&inverted).unwrap();

        let content = fs::read_to_string(&inverted).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["7|1|PMC1:1", "42|2|PMC1:2,PMC2:1"]);

        let entries: Vec<InvertedEntry> = InvertedIndexReader::open(&inverted)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].df, 2);
        assert_eq!(entries[1].postings.len(), 2);
    }

    #[test]
    fn test_parse_skips_malformed_postings() {
        let entry = InvertedEntry::parse("42|3|PMC1:2,garbage,PMC2:x,PMC3:1").unwrap();
        assert_eq!(entry.df, 3);
        assert_eq!(
            entry.postings,
            vec![Posting::new("PMC1", 2), Posting::new("PMC3", 1)]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_record() {
        assert!(InvertedEntry::parse("42|nodf").is_err());
        assert!(InvertedEntry::parse("notanint|2|PMC1:1").is_err());
    }

    #[test]
    fn test_tf_counts_span_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("forward_index.txt");
        // Lemma 5 appears once per section: tf must be 3
        fs::write(&forward, "PMC1|3|5|5|5\n").unwrap();

        let mut builder = InvertedIndexBuilder::new();
        builder.build_from_forward(&forward).unwrap();

        assert_eq!(
            builder.postings(LemmaId(5)).unwrap(),
            &[Posting::new("PMC1", 3)]
        );
    }
}
