//! Forward index: per-document lemma sequences
//!
//! Each corpus document becomes one pipe-delimited line:
//!
//! `doc-id|total-terms|title-lemmas|abstract-lemmas|body-lemmas`
//!
//! with comma-separated lemma ids. The body sequence is capped at
//! [`BODY_LEMMA_CAP`] entries; `total-terms` counts the three sequences
//! after that cap is applied.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{PapyrusError, Result};
use crate::index::types::{DocId, LemmaId};
use crate::lexicon::Lexicon;
use crate::tokenizer::tokenize;

/// Maximum number of body lemmas retained per document
pub const BODY_LEMMA_CAP: usize = 5_000;

/// How often directory progress is reported, in input files
const PROGRESS_INTERVAL: usize = 1_000;

#[derive(Deserialize, Default)]
struct DocMetadata {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct DocSection {
    #[serde(default)]
    text: String,
}

/// On-disk shape of a corpus document
#[derive(Deserialize)]
struct CorpusDocument {
    #[serde(default)]
    metadata: DocMetadata,
    #[serde(rename = "abstract", default)]
    abstract_sections: Vec<DocSection>,
    #[serde(default)]
    body_text: Vec<DocSection>,
}

/// One forward-index record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardEntry {
    pub doc_id: DocId,
    pub total_terms: u32,
    pub title: Vec<LemmaId>,
    pub abstract_lemmas: Vec<LemmaId>,
    pub body: Vec<LemmaId>,
}

impl ForwardEntry {
    /// Build an entry from raw section texts, applying the body cap
    pub fn from_texts(doc_id: DocId, title: &str, abstract_text: &str, body: &str, lexicon: &Lexicon) -> Self {
        let title = lemma_sequence(title, lexicon);
        let abstract_lemmas = lemma_sequence(abstract_text, lexicon);
        let mut body = lemma_sequence(body, lexicon);
        body.truncate(BODY_LEMMA_CAP);

        let total_terms = (title.len() + abstract_lemmas.len() + body.len()) as u32;
        Self {
            doc_id,
            total_terms,
            title,
            abstract_lemmas,
            body,
        }
    }

    /// Parse a forward-index line. Returns a description of the defect on
    /// failure; the caller attaches file and offset context.
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 pipe-delimited fields, got {}", fields.len()));
        }
        if fields[0].is_empty() {
            return Err("empty doc id".to_string());
        }
        let total_terms: u32 = fields[1]
            .parse()
            .map_err(|_| format!("bad total-terms field {:?}", fields[1]))?;

        Ok(Self {
            doc_id: fields[0].to_string(),
            total_terms,
            title: parse_lemma_list(fields[2]),
            abstract_lemmas: parse_lemma_list(fields[3]),
            body: parse_lemma_list(fields[4]),
        })
    }

    /// Serialize back to the pipe-delimited line form
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.doc_id,
            self.total_terms,
            join_lemmas(&self.title),
            join_lemmas(&self.abstract_lemmas),
            join_lemmas(&self.body)
        )
    }

    /// All lemmas of the document, in sequence order
    pub fn all_lemmas(&self) -> impl Iterator<Item = LemmaId> + '_ {
        self.title
            .iter()
            .chain(&self.abstract_lemmas)
            .chain(&self.body)
            .copied()
    }
}

/// Tokenize text and map each token through the lexicon, dropping unknowns
pub fn lemma_sequence(text: &str, lexicon: &Lexicon) -> Vec<LemmaId> {
    tokenize(text)
        .iter()
        .filter_map(|token| lexicon.lemma_of(token))
        .collect()
}

/// Lenient lemma-list parser: malformed tokens are skipped without error
pub fn parse_lemma_list(field: &str) -> Vec<LemmaId> {
    field
        .split(',')
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<i32>().ok().map(LemmaId))
        .collect()
}

fn join_lemmas(lemmas: &[LemmaId]) -> String {
    lemmas
        .iter()
        .map(|l| l.0.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the forward index file from a directory of corpus documents
pub struct ForwardIndexBuilder<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> ForwardIndexBuilder<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Convert one corpus document. Returns `None` when the document yields
    /// no lemmas at all (such documents are skipped silently).
    pub fn process_document(&self, path: &Path) -> Result<Option<ForwardEntry>> {
        let data = fs::read_to_string(path)?;
        let doc: CorpusDocument =
            serde_json::from_str(&data).map_err(|e| PapyrusError::malformed(path, e.to_string()))?;

        let doc_id = doc_id_from_path(path);
        let abstract_text = concat_sections(&doc.abstract_sections);
        let body_text = concat_sections(&doc.body_text);

        let entry = ForwardEntry::from_texts(
            doc_id,
            &doc.metadata.title,
            &abstract_text,
            &body_text,
            self.lexicon,
        );

        if entry.total_terms == 0 {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Process every `.json` file in the corpus directory and write the
    /// forward index. Unreadable documents are logged and skipped.
    pub fn build(&self, corpus_dir: &Path, output: &Path) -> Result<BuildStats> {
        let mut paths: Vec<_> = fs::read_dir(corpus_dir)
            .map_err(|_| PapyrusError::IndexMissing {
                path: corpus_dir.to_path_buf(),
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut out = BufWriter::new(File::create(output)?);
        let mut stats = BuildStats::default();

        for path in &paths {
            stats.processed += 1;

            match self.process_document(path) {
                Ok(Some(entry)) => {
                    writeln!(out, "{}", entry.to_line())?;
                    stats.indexed += 1;
                    stats.total_terms += entry.total_terms as u64;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable document");
                    stats.skipped += 1;
                }
            }

            if stats.processed % PROGRESS_INTERVAL == 0 {
                info!(
                    processed = stats.processed,
                    indexed = stats.indexed,
                    "forward index progress"
                );
            }
        }

        out.flush()?;
        info!(
            documents = stats.indexed,
            total_terms = stats.total_terms,
            output = %output.display(),
            "forward index written"
        );
        Ok(stats)
    }
}

/// Counters reported by a forward-index build
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildStats {
    pub processed: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub total_terms: u64,
}

/// Streaming reader over a forward index file, reporting malformed records
/// with their byte offset
pub struct ForwardIndexReader {
    lines: std::io::Lines<BufReader<File>>,
    path: std::path::PathBuf,
    offset: u64,
}

impl ForwardIndexReader {
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

impl Iterator for ForwardIndexReader {
    type Item = Result<ForwardEntry>;

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
            return Some(ForwardEntry::parse(&line).map_err(|detail| {
                PapyrusError::malformed(
                    &self.path,
                    format!("byte offset {record_offset}: {detail}"),
                )
            }));
        }
    }
}

/// Doc id is the file name up to the first dot
fn doc_id_from_path(path: &Path) -> DocId {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or("").to_string()
}

fn concat_sections(sections: &[DocSection]) -> String {
    sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
