//! Binary barrel format: seek-by-lemma posting storage
//!
//! Each barrel is a `.bin`/`.idx` pair, little-endian throughout. A `.bin`
//! record is a 12-byte header (`i32` lemma id, `i32` df, `i32` num_docs,
//! with num_docs == df) followed by df postings of 24 bytes each: a 20-byte
//! zero-padded doc id and an `i32` term frequency. The `.idx` file starts
//! with an `i32` entry count and holds one (`i32` lemma id, `i64` offset,
//! `i64` length) record per lemma; it is loaded fully into memory at startup
//! while `.bin` is seeked on demand.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{info, warn};

use crate::barrel::partition::JsonBarrel;
use crate::error::{PapyrusError, Result};
use crate::index::types::{barrel_name, LemmaId, Posting, NUM_BARRELS, OVERFLOW_BARREL_ID};

/// Fixed byte width of a doc id field; byte 20 is always NUL
pub const DOC_ID_SIZE: usize = 20;

/// Header bytes per record: lemma id, df, num_docs
pub const RECORD_HEADER_SIZE: usize = 12;

/// Bytes per posting: doc id field plus tf
pub const POSTING_SIZE: usize = DOC_ID_SIZE + 4;

/// Resident `.idx` entry locating one lemma's record in `.bin`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: i64,
    pub length: i64,
}

fn i32_at(data: &[u8], pos: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[pos..pos + 4]);
    i32::from_le_bytes(bytes)
}

fn i64_at(data: &[u8], pos: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[pos..pos + 8]);
    i64::from_le_bytes(bytes)
}

/// A decoded posting record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrelRecord {
    pub lemma: LemmaId,
    pub df: u32,
    pub postings: Vec<Posting>,
}

/// Append one record to `bin` and its locator to `entries`
fn append_record(
    bin: &mut Vec<u8>,
    entries: &mut Vec<(LemmaId, IndexEntry)>,
    lemma: LemmaId,
    df: u32,
    postings: &[Posting],
) {
    let offset = bin.len() as i64;

    bin.extend_from_slice(&lemma.0.to_le_bytes());
    bin.extend_from_slice(&(df as i32).to_le_bytes());
    bin.extend_from_slice(&(postings.len() as i32).to_le_bytes());

    for posting in postings {
        let mut field = [0u8; DOC_ID_SIZE];
        let bytes = posting.doc_id.as_bytes();
        // Doc ids are capped at 19 bytes so the final byte stays NUL
        let len = bytes.len().min(DOC_ID_SIZE - 1);
        field[..len].copy_from_slice(&bytes[..len]);
        bin.extend_from_slice(&field);
        bin.extend_from_slice(&(posting.tf as i32).to_le_bytes());
    }

    let length = bin.len() as i64 - offset;
    entries.push((lemma, IndexEntry { offset, length }));
}

/// Serialize `.idx` entries
fn encode_idx(entries: &[(LemmaId, IndexEntry)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + entries.len() * 20);
    out.extend_from_slice(&(entries.len() as i32).to_le_bytes());
    for (lemma, entry) in entries {
        out.extend_from_slice(&lemma.0.to_le_bytes());
        out.extend_from_slice(&entry.offset.to_le_bytes());
        out.extend_from_slice(&entry.length.to_le_bytes());
    }
    out
}

/// Parse a `.bin` record, validating the header against the byte span
pub fn parse_record(data: &[u8], origin: &Path) -> Result<BarrelRecord> {
    if data.len() < RECORD_HEADER_SIZE {
        return Err(PapyrusError::malformed(
            origin,
            format!("record of {} bytes is shorter than the header", data.len()),
        ));
    }

    let lemma = i32_at(data, 0);
    let df = i32_at(data, 4);
    let num_docs = i32_at(data, 8);

    if df < 0 || num_docs != df {
        return Err(PapyrusError::malformed(
            origin,
            format!("lemma {lemma}: df {df} does not match num_docs {num_docs}"),
        ));
    }

    let expected = RECORD_HEADER_SIZE + df as usize * POSTING_SIZE;
    if data.len() != expected {
        return Err(PapyrusError::malformed(
            origin,
            format!(
                "lemma {lemma}: record is {} bytes, expected {expected} for df {df}",
                data.len()
            ),
        ));
    }

    let mut postings = Vec::with_capacity(df as usize);
    let mut pos = RECORD_HEADER_SIZE;
    for _ in 0..df {
        let doc_id = trim_doc_id(&data[pos..pos + DOC_ID_SIZE]);
        let tf = i32_at(data, pos + DOC_ID_SIZE);
        postings.push(Posting::new(doc_id, tf as u32));
        pos += POSTING_SIZE;
    }

    Ok(BarrelRecord {
        lemma: LemmaId(lemma),
        df: df as u32,
        postings,
    })
}

/// Doc id fields are trimmed at the first NUL
fn trim_doc_id(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Load an entire `.idx` file into a resident offset table
pub fn load_idx(path: &Path) -> Result<HashMap<LemmaId, IndexEntry>> {
    let data = fs::read(path).map_err(|_| PapyrusError::IndexMissing {
        path: path.to_path_buf(),
    })?;

    if data.len() < 4 {
        return Err(PapyrusError::malformed(path, "missing entry count"));
    }
    let num_entries = i32_at(&data, 0);
    let expected = 4 + num_entries as usize * 20;
    if num_entries < 0 || data.len() != expected {
        return Err(PapyrusError::malformed(
            path,
            format!(
                "file is {} bytes, expected {expected} for {num_entries} entries",
                data.len()
            ),
        ));
    }

    let mut table = HashMap::with_capacity(num_entries as usize);
    let mut pos = 4;
    for _ in 0..num_entries {
        let lemma = i32_at(&data, pos);
        let offset = i64_at(&data, pos + 4);
        let length = i64_at(&data, pos + 12);
        table.insert(LemmaId(lemma), IndexEntry { offset, length });
        pos += 20;
    }
    Ok(table)
}

/// Seek one record out of a `.bin` file and decode it
pub fn read_record(bin_path: &Path, entry: IndexEntry) -> Result<BarrelRecord> {
    let mut file = File::open(bin_path).map_err(|_| PapyrusError::IndexMissing {
        path: bin_path.to_path_buf(),
    })?;
    file.seek(SeekFrom::Start(entry.offset as u64))?;

    let mut buf = vec![0u8; entry.length as usize];
    file.read_exact(&mut buf)
        .map_err(|_| PapyrusError::malformed(bin_path, "record extends past end of file"))?;

    parse_record(&buf, bin_path)
}

/// Converts JSON barrels into `.bin`/`.idx` pairs
pub struct BinaryBarrelEncoder;

impl BinaryBarrelEncoder {
    /// Encode a loaded JSON barrel into its binary pair in memory
    pub fn encode(barrel: &JsonBarrel) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut bin = Vec::new();
        let mut entries = Vec::with_capacity(barrel.postings.len());

        for (lemma_key, term) in &barrel.postings {
            let lemma: i32 = lemma_key.parse().map_err(|_| {
                PapyrusError::malformed(
                    Path::new(&JsonBarrel::file_name(barrel.barrel_id)),
                    format!("non-numeric lemma key {lemma_key:?}"),
                )
            })?;
            append_record(&mut bin, &mut entries, LemmaId(lemma), term.df, &term.docs);
        }

        Ok((bin, encode_idx(&entries)))
    }

    /// Convert one JSON barrel file into `barrel_<name>.bin` / `.idx`
    pub fn convert_barrel(json_path: &Path, output_dir: &Path, name: &str) -> Result<usize> {
        let barrel = JsonBarrel::load(json_path)?;
        let (bin, idx) = Self::encode(&barrel)?;

        fs::write(output_dir.join(format!("barrel_{name}.bin")), &bin)?;
        fs::write(output_dir.join(format!("barrel_{name}.idx")), &idx)?;
        Ok(barrel.postings.len())
    }

    /// Convert all primary barrels plus the overflow barrel when present.
    /// Absent JSON barrels are skipped with a warning.
    pub fn convert_all(json_dir: &Path, output_dir: &Path) -> Result<usize> {
        fs::create_dir_all(output_dir)?;
        let mut converted = 0;

        let mut ids: Vec<u32> = (0..NUM_BARRELS as u32).collect();
        ids.push(OVERFLOW_BARREL_ID);

        for barrel_id in ids {
            let name = barrel_name(barrel_id);
            let json_path = json_dir.join(JsonBarrel::file_name(barrel_id));
            // The overflow barrel is named, not numbered
            let json_path = if barrel_id == OVERFLOW_BARREL_ID {
                json_dir.join(format!("inverted_barrel_{name}.json"))
            } else {
                json_path
            };

            if !json_path.is_file() {
                if barrel_id != OVERFLOW_BARREL_ID {
                    warn!(barrel = barrel_id, path = %json_path.display(), "JSON barrel not found, skipping");
                }
                continue;
            }

            let terms = Self::convert_barrel(&json_path, output_dir, &name)?;
            info!(barrel = %name, terms, "binary barrel written");
            converted += 1;
        }

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::barrel::partition::TermPostings;

    fn single_lemma_barrel() -> JsonBarrel {
        let mut postings = BTreeMap::new();
        postings.insert(
            "100".to_string(),
            TermPostings {
                df: 2,
                docs: vec![Posting::new("ABC", 5), Posting::new("XYZ", 1)],
            },
        );
        JsonBarrel {
            barrel_id: 7,
            tier: "COLD".to_string(),
            description: "Rare terms (df < 1k)".to_string(),
            num_terms: 1,
            postings,
        }
    }

    #[test]
    fn test_record_sizes() {
        // One lemma, df=2: .bin is 12 + 2*24 = 60 bytes, .idx is 4 + 20 = 24
        let (bin, idx) = BinaryBarrelEncoder::encode(&single_lemma_barrel()).unwrap();
        assert_eq!(bin.len(), 60);
        assert_eq!(idx.len(), 24);

        // The sole idx entry brackets the whole record
        assert_eq!(&idx[0..4], &1i32.to_le_bytes());
        assert_eq!(&idx[4..8], &100i32.to_le_bytes());
        assert_eq!(&idx[8..16], &0i64.to_le_bytes());
        assert_eq!(&idx[16..24], &60i64.to_le_bytes());
    }

    #[test]
    fn test_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("inverted_barrel_7.json");
        single_lemma_barrel().save(&json_path).unwrap();

        let terms = BinaryBarrelEncoder::convert_barrel(&json_path, dir.path(), "7").unwrap();
        assert_eq!(terms, 1);

        let idx = load_idx(&dir.path().join("barrel_7.idx")).unwrap();
        let entry = idx[&LemmaId(100)];
        assert_eq!(entry, IndexEntry { offset: 0, length: 60 });

        let record = read_record(&dir.path().join("barrel_7.bin"), entry).unwrap();
        assert_eq!(record.lemma, LemmaId(100));
        assert_eq!(record.df, 2);
        assert_eq!(
            record.postings,
            vec![Posting::new("ABC", 5), Posting::new("XYZ", 1)]
        );
    }

    #[test]
    fn test_doc_id_truncated_to_19_bytes() {
        let mut postings = BTreeMap::new();
        postings.insert(
            "1".to_string(),
            TermPostings {
                df: 1,
                docs: vec![Posting::new("A".repeat(30), 1)],
            },
        );
        let barrel = JsonBarrel {
            barrel_id: 7,
            tier: "COLD".to_string(),
            description: String::new(),
            num_terms: 1,
            postings,
        };

        let (bin, _) = BinaryBarrelEncoder::encode(&barrel).unwrap();
        let record = parse_record(&bin, Path::new("test")).unwrap();
        assert_eq!(record.postings[0].doc_id.len(), 19);
        // Byte 20 of the field stays NUL
        assert_eq!(bin[RECORD_HEADER_SIZE + DOC_ID_SIZE - 1], 0);
    }

    #[test]
    fn test_df_mismatch_is_malformed() {
        let (mut bin, _) = BinaryBarrelEncoder::encode(&single_lemma_barrel()).unwrap();
        // Corrupt num_docs
        bin[8..12].copy_from_slice(&9i32.to_le_bytes());

        let err = parse_record(&bin, Path::new("barrel_7.bin")).unwrap_err();
        assert!(matches!(err, PapyrusError::Malformed { .. }));
        assert!(err.to_string().contains("does not match num_docs"));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let (bin, _) = BinaryBarrelEncoder::encode(&single_lemma_barrel()).unwrap();
        let err = parse_record(&bin[..bin.len() - 4], Path::new("barrel_7.bin")).unwrap_err();
        assert!(matches!(err, PapyrusError::Malformed { .. }));
    }

    #[test]
    fn test_idx_rejects_truncation() {
        let (_, idx) = BinaryBarrelEncoder::encode(&single_lemma_barrel()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barrel_7.idx");
        fs::write(&path, &idx[..idx.len() - 1]).unwrap();
        assert!(load_idx(&path).is_err());
    }

    #[test]
    fn test_convert_all_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let json_dir = dir.path().join("barrels");
        let out_dir = dir.path().join("binary");
        fs::create_dir_all(&json_dir).unwrap();

        single_lemma_barrel()
            .save(&json_dir.join(JsonBarrel::file_name(7)))
            .unwrap();

        let converted = BinaryBarrelEncoder::convert_all(&json_dir, &out_dir).unwrap();
        assert_eq!(converted, 1);
        assert!(out_dir.join("barrel_7.bin").is_file());
        assert!(!out_dir.join("barrel_0.bin").exists());
    }
}
