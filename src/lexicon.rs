//! Read-only lexicon: surface word to lemma identifier
//!
//! Two on-disk forms exist. The binary form (`lexicon.bin`) is preferred and
//! loads in one pass: a `u32` word count, then length-prefixed UTF-8 words,
//! then one `i32` lemma id per word, positionally paired. The JSON form is
//! the fallback, carrying the intermediate word-id layer explicitly; a word
//! whose word-id has no lemma mapping uses its word-id as lemma id.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{PapyrusError, Result};
use crate::index::types::LemmaId;

/// In-memory lexicon with exact-match lookup
#[derive(Debug, Default)]
pub struct Lexicon {
    entries: HashMap<String, LemmaId>,
}

#[derive(Deserialize)]
struct JsonLexicon {
    #[serde(rename = "wordID", default)]
    word_id: HashMap<String, i32>,
    #[serde(rename = "wordToLemmaID", default)]
    word_to_lemma: HashMap<String, i32>,
}

impl Lexicon {
    /// Load the lexicon, preferring the binary form
    pub fn load(binary_path: &Path, json_path: &Path) -> Result<Self> {
        if binary_path.is_file() {
            return Self::from_binary_file(binary_path);
        }
        info!(path = %json_path.display(), "binary lexicon not found, loading JSON");
        Self::from_json_file(json_path)
    }

    /// Parse the binary lexicon layout
    pub fn from_binary_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|_| PapyrusError::IndexMissing {
            path: path.to_path_buf(),
        })?;
        Self::from_binary(&data).map_err(|detail| PapyrusError::malformed(path, detail))
    }

    fn from_binary(data: &[u8]) -> std::result::Result<Self, String> {
        let mut pos = 0usize;

        let num_words = read_u32(data, &mut pos).ok_or("truncated word count")? as usize;

        let mut words = Vec::with_capacity(num_words);
        for i in 0..num_words {
            let len = read_u16(data, &mut pos).ok_or_else(|| format!("truncated length of word {i}"))?
                as usize;
            let bytes = data
                .get(pos..pos + len)
                .ok_or_else(|| format!("truncated bytes of word {i}"))?;
            pos += len;
            let word = std::str::from_utf8(bytes)
                .map_err(|_| format!("word {i} is not valid UTF-8"))?
                .to_string();
            words.push(word);
        }

        let mut entries = HashMap::with_capacity(num_words);
        for (i, word) in words.into_iter().enumerate() {
            let lemma =
                read_i32(data, &mut pos).ok_or_else(|| format!("truncated lemma id of word {i}"))?;
            entries.insert(word, LemmaId(lemma));
        }

        Ok(Self { entries })
    }

    /// Parse the JSON fallback form
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|_| PapyrusError::IndexMissing {
            path: path.to_path_buf(),
        })?;
        let raw: JsonLexicon = serde_json::from_str(&data)?;

        let mut entries = HashMap::with_capacity(raw.word_id.len());
        for (word, wid) in raw.word_id {
            // Missing mapping: the word id doubles as the lemma id
            let lemma = raw
                .word_to_lemma
                .get(&wid.to_string())
                .copied()
                .unwrap_or(wid);
            entries.insert(word, LemmaId(lemma));
        }

        Ok(Self { entries })
    }

    /// Exact lookup. The caller normalizes the word first.
    pub fn lemma_of(&self, word: &str) -> Option<LemmaId> {
        self.entries.get(word).copied()
    }

    /// Iterate over (word, lemma-id) pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, LemmaId)> {
        self.entries.iter().map(|(w, l)| (w.as_str(), *l))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the binary layout, words sorted lexicographically
    pub fn to_binary(&self) -> Vec<u8> {
        let mut pairs: Vec<(&str, LemmaId)> = self.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = Vec::new();
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for (word, _) in &pairs {
            let bytes = word.as_bytes();
            out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            out.extend_from_slice(bytes);
        }
        for (_, lemma) in &pairs {
            out.extend_from_slice(&lemma.0.to_le_bytes());
        }
        out
    }

    /// Write the binary form to disk
    pub fn write_binary(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_binary())?;
        Ok(())
    }
}

impl FromIterator<(String, LemmaId)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (String, LemmaId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Compile the JSON lexicon into the binary form (offline stage)
pub fn compile_binary(json_path: &Path, binary_path: &Path) -> Result<usize> {
    let lexicon = Lexicon::from_json_file(json_path)?;
    lexicon.write_binary(binary_path)?;
    info!(
        words = lexicon.len(),
        path = %binary_path.display(),
        "binary lexicon written"
    );
    Ok(lexicon.len())
}

fn read_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = data.get(*pos..*pos + 4)?;
    *pos += 4;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u16(data: &[u8], pos: &mut usize) -> Option<u16> {
    let bytes = data.get(*pos..*pos + 2)?;
    *pos += 2;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn read_i32(data: &[u8], pos: &mut usize) -> Option<i32> {
    let bytes = data.get(*pos..*pos + 4)?;
    *pos += 4;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lexicon {
        [
            ("cat".to_string(), LemmaId(42)),
            ("cats".to_string(), LemmaId(42)),
            ("dog".to_string(), LemmaId(7)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup() {
        let lexicon = sample();
        assert_eq!(lexicon.lemma_of("cat"), Some(LemmaId(42)));
        assert_eq!(lexicon.lemma_of("cats"), Some(LemmaId(42)));
        assert_eq!(lexicon.lemma_of("mouse"), None);
    }

    #[test]
    fn test_binary_roundtrip() {
        let lexicon = sample();
        let bytes = lexicon.to_binary();
        let back = Lexicon::from_binary(&bytes).unwrap();

        assert_eq!(back.len(), 3);
        assert_eq!(back.lemma_of("cat"), Some(LemmaId(42)));
        assert_eq!(back.lemma_of("dog"), Some(LemmaId(7)));
    }

    #[test]
    fn test_binary_layout() {
        let lexicon: Lexicon = [("ab".to_string(), LemmaId(5))].into_iter().collect();
        let bytes = lexicon.to_binary();
        // u32 count + (u16 len + 2 bytes) + i32 lemma
        assert_eq!(bytes.len(), 4 + 2 + 2 + 4);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..6], &2u16.to_le_bytes());
        assert_eq!(&bytes[6..8], b"ab");
        assert_eq!(&bytes[8..12], &5i32.to_le_bytes());
    }

    #[test]
    fn test_truncated_binary_rejected() {
        let lexicon = sample();
        let mut bytes = lexicon.to_binary();
        bytes.truncate(bytes.len() - 2);
        assert!(Lexicon::from_binary(&bytes).is_err());
    }

    #[test]
    fn test_json_fallback_word_id_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.json");
        fs::write(
            &path,
            r#"{"wordID": {"cat": 1, "running": 2}, "wordToLemmaID": {"2": 99}}"#,
        )
        .unwrap();

        let lexicon = Lexicon::from_json_file(&path).unwrap();

        // "running" maps through the lemma table; "cat" falls back to its word id
        assert_eq!(lexicon.lemma_of("running"), Some(LemmaId(99)));
        assert_eq!(lexicon.lemma_of("cat"), Some(LemmaId(1)));
    }

    #[test]
    fn test_missing_lexicon_is_index_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Lexicon::load(
            &dir.path().join("lexicon.bin"),
            &dir.path().join("lexicon.json"),
        )
        .unwrap_err();
        assert!(matches!(err, PapyrusError::IndexMissing { .. }));
    }
}
