//! Word-embedding sidecar for semantic query expansion
//!
//! `embeddings.bin` holds a `u32` word count, a `u32` dimension (always 50),
//! then one f32 row per word; `vocab.json` maps each word to its row. Rows
//! are expected L2-normalized so cosine similarity reduces to a dot product;
//! the loader verifies each norm is within [0.99, 1.01] and renormalizes
//! rows that drift outside the tolerance.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{PapyrusError, Result};

/// Embedding dimensionality used throughout the index
pub const EMBEDDING_DIM: usize = 50;

/// A neighbor returned by a similar-words lookup
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarWord {
    pub word: String,
    pub similarity: f32,
}

/// Resident embedding vectors with their vocabulary
#[derive(Debug)]
pub struct EmbeddingStore {
    /// Row-major vectors, `dim` floats per word
    vectors: Vec<f32>,
    dim: usize,
    vocab: HashMap<String, usize>,
}

impl EmbeddingStore {
    /// Load `embeddings.bin` + `vocab.json` from the sidecar directory.
    /// Returns `None` when either file is absent (semantic expansion is then
    /// disabled, which is not an error).
    pub fn load(sidecar_dir: &Path) -> Result<Option<Self>> {
        let bin_path = sidecar_dir.join("embeddings.bin");
        let vocab_path = sidecar_dir.join("vocab.json");
        if !bin_path.is_file() || !vocab_path.is_file() {
            return Ok(None);
        }

        let vocab: HashMap<String, usize> =
            serde_json::from_str(&fs::read_to_string(&vocab_path)?)?;

        let data = fs::read(&bin_path)?;
        if data.len() < 8 {
            return Err(PapyrusError::malformed(&bin_path, "missing header"));
        }
        let num_words = u32_at(&data, 0) as usize;
        let dim = u32_at(&data, 4) as usize;
        if dim != EMBEDDING_DIM {
            return Err(PapyrusError::malformed(
                &bin_path,
                format!("embedding dimension mismatch: expected {EMBEDDING_DIM}, got {dim}"),
            ));
        }

        let expected = 8 + num_words * dim * 4;
        if data.len() != expected {
            return Err(PapyrusError::malformed(
                &bin_path,
                format!("file is {} bytes, expected {expected} for {num_words} vectors", data.len()),
            ));
        }

        let mut vectors = Vec::with_capacity(num_words * dim);
        let mut pos = 8;
        for _ in 0..num_words * dim {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&data[pos..pos + 4]);
            vectors.push(f32::from_le_bytes(bytes));
            pos += 4;
        }

        let mut store = Self { vectors, dim, vocab };
        store.enforce_normalization();

        info!(words = store.len(), dim, "embeddings loaded");
        Ok(Some(store))
    }

    /// Build a store from parts (rows need not be pre-normalized)
    pub fn from_parts(vocab: HashMap<String, usize>, vectors: Vec<f32>, dim: usize) -> Self {
        let mut store = Self { vectors, dim, vocab };
        store.enforce_normalization();
        store
    }

    fn enforce_normalization(&mut self) {
        for row in self.vectors.chunks_mut(self.dim) {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 && !(0.99..=1.01).contains(&norm) {
                for x in row.iter_mut() {
                    *x /= norm;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vocab.contains_key(word)
    }

    /// The vector for a word, when in vocabulary
    pub fn vector(&self, word: &str) -> Option<&[f32]> {
        let idx = *self.vocab.get(word)?;
        self.vectors.get(idx * self.dim..(idx + 1) * self.dim)
    }

    /// Top-k embedding neighbors of a word by cosine similarity, best first.
    /// Returns an empty list for out-of-vocabulary words.
    pub fn similar_words(&self, word: &str, top_k: usize) -> Vec<SimilarWord> {
        let Some(query) = self.vector(word) else {
            return Vec::new();
        };

        let mut scored: Vec<SimilarWord> = self
            .vocab
            .iter()
            .filter(|(w, _)| w.as_str() != word)
            .filter_map(|(w, &idx)| {
                let row = self.vectors.get(idx * self.dim..(idx + 1) * self.dim)?;
                Some(SimilarWord {
                    word: w.clone(),
                    similarity: dot(query, row),
                })
            })
            .collect();

        // Similarity descending; ties broken by word for run-to-run stability
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        scored.truncate(top_k);
        scored
    }
}

/// Dot product of two equal-length rows (cosine for normalized vectors)
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn u32_at(data: &[u8], pos: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[pos..pos + 4]);
    u32::from_le_bytes(bytes)
}
