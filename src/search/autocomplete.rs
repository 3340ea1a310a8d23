//! Prefix-bucketed autocomplete index
//!
//! Offline, every lexicon word of length ≥ 2 is bucketed under its 2- and
//! 3-character prefixes, each bucket ordered by document frequency
//! descending and capped. At query time the more specific 3-character bucket
//! is consulted first, falling back to the 2-character bucket, refining with
//! a `starts_with` filter since a bucket only shares its prefix.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::index::inverted::InvertedIndexReader;
use crate::index::types::LemmaId;
use crate::lexicon::Lexicon;

/// Maximum entries retained per prefix bucket
pub const BUCKET_CAP: usize = 50;

/// Maximum suggestions returned per query
pub const MAX_SUGGESTIONS: usize = 5;

/// One autocomplete suggestion: a word and its document frequency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "w")]
    pub word: String,
    #[serde(rename = "d")]
    pub df: u32,
}

/// Resident prefix-bucket table
#[derive(Debug, Default)]
pub struct AutocompleteIndex {
    buckets: HashMap<String, Vec<Suggestion>>,
}

impl AutocompleteIndex {
    /// Load `autocomplete.json`, falling back to the sorted `trie.txt` word
    /// list; `None` when neither exists (suggestions disabled)
    pub fn load(sidecar_dir: &Path) -> Result<Option<Self>> {
        let json_path = sidecar_dir.join("autocomplete.json");
        if json_path.is_file() {
            let buckets: HashMap<String, Vec<Suggestion>> =
                serde_json::from_str(&fs::read_to_string(&json_path)?)?;
            info!(buckets = buckets.len(), "autocomplete index loaded");
            return Ok(Some(Self { buckets }));
        }

        let trie_path = sidecar_dir.join("trie.txt");
        if trie_path.is_file() {
            let index = Self::from_word_list(&fs::read_to_string(&trie_path)?);
            info!(buckets = index.buckets.len(), "autocomplete loaded from word list");
            return Ok(Some(index));
        }

        Ok(None)
    }

    /// Build 2-character buckets from the `word|df` fallback list
    fn from_word_list(content: &str) -> Self {
        let mut buckets: HashMap<String, Vec<Suggestion>> = HashMap::new();
        for line in content.lines() {
            let Some((word, df)) = line.split_once('|') else {
                continue;
            };
            let Ok(df) = df.parse::<u32>() else { continue };
            if word.chars().count() >= 2 {
                let prefix: String = word.chars().take(2).collect();
                buckets
                    .entry(prefix)
                    .or_default()
                    .push(Suggestion { word: word.to_string(), df });
            }
        }
        for bucket in buckets.values_mut() {
            sort_bucket(bucket);
            bucket.truncate(BUCKET_CAP);
        }
        Self { buckets }
    }

    /// Up to [`MAX_SUGGESTIONS`] words beginning with `prefix`, ordered by
    /// df descending. Prefixes shorter than two characters have no bucket
    /// and return nothing.
    pub fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        self.suggest_limit(prefix, MAX_SUGGESTIONS)
    }

    pub fn suggest_limit(&self, prefix: &str, max: usize) -> Vec<Suggestion> {
        let prefix = prefix.to_lowercase();
        let chars: Vec<char> = prefix.chars().collect();
        let mut suggestions: Vec<Suggestion> = Vec::new();

        // Most specific bucket first
        if chars.len() >= 3 {
            let bucket: String = chars[..3].iter().collect();
            if let Some(entries) = self.buckets.get(&bucket) {
                for s in entries {
                    if s.word.starts_with(&prefix) {
                        suggestions.push(s.clone());
                        if suggestions.len() >= max {
                            return suggestions;
                        }
                    }
                }
            }
        }

        if chars.len() >= 2 {
            let bucket: String = chars[..2].iter().collect();
            if let Some(entries) = self.buckets.get(&bucket) {
                for s in entries {
                    if s.word.starts_with(&prefix)
                        && !suggestions.iter().any(|existing| existing.word == s.word)
                    {
                        suggestions.push(s.clone());
                        if suggestions.len() >= max {
                            break;
                        }
                    }
                }
            }
        }

        suggestions
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

fn sort_bucket(bucket: &mut [Suggestion]) {
    // df descending, then word ascending for deterministic output
    bucket.sort_by(|a, b| b.df.cmp(&a.df).then_with(|| a.word.cmp(&b.word)));
}

/// Offline builder: joins lexicon words with inverted-index document
/// frequencies and writes the bucket table plus the word-list fallback
pub struct AutocompleteBuilder;

impl AutocompleteBuilder {
    /// Collect (word, df) pairs: alphabetic words of length ≥ 2, df taken
    /// from the lemma's posting list and defaulting to 1
    fn word_frequencies(lexicon: &Lexicon, lemma_df: &HashMap<LemmaId, u32>) -> Vec<Suggestion> {
        let mut words: Vec<Suggestion> = lexicon
            .iter()
            .filter(|(word, _)| word.chars().count() >= 2 && word.chars().all(|c| c.is_alphabetic()))
            .map(|(word, lemma)| Suggestion {
                word: word.to_lowercase(),
                df: lemma_df.get(&lemma).copied().unwrap_or(1),
            })
            .collect();
        words.sort_by(|a, b| a.word.cmp(&b.word));
        words
    }

    /// Build the bucket table and persist `autocomplete.json` and `trie.txt`
    pub fn build(lexicon: &Lexicon, inverted_path: &Path, sidecar_dir: &Path) -> Result<usize> {
        let mut lemma_df: HashMap<LemmaId, u32> = HashMap::new();
        for entry in InvertedIndexReader::open(inverted_path)? {
            let entry = entry?;
            lemma_df.insert(entry.lemma, entry.df);
        }

        let words = Self::word_frequencies(lexicon, &lemma_df);
        fs::create_dir_all(sidecar_dir)?;

        let mut trie = BufWriter::new(File::create(sidecar_dir.join("trie.txt"))?);
        for s in &words {
            writeln!(trie, "{}|{}", s.word, s.df)?;
        }
        trie.flush()?;

        let mut buckets: HashMap<String, Vec<Suggestion>> = HashMap::new();
        for s in &words {
            let chars: Vec<char> = s.word.chars().collect();
            buckets
                .entry(chars[..2].iter().collect())
                .or_default()
                .push(s.clone());
            if chars.len() >= 3 {
                buckets
                    .entry(chars[..3].iter().collect())
                    .or_default()
                    .push(s.clone());
            }
        }
        for bucket in buckets.values_mut() {
            sort_bucket(bucket);
            bucket.truncate(BUCKET_CAP);
        }

        let file = File::create(sidecar_dir.join("autocomplete.json"))?;
        serde_json::to_writer(BufWriter::new(file), &buckets)?;

        info!(words = words.len(), buckets = buckets.len(), "autocomplete index written");
        Ok(words.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(entries: &[(&str, u32)]) -> AutocompleteIndex {
        let mut buckets: HashMap<String, Vec<Suggestion>> = HashMap::new();
        for (word, df) in entries {
            let s = Suggestion { word: word.to_string(), df: *df };
            let chars: Vec<char> = word.chars().collect();
            buckets.entry(chars[..2].iter().collect()).or_default().push(s.clone());
            if chars.len() >= 3 {
                buckets.entry(chars[..3].iter().collect()).or_default().push(s);
            }
        }
        for bucket in buckets.values_mut() {
            sort_bucket(bucket);
        }
        AutocompleteIndex { buckets }
    }

    #[test]
    fn test_df_ordering_and_prefix_filter() {
        let index = index_from(&[("cat", 100), ("cats", 50), ("cathode", 10), ("car", 200)]);
        let suggestions = index.suggest("cat");
        let words: Vec<&str> = suggestions.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["cat", "cats", "cathode"]);
    }

    #[test]
    fn test_two_char_prefix_uses_wide_bucket() {
        let index = index_from(&[("cat", 100), ("car", 200), ("dog", 5)]);
        let words: Vec<String> = index.suggest("ca").iter().map(|s| s.word.clone()).collect();
        assert_eq!(words, vec!["car", "cat"]);
    }

    #[test]
    fn test_one_char_prefix_is_empty() {
        let index = index_from(&[("cat", 100)]);
        assert!(index.suggest("c").is_empty());
    }

    #[test]
    fn test_case_insensitive_prefix() {
        let index = index_from(&[("cat", 100)]);
        assert_eq!(index.suggest("CA").len(), 1);
    }

    #[test]
    fn test_fallback_dedupes_three_char_hits() {
        let index = index_from(&[("cat", 100), ("cats", 50)]);
        let suggestions = index.suggest("cat");
        assert_eq!(suggestions.len(), 2);
        let unique: std::collections::HashSet<&str> =
            suggestions.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_build_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let inverted = dir.path().join("inverted_index.txt");
        fs::write(&inverted, "42|100|PMC1:1\n7|3|PMC2:1\n").unwrap();

        let lexicon: Lexicon = [
            ("cat".to_string(), LemmaId(42)),
            ("cats".to_string(), LemmaId(42)),
            ("dog".to_string(), LemmaId(7)),
            ("x".to_string(), LemmaId(9)),      // too short, excluded
            ("p53".to_string(), LemmaId(11)),   // non-alphabetic, excluded
        ]
        .into_iter()
        .collect();

        let sidecars = dir.path().join("embeddings");
        let count = AutocompleteBuilder::build(&lexicon, &inverted, &sidecars).unwrap();
        assert_eq!(count, 3);

        let index = AutocompleteIndex::load(&sidecars).unwrap().unwrap();
        let words: Vec<String> = index.suggest("ca").iter().map(|s| s.word.clone()).collect();
        assert_eq!(words, vec!["cat", "cats"]);

        // Word-list fallback behaves the same for 2-char prefixes
        fs::remove_file(sidecars.join("autocomplete.json")).unwrap();
        let fallback = AutocompleteIndex::load(&sidecars).unwrap().unwrap();
        let words: Vec<String> = fallback.suggest("do").iter().map(|s| s.word.clone()).collect();
        assert_eq!(words, vec!["dog"]);
    }
}
