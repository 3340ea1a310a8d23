//! Process-lifetime search context
//!
//! Everything the kernel needs resident is loaded once at startup and never
//! mutated afterwards: the lexicon, the barrel-lookup table, each barrel's
//! `.idx` offset table, and the optional sidecars (embeddings, autocomplete
//! buckets, authority scores). Posting data itself stays on disk; each
//! retrieval opens the barrel's `.bin`, seeks, and reads one record.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::barrel::binary::{load_idx, read_record, IndexEntry};
use crate::barrel::partition::load_barrel_lookup;
use crate::config::Settings;
use crate::error::{PapyrusError, Result};
use crate::index::types::{barrel_name, LemmaId, Posting, NUM_BARRELS, OVERFLOW_BARREL_ID};
use crate::lexicon::Lexicon;
use crate::search::authority::AuthorityScores;
use crate::search::autocomplete::{AutocompleteIndex, Suggestion};
use crate::search::embeddings::{EmbeddingStore, SimilarWord};

/// Posting list retrieved for one lemma, with overflow merged in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedPostings {
    pub df: u32,
    pub postings: Vec<Posting>,
}

/// Immutable resident caches for the lifetime of a serving process
pub struct SearchContext {
    binary_barrels_dir: PathBuf,
    lexicon: Lexicon,
    barrel_lookup: HashMap<LemmaId, u32>,
    barrel_indices: HashMap<u32, HashMap<LemmaId, IndexEntry>>,
    embeddings: Option<EmbeddingStore>,
    autocomplete: Option<AutocompleteIndex>,
    authority: AuthorityScores,
}

impl SearchContext {
    /// Build the context from the configured index layout. The lexicon and
    /// barrel lookup are required; sidecars degrade gracefully when absent
    /// or unreadable.
    pub fn init(settings: &Settings) -> Result<Self> {
        let sidecar_dir = settings.sidecar_dir();
        let binary_barrels_dir = settings.binary_barrels_dir();

        let lexicon = Lexicon::load(&sidecar_dir.join("lexicon.bin"), &settings.lexicon_path())?;
        info!(words = lexicon.len(), "lexicon loaded");

        let barrel_lookup: HashMap<LemmaId, u32> =
            load_barrel_lookup(&settings.barrel_lookup_path())?
                .into_iter()
                .map(|(lemma, barrel)| (LemmaId(lemma), barrel))
                .collect();
        info!(entries = barrel_lookup.len(), "barrel lookup loaded");

        let mut barrel_indices = HashMap::new();
        let mut ids: Vec<u32> = (0..NUM_BARRELS as u32).collect();
        ids.push(OVERFLOW_BARREL_ID);
        for barrel_id in ids {
            let idx_path = binary_barrels_dir.join(format!("barrel_{}.idx", barrel_name(barrel_id)));
            if !idx_path.is_file() {
                continue;
            }
            let table = load_idx(&idx_path)?;
            barrel_indices.insert(barrel_id, table);
        }
        info!(barrels = barrel_indices.len(), "barrel offset tables resident");

        let embeddings = match EmbeddingStore::load(&sidecar_dir) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "embeddings unavailable, semantic expansion disabled");
                None
            }
        };
        let autocomplete = match AutocompleteIndex::load(&sidecar_dir) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "autocomplete index unavailable");
                None
            }
        };
        let authority = match AuthorityScores::load(&sidecar_dir) {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "authority scores unavailable, using default");
                AuthorityScores::default()
            }
        };

        Ok(Self {
            binary_barrels_dir,
            lexicon,
            barrel_lookup,
            barrel_indices,
            embeddings,
            autocomplete,
            authority,
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn lemma_of(&self, word: &str) -> Option<LemmaId> {
        self.lexicon.lemma_of(word)
    }

    pub fn embeddings_loaded(&self) -> bool {
        self.embeddings.is_some()
    }

    pub fn authority(&self, doc_id: &str) -> f32 {
        self.authority.get(doc_id)
    }

    /// Embedding neighbors of a word; empty when embeddings are not loaded
    /// or the word is out of vocabulary
    pub fn similar_words(&self, word: &str, top_k: usize) -> Vec<SimilarWord> {
        self.embeddings
            .as_ref()
            .map(|store| store.similar_words(word, top_k))
            .unwrap_or_default()
    }

    /// Autocomplete suggestions; empty when the index is not loaded
    pub fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        self.autocomplete
            .as_ref()
            .map(|index| index.suggest(prefix))
            .unwrap_or_default()
    }

    fn bin_path(&self, barrel_id: u32) -> PathBuf {
        self.binary_barrels_dir
            .join(format!("barrel_{}.bin", barrel_name(barrel_id)))
    }

    /// Retrieve the posting list for a lemma through its primary barrel,
    /// then merge unseen documents from the overflow barrel.
    ///
    /// `None` means the lemma has no postings anywhere (or its barrel file
    /// is missing, which is logged and degraded to zero postings). A
    /// malformed record is an error: the barrel is corrupt and the query
    /// cannot be answered from it.
    pub fn retrieve_postings(&self, lemma: LemmaId) -> Result<Option<RetrievedPostings>> {
        let Some(&barrel_id) = self.barrel_lookup.get(&lemma) else {
            return Ok(None);
        };

        let Some(entry) = self
            .barrel_indices
            .get(&barrel_id)
            .and_then(|table| table.get(&lemma).copied())
        else {
            return Ok(None);
        };

        let mut retrieved = match read_record(&self.bin_path(barrel_id), entry) {
            Ok(record) => RetrievedPostings {
                df: record.df,
                postings: record.postings,
            },
            Err(PapyrusError::IndexMissing { path }) => {
                warn!(path = %path.display(), "barrel file missing, treating as zero postings");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if barrel_id != OVERFLOW_BARREL_ID {
            self.merge_overflow(lemma, &mut retrieved)?;
        }

        Ok(Some(retrieved))
    }

    /// Merge postings from the `new_docs` barrel for documents not already
    /// present, incrementing df per merged posting
    fn merge_overflow(&self, lemma: LemmaId, retrieved: &mut RetrievedPostings) -> Result<()> {
        let Some(entry) = self
            .barrel_indices
            .get(&OVERFLOW_BARREL_ID)
            .and_then(|table| table.get(&lemma).copied())
        else {
            return Ok(());
        };

        let record = match read_record(&self.bin_path(OVERFLOW_BARREL_ID), entry) {
            Ok(record) => record,
            Err(PapyrusError::IndexMissing { path }) => {
                warn!(path = %path.display(), "overflow barrel file missing, skipping merge");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let seen: HashSet<&str> = retrieved.postings.iter().map(|p| p.doc_id.as_str()).collect();
        let fresh: Vec<Posting> = record
            .postings
            .into_iter()
            .filter(|p| !seen.contains(p.doc_id.as_str()))
            .collect();

        retrieved.df += fresh.len() as u32;
        retrieved.postings.extend(fresh);
        Ok(())
    }
}
