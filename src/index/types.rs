//! Core types shared across the indexing pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical word-form identifier assigned at lexicon construction
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LemmaId(pub i32);

impl LemmaId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for LemmaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External document identifier (opaque corpus string, at most 19 bytes in
/// binary form)
pub type DocId = String;

/// A single posting: one document containing a lemma, with its in-document
/// term frequency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

impl Posting {
    pub fn new(doc_id: impl Into<DocId>, tf: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            tf,
        }
    }
}

/// Number of primary barrels
pub const NUM_BARRELS: usize = 10;

/// Identifier of the append-only overflow barrel, outside the primary range
pub const OVERFLOW_BARREL_ID: u32 = 10;

/// File-name stem of the overflow barrel
pub const OVERFLOW_BARREL_NAME: &str = "new_docs";

/// df above which a term is HOT
pub const HOT_THRESHOLD: u32 = 10_000;

/// df above which a (non-HOT) term is WARM
pub const WARM_THRESHOLD: u32 = 1_000;

/// Frequency tier of a lemma, determined by its document frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    /// Classify a document frequency into its tier
    pub fn classify(df: u32) -> Self {
        if df > HOT_THRESHOLD {
            Tier::Hot
        } else if df > WARM_THRESHOLD {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Hot => "HOT",
            Tier::Warm => "WARM",
            Tier::Cold => "COLD",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tier::Hot => "Common terms (df > 10k)",
            Tier::Warm => "Medium frequency (df 1k-10k)",
            Tier::Cold => "Rare terms (df < 1k)",
        }
    }
}

/// Deterministic barrel assignment for a lemma.
///
/// HOT terms all land in barrel 0 so the longest posting lists share one
/// file; WARM and COLD terms are sharded by lemma-id modulo to balance size.
pub fn barrel_for(lemma: LemmaId, df: u32) -> u32 {
    let id = lemma.0.unsigned_abs();
    match Tier::classify(df) {
        Tier::Hot => 0,
        Tier::Warm => 1 + (id % 6),
        Tier::Cold => 7 + (id % 3),
    }
}

/// File-name stem for a barrel id (`0`..`9`, or `new_docs` for the overflow)
pub fn barrel_name(barrel_id: u32) -> String {
    if barrel_id == OVERFLOW_BARREL_ID {
        OVERFLOW_BARREL_NAME.to_string()
    } else {
        barrel_id.to_string()
    }
}
