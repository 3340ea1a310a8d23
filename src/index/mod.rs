//! Build-time indexing pipeline: forward index, inverted index

pub mod forward;
pub mod inverted;
pub mod types;

pub use forward::{ForwardEntry, ForwardIndexBuilder, ForwardIndexReader, BODY_LEMMA_CAP};
pub use inverted::{InvertedEntry, InvertedIndexBuilder, InvertedIndexReader};
pub use types::{barrel_for, barrel_name, DocId, LemmaId, Posting, Tier};
