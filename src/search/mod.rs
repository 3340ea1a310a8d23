//! Query-time search kernel

pub mod authority;
pub mod autocomplete;
pub mod context;
pub mod embeddings;
pub mod query;

pub use authority::{AuthorityScores, DEFAULT_AUTHORITY};
pub use autocomplete::{AutocompleteBuilder, AutocompleteIndex, Suggestion, MAX_SUGGESTIONS};
pub use context::{RetrievedPostings, SearchContext};
pub use embeddings::{EmbeddingStore, SimilarWord, EMBEDDING_DIM};
pub use query::{execute, ExpandedTerm, QueryMode, QueryOutcome, ScoringParams, SearchHit};
