//! Barrel storage: tier partitioning and the binary on-disk format

pub mod binary;
pub mod partition;

pub use binary::{
    load_idx, parse_record, read_record, BarrelRecord, BinaryBarrelEncoder, IndexEntry,
    DOC_ID_SIZE, POSTING_SIZE, RECORD_HEADER_SIZE,
};
pub use partition::{load_barrel_lookup, BarrelPartitioner, JsonBarrel, PartitionStats, TermPostings};
