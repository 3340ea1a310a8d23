//! Barrel partitioner: frequency-tiered horizontal split of the inverted
//! index
//!
//! HOT terms (df > 10k) all go to barrel 0 so the longest posting lists sit
//! in one file; WARM terms shard across barrels 1..6 and COLD terms across
//! 7..9 by lemma-id modulo. The partitioner also emits the barrel-lookup
//! table consulted by the search kernel.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PapyrusError, Result};
use crate::index::inverted::InvertedIndexReader;
use crate::index::types::{barrel_for, LemmaId, Posting, Tier, NUM_BARRELS};

/// Posting list of one lemma inside a JSON barrel
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TermPostings {
    pub df: u32,
    pub docs: Vec<Posting>,
}

/// One JSON barrel file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonBarrel {
    pub barrel_id: u32,
    #[serde(rename = "type")]
    pub tier: String,
    pub description: String,
    pub num_terms: u32,
    pub postings: BTreeMap<String, TermPostings>,
}

impl JsonBarrel {
    fn new(barrel_id: u32, tier: Tier) -> Self {
        Self {
            barrel_id,
            tier: tier.label().to_string(),
            description: tier.description().to_string(),
            num_terms: 0,
            postings: BTreeMap::new(),
        }
    }

    /// File name of barrel `i` as written by the partitioner
    pub fn file_name(barrel_id: u32) -> String {
        format!("inverted_barrel_{barrel_id}.json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|_| PapyrusError::IndexMissing {
            path: path.to_path_buf(),
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Per-tier term counts from a partitioning run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
}

impl PartitionStats {
    pub fn total(&self) -> usize {
        self.hot + self.warm + self.cold
    }
}

/// Splits the inverted index into ten JSON barrels plus the lookup table
#[derive(Debug)]
pub struct BarrelPartitioner {
    barrels: Vec<JsonBarrel>,
    lookup: BTreeMap<i32, u32>,
    stats: PartitionStats,
}

impl BarrelPartitioner {
    pub fn new() -> Self {
        let barrels = (0..NUM_BARRELS as u32)
            .map(|id| {
                let tier = match id {
                    0 => Tier::Hot,
                    1..=6 => Tier::Warm,
                    _ => Tier::Cold,
                };
                JsonBarrel::new(id, tier)
            })
            .collect();
        Self {
            barrels,
            lookup: BTreeMap::new(),
            stats: PartitionStats::default(),
        }
    }

    /// Stream the inverted index and assign every lemma to its barrel
    pub fn partition(&mut self, inverted_path: &Path) -> Result<()> {
        info!(input = %inverted_path.display(), "partitioning inverted index into barrels");

        for entry in InvertedIndexReader::open(inverted_path)? {
            let entry = entry?;
            self.add_term(entry.lemma, entry.df, entry.postings);
        }

        info!(
            hot = self.stats.hot,
            warm = self.stats.warm,
            cold = self.stats.cold,
            "partitioning complete"
        );
        Ok(())
    }

    /// Place a single lemma into its tier barrel and record the lookup entry
    pub fn add_term(&mut self, lemma: LemmaId, df: u32, postings: Vec<Posting>) {
        let barrel_id = barrel_for(lemma, df);
        match Tier::classify(df) {
            Tier::Hot => self.stats.hot += 1,
            Tier::Warm => self.stats.warm += 1,
            Tier::Cold => self.stats.cold += 1,
        }

        let barrel = &mut self.barrels[barrel_id as usize];
        barrel
            .postings
            .insert(lemma.to_string(), TermPostings { df, docs: postings });
        barrel.num_terms += 1;

        self.lookup.insert(lemma.as_i32(), barrel_id);
    }

    /// Write the ten barrel files and the lookup table. I/O errors are fatal
    /// for the stage.
    pub fn save(&self, barrels_dir: &Path, lookup_path: &Path) -> Result<()> {
        fs::create_dir_all(barrels_dir)?;

        for barrel in &self.barrels {
            let path = barrels_dir.join(JsonBarrel::file_name(barrel.barrel_id));
            barrel.save(&path)?;
            info!(
                barrel = barrel.barrel_id,
                terms = barrel.num_terms,
                path = %path.display(),
                "barrel written"
            );
        }

        let file = File::create(lookup_path)?;
        serde_json::to_writer(BufWriter::new(file), &self.lookup)?;
        info!(entries = self.lookup.len(), path = %lookup_path.display(), "barrel lookup written");
        Ok(())
    }

    pub fn stats(&self) -> PartitionStats {
        self.stats
    }

    pub fn barrels(&self) -> &[JsonBarrel] {
        &self.barrels
    }

    pub fn lookup(&self) -> &BTreeMap<i32, u32> {
        &self.lookup
    }
}

impl Default for BarrelPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the barrel-lookup table (lemma-id to barrel-id)
pub fn load_barrel_lookup(path: &Path) -> Result<BTreeMap<i32, u32>> {
    let file = File::open(path).map_err(|_| PapyrusError::IndexMissing {
        path: path.to_path_buf(),
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
