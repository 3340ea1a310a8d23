use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use papyrus::barrel::{BarrelPartitioner, BinaryBarrelEncoder};
use papyrus::index::{ForwardIndexBuilder, InvertedIndexBuilder};
use papyrus::lexicon;
use papyrus::search::AutocompleteBuilder;
use papyrus::{Lexicon, Settings};
use tracing::info;

#[derive(Parser)]
#[command(name = "papyrus-index")]
#[command(about = "Build the papyrus index pipeline", long_about = None)]
struct Args {
    /// Directory holding config.json (discovered by upward walk when omitted)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    stage: Stage,
}

#[derive(Subcommand)]
enum Stage {
    /// Build the forward index from the corpus directory
    Forward,
    /// Build the inverted index from the forward index
    Invert,
    /// Partition the inverted index into JSON barrels and the lookup table
    Barrels,
    /// Convert JSON barrels into binary .bin/.idx pairs
    Encode,
    /// Build the autocomplete prefix buckets
    Autocomplete,
    /// Compile the JSON lexicon into its binary form
    Lexicon,
    /// Run every stage in pipeline order
    All,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let settings = match &args.config_dir {
        Some(dir) => Settings::from_dir(dir)?,
        None => Settings::discover()?,
    };
    fs::create_dir_all(settings.indexes_dir())?;

    match args.stage {
        Stage::Forward => forward(&settings)?,
        Stage::Invert => invert(&settings)?,
        Stage::Barrels => barrels(&settings)?,
        Stage::Encode => encode(&settings)?,
        Stage::Autocomplete => autocomplete(&settings)?,
        Stage::Lexicon => compile_lexicon(&settings)?,
        Stage::All => {
            forward(&settings)?;
            invert(&settings)?;
            barrels(&settings)?;
            encode(&settings)?;
            autocomplete(&settings)?;
            compile_lexicon(&settings)?;
        }
    }

    Ok(())
}

fn load_lexicon(settings: &Settings) -> Result<Lexicon> {
    Lexicon::load(
        &settings.sidecar_dir().join("lexicon.bin"),
        &settings.lexicon_path(),
    )
    .context("loading lexicon")
}

fn forward(settings: &Settings) -> Result<()> {
    let lexicon = load_lexicon(settings)?;
    let stats = ForwardIndexBuilder::new(&lexicon)
        .build(&settings.corpus_dir(), &settings.forward_index_path())?;
    info!(
        processed = stats.processed,
        indexed = stats.indexed,
        skipped = stats.skipped,
        "forward stage complete"
    );
    Ok(())
}

fn invert(settings: &Settings) -> Result<()> {
    let mut builder = InvertedIndexBuilder::new();
    builder.build_from_forward(&settings.forward_index_path())?;
    builder.save(&settings.inverted_index_path())?;
    info!(
        documents = builder.document_count(),
        lemmas = builder.lemma_count(),
        "invert stage complete"
    );
    Ok(())
}

fn barrels(settings: &Settings) -> Result<()> {
    let mut partitioner = BarrelPartitioner::new();
    partitioner.partition(&settings.inverted_index_path())?;
    partitioner.save(&settings.json_barrels_dir(), &settings.barrel_lookup_path())?;

    let stats = partitioner.stats();
    info!(
        hot = stats.hot,
        warm = stats.warm,
        cold = stats.cold,
        "barrels stage complete"
    );
    Ok(())
}

fn encode(settings: &Settings) -> Result<()> {
    let converted =
        BinaryBarrelEncoder::convert_all(&settings.json_barrels_dir(), &settings.binary_barrels_dir())?;
    info!(barrels = converted, "encode stage complete");
    Ok(())
}

fn autocomplete(settings: &Settings) -> Result<()> {
    let lexicon = load_lexicon(settings)?;
    let words = AutocompleteBuilder::build(
        &lexicon,
        &settings.inverted_index_path(),
        &settings.sidecar_dir(),
    )?;
    info!(words, "autocomplete stage complete");
    Ok(())
}

fn compile_lexicon(settings: &Settings) -> Result<()> {
    fs::create_dir_all(settings.sidecar_dir())?;
    let words = lexicon::compile_binary(
        &settings.lexicon_path(),
        &settings.sidecar_dir().join("lexicon.bin"),
    )?;
    info!(words, "lexicon stage complete");
    Ok(())
}
