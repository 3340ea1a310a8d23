use std::time::Instant;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use papyrus::search::{self, QueryMode, ScoringParams, SearchContext};
use papyrus::Settings;
use tracing::info;

#[derive(Parser)]
#[command(name = "papyrus")]
#[command(about = "Ranked full-text search over a scholarly corpus", long_about = None)]
struct Args {
    /// Query string
    query: Option<String>,

    /// Require every query term to match (default)
    #[arg(long, short = 'a')]
    and: bool,

    /// Match documents containing any query term
    #[arg(long, short = 'o', conflicts_with = "and")]
    or: bool,

    /// Print autocomplete suggestions for a prefix instead of searching
    #[arg(long, alias = "ac", value_name = "PREFIX")]
    autocomplete: Option<String>,

    /// Print embedding neighbors of a word instead of searching
    #[arg(long, short = 's', value_name = "WORD")]
    similar: Option<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    // Diagnostics go to stderr; stdout carries results only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let start = Instant::now();
    let settings = Settings::discover()?;
    let ctx = SearchContext::init(&settings)?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "caches initialized");

    if let Some(prefix) = &args.autocomplete {
        return run_autocomplete(&ctx, prefix);
    }
    if let Some(word) = &args.similar {
        return run_similar(&ctx, word);
    }

    let Some(query) = &args.query else {
        anyhow::bail!("no query provided (see --help)");
    };

    let mode = if args.or { QueryMode::Or } else { QueryMode::And };
    let params = ScoringParams::default();

    println!(
        "Search: '{}' ({} mode)\n",
        query,
        if args.or { "OR" } else { "AND" }
    );

    let search_start = Instant::now();
    let outcome = search::execute(&ctx, &params, query, mode)?;
    let elapsed = search_start.elapsed().as_millis();

    println!("Query expansion ({} terms):", outcome.expanded_terms.len());
    for term in &outcome.expanded_terms {
        println!(
            "  {} (lemma={}, weight={:.3})",
            term.word, term.lemma, term.weight
        );
    }

    if outcome.hits.is_empty() {
        println!("\nNo documents found.");
        return Ok(());
    }

    println!("\nFound {} documents", outcome.total_matches);
    println!("\nTop {} results (in {}ms):\n", outcome.hits.len(), elapsed);

    for (rank, hit) in outcome.hits.iter().enumerate() {
        println!(
            "{}. DocID: {} | Score: {:.4} | TF-IDF: {:.4} | PageRank: {:.4} | Matched: {}/{}",
            rank + 1,
            hit.doc_id,
            hit.total_score,
            hit.tfidf_score,
            hit.authority_score,
            hit.matched_terms,
            hit.total_terms
        );
    }

    Ok(())
}

fn run_autocomplete(ctx: &SearchContext, prefix: &str) -> Result<()> {
    println!("Autocomplete suggestions for '{prefix}':\n");

    let suggestions = ctx.suggest(prefix);
    if suggestions.is_empty() {
        println!("No suggestions found.");
        return Ok(());
    }

    for (i, s) in suggestions.iter().enumerate() {
        println!("{}. {} (df: {})", i + 1, s.word, s.df);
    }
    Ok(())
}

fn run_similar(ctx: &SearchContext, word: &str) -> Result<()> {
    println!("Words similar to '{word}':\n");

    let similar = ctx.similar_words(word, 10);
    if similar.is_empty() {
        if ctx.embeddings_loaded() {
            println!("No similar words found (word not in embeddings).");
        } else {
            println!("Similar words unavailable (embeddings not loaded).");
        }
        return Ok(());
    }

    for (i, s) in similar.iter().enumerate() {
        println!("{}. {} (similarity: {:.4})", i + 1, s.word, s.similarity);
    }
    Ok(())
}
