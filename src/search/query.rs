//! Ranked query execution
//!
//! A query runs through a fixed pipeline: tokenize, expand (exact lexicon
//! terms at weight 1.0 plus embedding neighbors at half their similarity),
//! retrieve postings per expanded term, accumulate TF-IDF and semantic
//! scores per document, filter on how many original terms matched, then
//! rank by the weighted combination of lexical, semantic, and authority
//! signals.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{PapyrusError, Result};
use crate::index::types::{DocId, LemmaId};
use crate::search::context::SearchContext;
use crate::tokenizer::tokenize;

/// Ranking weights and corpus-size constant.
///
/// `total_docs` is a build-time corpus constant used for IDF. It is
/// deliberately not recomputed from the live postings, so it goes stale
/// after overflow uploads; that staleness is accepted behavior.
#[derive(Clone, Copy, Debug)]
pub struct ScoringParams {
    pub total_docs: u32,
    pub tfidf_weight: f64,
    pub semantic_weight: f64,
    pub authority_weight: f64,
    pub top_k: usize,
    pub expansion_neighbors: usize,
    pub expansion_min_similarity: f32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            total_docs: 59_000,
            tfidf_weight: 0.5,
            semantic_weight: 0.3,
            authority_weight: 0.2,
            top_k: 20,
            expansion_neighbors: 3,
            expansion_min_similarity: 0.5,
        }
    }
}

/// Conjunctive (default) or disjunctive matching over original query terms
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    And,
    Or,
}

/// One term of the expanded query. Weight 1.0 marks an original term;
/// expansion terms carry half their cosine similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedTerm {
    pub word: String,
    pub lemma: LemmaId,
    pub weight: f32,
}

/// A ranked search hit with its score breakdown
#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub total_score: f64,
    pub tfidf_score: f64,
    pub semantic_score: f64,
    pub authority_score: f64,
    pub matched_terms: u32,
    pub total_terms: u32,
}

/// Outcome of a query: ranked hits plus the expansion that produced them
#[derive(Clone, Debug)]
pub struct QueryOutcome {
    pub hits: Vec<SearchHit>,
    pub expanded_terms: Vec<ExpandedTerm>,
    pub total_matches: usize,
}

/// Ranking order: total score descending, then matched terms descending,
/// then doc id ascending
fn rank_order(a: &SearchHit, b: &SearchHit) -> std::cmp::Ordering {
    b.total_score
        .partial_cmp(&a.total_score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| b.matched_terms.cmp(&a.matched_terms))
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// TF-IDF contribution of one posting: `(1 + log10 tf) × log10(N / df)`
pub fn tfidf(tf: u32, df: u32, total_docs: u32) -> f64 {
    if tf == 0 || df == 0 {
        return 0.0;
    }
    let tf_score = 1.0 + f64::from(tf).log10();
    let idf = (f64::from(total_docs) / f64::from(df)).log10();
    tf_score * idf
}

/// Expand query words into weighted lemma terms.
///
/// Each word contributes its own lemma at weight 1.0 when the lexicon knows
/// it; with embeddings loaded, its top neighbors join at `0.5 × similarity`
/// when the similarity clears the threshold. A lemma enters the set at most
/// once, first writer wins.
pub fn expand_query(
    ctx: &SearchContext,
    params: &ScoringParams,
    query_words: &[String],
) -> Vec<ExpandedTerm> {
    let mut expanded = Vec::new();
    let mut seen: HashSet<LemmaId> = HashSet::new();

    for word in query_words {
        match ctx.lemma_of(word) {
            Some(lemma) => {
                if seen.insert(lemma) {
                    expanded.push(ExpandedTerm {
                        word: word.clone(),
                        lemma,
                        weight: 1.0,
                    });
                }
            }
            None => debug!(word = %word, "query term not in lexicon, dropped"),
        }

        if ctx.embeddings_loaded() {
            for neighbor in ctx.similar_words(word, params.expansion_neighbors) {
                if neighbor.similarity <= params.expansion_min_similarity {
                    continue;
                }
                let Some(lemma) = ctx.lemma_of(&neighbor.word) else {
                    continue;
                };
                if seen.insert(lemma) {
                    expanded.push(ExpandedTerm {
                        word: neighbor.word,
                        lemma,
                        weight: 0.5 * neighbor.similarity,
                    });
                }
            }
        }
    }

    expanded
}

/// Execute a ranked query over the resident context
pub fn execute(
    ctx: &SearchContext,
    params: &ScoringParams,
    raw_query: &str,
    mode: QueryMode,
) -> Result<QueryOutcome> {
    let query_words = tokenize(raw_query);
    if query_words.is_empty() {
        return Err(PapyrusError::InvalidQuery(
            "query contains no searchable tokens".to_string(),
        ));
    }

    let expanded_terms = expand_query(ctx, params, &query_words);
    let original_term_count = query_words.len() as u32;

    let mut accumulator: HashMap<DocId, SearchHit> = HashMap::new();

    for term in &expanded_terms {
        let Some(retrieved) = ctx.retrieve_postings(term.lemma)? else {
            debug!(word = %term.word, lemma = %term.lemma, "no postings for term");
            continue;
        };

        for posting in &retrieved.postings {
            let score = tfidf(posting.tf, retrieved.df, params.total_docs);

            let hit = accumulator
                .entry(posting.doc_id.clone())
                .or_insert_with(|| SearchHit {
                    doc_id: posting.doc_id.clone(),
                    total_score: 0.0,
                    tfidf_score: 0.0,
                    semantic_score: 0.0,
                    authority_score: f64::from(ctx.authority(&posting.doc_id)),
                    matched_terms: 0,
                    total_terms: original_term_count,
                });

            hit.tfidf_score += score * f64::from(term.weight);
            if term.weight < 1.0 {
                hit.semantic_score += score * f64::from(term.weight);
            } else {
                hit.matched_terms += 1;
            }
        }
    }

    let required_terms = match mode {
        QueryMode::And => original_term_count,
        QueryMode::Or => 1,
    };

    let mut hits: Vec<SearchHit> = accumulator
        .into_values()
        .filter(|hit| hit.matched_terms >= required_terms)
        .map(|mut hit| {
            hit.total_score = params.tfidf_weight * hit.tfidf_score
                + params.semantic_weight * hit.semantic_score
                + params.authority_weight * hit.authority_score;
            hit
        })
        .collect();

    hits.sort_by(rank_order);

    let total_matches = hits.len();
    hits.truncate(params.top_k);

    Ok(QueryOutcome {
        hits,
        expanded_terms,
        total_matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tfidf_arithmetic() {
        // tf=2, df=2, N=2: (1 + log10 2) * log10(1) = 0
        assert_eq!(tfidf(2, 2, 2), 0.0);

        // tf=1, df=1, N=10: 1.0 * 1.0
        assert!((tfidf(1, 1, 10) - 1.0).abs() < 1e-12);

        // tf=10, df=100, N=59000: (1 + 1) * log10(590)
        let expected = 2.0 * 590f64.log10();
        assert!((tfidf(10, 100, 59_000) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_tfidf_zero_guards() {
        assert_eq!(tfidf(0, 5, 100), 0.0);
        assert_eq!(tfidf(5, 0, 100), 0.0);
    }

    #[test]
    fn test_default_params_match_ranking_contract() {
        let params = ScoringParams::default();
        assert_eq!(params.total_docs, 59_000);
        assert_eq!(params.tfidf_weight, 0.5);
        assert_eq!(params.semantic_weight, 0.3);
        assert_eq!(params.authority_weight, 0.2);
        assert_eq!(params.top_k, 20);
    }

    #[test]
    fn test_hit_ordering() {
        let mut hits = vec![
            SearchHit {
                doc_id: "PMC2".to_string(),
                total_score: 1.0,
                tfidf_score: 0.0,
                semantic_score: 0.0,
                authority_score: 0.5,
                matched_terms: 1,
                total_terms: 1,
            },
            SearchHit {
                doc_id: "PMC1".to_string(),
                total_score: 1.0,
                tfidf_score: 0.0,
                semantic_score: 0.0,
                authority_score: 0.5,
                matched_terms: 1,
                total_terms: 1,
            },
            SearchHit {
                doc_id: "PMC3".to_string(),
                total_score: 2.0,
                tfidf_score: 0.0,
                semantic_score: 0.0,
                authority_score: 0.5,
                matched_terms: 1,
                total_terms: 1,
            },
        ];

        hits.sort_by(rank_order);

        let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["PMC3", "PMC1", "PMC2"]);
    }
}
