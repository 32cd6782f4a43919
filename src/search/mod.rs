//! Fuzzy club search.
//!
//! A query is matched against club names with a token-sort score and against
//! descriptions with a token-set score. Each pass keeps its best
//! `candidate_limit` candidates, then drops those under its threshold; the
//! union of the two passes is the result. Short queries, queries that match
//! nothing, and scoring failures all fall back to a plain case-insensitive
//! substring filter. Results are always ordered by name, ignoring case.

pub mod similarity;

pub use similarity::{DiffSimilarity, Similarity, SimilarityError};

use crate::app_config::SearchConfig;
use crate::orm::clubs;
use std::collections::BTreeSet;

/// Something club search can rank.
pub trait Searchable {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

impl Searchable for clubs::Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Filters and orders `candidates` for `query`.
pub fn search<T, S>(query: &str, candidates: Vec<T>, config: &SearchConfig, scorer: &S) -> Vec<T>
where
    T: Searchable,
    S: Similarity + ?Sized,
{
    let query = query.trim();

    let mut results = if query.is_empty() {
        candidates
    } else if query.chars().count() < config.min_fuzzy_query_len {
        substring_matches(query, candidates)
    } else {
        match fuzzy_matches(query, &candidates, config, scorer) {
            Ok(matched) if !matched.is_empty() => candidates
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| matched.contains(idx))
                .map(|(_, candidate)| candidate)
                .collect(),
            Ok(_) => substring_matches(query, candidates),
            Err(e) => {
                log::warn!("Club search falling back to substring match: {}", e);
                substring_matches(query, candidates)
            }
        }
    };

    sort_by_name(&mut results);
    results
}

/// Indices of candidates that pass either the name or the description pass.
fn fuzzy_matches<T, S>(
    query: &str,
    candidates: &[T],
    config: &SearchConfig,
    scorer: &S,
) -> Result<BTreeSet<usize>, SimilarityError>
where
    T: Searchable,
    S: Similarity + ?Sized,
{
    let mut matched = BTreeSet::new();

    let name_scores = candidates
        .iter()
        .map(|c| scorer.token_sort_ratio(query, c.name()))
        .collect::<Result<Vec<u8>, _>>()?;
    matched.extend(best_above(
        name_scores,
        config.candidate_limit,
        config.name_threshold,
    ));

    let description_scores = candidates
        .iter()
        .map(|c| scorer.token_set_ratio(query, c.description()))
        .collect::<Result<Vec<u8>, _>>()?;
    matched.extend(best_above(
        description_scores,
        config.candidate_limit,
        config.description_threshold,
    ));

    Ok(matched)
}

/// Takes the `limit` highest scores (earlier candidates win ties) and keeps
/// the indices of those reaching `threshold`.
fn best_above(scores: Vec<u8>, limit: usize, threshold: u8) -> Vec<usize> {
    let mut ranked: Vec<(usize, u8)> = scores.into_iter().enumerate().collect();
    // Stable, so equal scores keep candidate order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .filter(|(_, score)| *score >= threshold)
        .map(|(idx, _)| idx)
        .collect()
}

fn substring_matches<T: Searchable>(query: &str, candidates: Vec<T>) -> Vec<T> {
    let needle = query.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| {
            c.name().to_lowercase().contains(&needle)
                || c.description().to_lowercase().contains(&needle)
        })
        .collect()
}

fn sort_by_name<T: Searchable>(items: &mut [T]) {
    items.sort_by_cached_key(|item| item.name().to_lowercase());
}
