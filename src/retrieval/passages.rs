//! Corrective passage retrieval for weak dimensions.

use rand::Rng;
use std::collections::BTreeMap;

use super::sampler::{sample_diverse, WeightedCandidate};
use crate::db::BookPassage;
use crate::dimension::Dimension;

/// Dimensions where the target profile's score is at or below the weak
/// threshold, in canonical order.
pub fn weak_dimensions(target: &BTreeMap<Dimension, f64>, threshold: f64) -> Vec<Dimension> {
    target
        .iter()
        .filter(|(_, score)| **score <= threshold)
        .map(|(dim, _)| *dim)
        .collect()
}

/// Pick up to `top_k` passages illustrating the target's weak dimensions.
///
/// A passage is a candidate when its tags intersect the weak set; its
/// weight is the overlap count scaled by its static relevance score, so a
/// second matching tag always outweighs relevance differences. An empty
/// weak set returns an empty list: a uniformly strong image gets no
/// corrective citations.
pub fn select_passages<R: Rng>(
    passages: Vec<BookPassage>,
    weak: &[Dimension],
    top_k: usize,
    rng: &mut R,
) -> Vec<BookPassage> {
    if weak.is_empty() {
        return Vec::new();
    }

    let candidates: Vec<WeightedCandidate<BookPassage>> = passages
        .into_iter()
        .filter_map(|passage| {
            let overlap = passage
                .dimension_tags
                .iter()
                .filter(|tag| weak.contains(tag))
                .count();
            if overlap == 0 {
                return None;
            }
            let weight = overlap as f64 * (1.0 + passage.relevance_score.max(0.0));
            Some(WeightedCandidate {
                item: passage,
                weight,
            })
        })
        .collect();

    sample_diverse(candidates, top_k, rng)
}

/// The weak dimensions a given passage was retrieved for.
pub fn cited_dimensions(passage: &BookPassage, weak: &[Dimension]) -> Vec<Dimension> {
    passage
        .dimension_tags
        .iter()
        .filter(|tag| weak.contains(tag))
        .copied()
        .collect()
}
