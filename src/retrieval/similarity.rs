//! Dimensional-profile similarity ranking.

use std::collections::BTreeMap;

use crate::db::DimensionalProfile;
use crate::dimension::Dimension;

/// A candidate reference profile with its computed distance to the target.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub profile: DimensionalProfile,
    /// Euclidean distance over the shared dimensions. Lower is closer.
    pub distance: f64,
    /// `1 / (1 + distance)`: monotonic inverse map into (0, 1].
    pub similarity: f64,
}

/// Rank candidate profiles by dimensional closeness to a target profile.
///
/// Distance is Euclidean over the intersection of dimensions scored in both
/// target and candidate. Candidates sharing no scored dimension with the
/// target are excluded outright rather than penalized. Ties are broken by
/// ascending profile id so identical inputs always produce identical
/// ordered output.
///
/// An empty candidate pool (advisor with no reference material) yields an
/// empty result; that is an expected outcome, not an error.
pub fn find_similar(
    candidates: &[DimensionalProfile],
    target: &BTreeMap<Dimension, f64>,
    top_k: usize,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = candidates
        .iter()
        .filter_map(|candidate| {
            let distance = profile_distance(target, &candidate.scores)?;
            Some(SimilarityMatch {
                profile: candidate.clone(),
                distance,
                similarity: 1.0 / (1.0 + distance),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.profile.id.cmp(&b.profile.id))
    });

    matches.truncate(top_k);
    matches
}

/// Euclidean distance over shared dimensions, or `None` when the
/// intersection is empty.
fn profile_distance(
    target: &BTreeMap<Dimension, f64>,
    candidate: &BTreeMap<Dimension, f64>,
) -> Option<f64> {
    let mut sum_sq = 0.0;
    let mut shared = 0;

    for (dim, target_score) in target {
        if let Some(candidate_score) = candidate.get(dim) {
            let delta = target_score - candidate_score;
            sum_sq += delta * delta;
            shared += 1;
        }
    }

    if shared == 0 {
        return None;
    }

    Some(sum_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, scores: &[(Dimension, f64)]) -> DimensionalProfile {
        DimensionalProfile {
            id,
            advisor_id: "ansel".to_string(),
            image_path: format!("/refs/{}.jpg", id),
            scores: scores.iter().cloned().collect(),
            ..Default::default()
        }
    }

    fn target(scores: &[(Dimension, f64)]) -> BTreeMap<Dimension, f64> {
        scores.iter().cloned().collect()
    }

    #[test]
    fn test_ranks_by_ascending_distance() {
        let candidates = vec![
            profile(1, &[(Dimension::Composition, 9.0)]),
            profile(2, &[(Dimension::Composition, 7.0)]),
            profile(3, &[(Dimension::Composition, 4.0)]),
        ];
        let target = target(&[(Dimension::Composition, 8.0)]);

        let matches = find_similar(&candidates, &target, 2);
        assert_eq!(matches.len(), 2);
        // Distances 1, 1, 4: the two closest win, tie broken by id
        assert_eq!(matches[0].profile.id, 1);
        assert_eq!(matches[1].profile.id, 2);
        assert_eq!(matches[0].distance, 1.0);
        assert_eq!(matches[1].distance, 1.0);
    }

    #[test]
    fn test_similarity_in_unit_interval() {
        let candidates = vec![
            profile(1, &[(Dimension::Composition, 10.0)]),
            profile(2, &[(Dimension::Composition, 0.0)]),
        ];
        let target = target(&[(Dimension::Composition, 10.0)]);

        let matches = find_similar(&candidates, &target, 10);
        for m in &matches {
            assert!(m.similarity > 0.0 && m.similarity <= 1.0);
        }
        // Exact match has similarity exactly 1
        assert_eq!(matches[0].similarity, 1.0);
    }

    #[test]
    fn test_distance_over_intersection_only() {
        // Candidate has extra dimensions the target lacks; they must not
        // contribute to the distance.
        let candidates = vec![profile(
            1,
            &[
                (Dimension::Composition, 8.0),
                (Dimension::Lighting, 1.0),
                (Dimension::VisualBalance, 1.0),
            ],
        )];
        let target = target(&[(Dimension::Composition, 8.0)]);

        let matches = find_similar(&candidates, &target, 1);
        assert_eq!(matches[0].distance, 0.0);
    }

    #[test]
    fn test_empty_intersection_excluded() {
        let candidates = vec![
            profile(1, &[(Dimension::Lighting, 9.0)]),
            profile(2, &[(Dimension::Composition, 9.0)]),
        ];
        let target = target(&[(Dimension::Composition, 8.0)]);

        let matches = find_similar(&candidates, &target, 10);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].profile.id, 2);
    }

    #[test]
    fn test_empty_pool_is_empty_result() {
        let target = target(&[(Dimension::Composition, 8.0)]);
        assert!(find_similar(&[], &target, 5).is_empty());
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let candidates: Vec<_> = (1..=6)
            .map(|id| profile(id, &[(Dimension::Composition, 8.0), (Dimension::Lighting, 5.0)]))
            .collect();
        let target = target(&[(Dimension::Composition, 8.0), (Dimension::Lighting, 5.0)]);

        let first: Vec<i64> = find_similar(&candidates, &target, 4)
            .iter()
            .map(|m| m.profile.id)
            .collect();
        let second: Vec<i64> = find_similar(&candidates, &target, 4)
            .iter()
            .map(|m| m.profile.id)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_multi_dimension_euclidean() {
        let candidates = vec![profile(
            1,
            &[(Dimension::Composition, 5.0), (Dimension::Lighting, 2.0)],
        )];
        let target = target(&[(Dimension::Composition, 8.0), (Dimension::Lighting, 6.0)]);

        let matches = find_similar(&candidates, &target, 1);
        assert!((matches[0].distance - 5.0).abs() < 1e-9); // sqrt(9 + 16)
    }
}
