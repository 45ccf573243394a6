//! Diversity-aware citation sampling.
//!
//! Always citing the single closest reference produces the same images in
//! every critique. The sampler keeps a quality floor (the top-weighted
//! candidate is always selected) and fills remaining slots by weighted
//! random draw, so repeated analyses of similar images surface variety.

use rand::Rng;

/// A candidate with its selection weight for one request.
#[derive(Debug, Clone)]
pub struct WeightedCandidate<T> {
    pub item: T,
    pub weight: f64,
}

/// Select up to `k` candidates: the heaviest first, the rest drawn
/// weighted-random without replacement.
///
/// Candidates with weight <= 0 are never chosen, including the guaranteed
/// top slot — an all-zero pool yields an empty selection. Output order is
/// the guaranteed pick followed by the sampled picks in draw order, with
/// no duplicates. The rng is injected so tests can seed it; intentionally,
/// nothing else about the draw is reproducible.
pub fn sample_diverse<T, R: Rng>(
    mut candidates: Vec<WeightedCandidate<T>>,
    k: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut selected = Vec::new();
    if k == 0 || candidates.is_empty() {
        return selected;
    }

    // Quality floor: the top-weighted candidate always makes the cut.
    // First occurrence wins on equal weights.
    let mut best_idx = 0;
    for (idx, candidate) in candidates.iter().enumerate() {
        if candidate.weight > candidates[best_idx].weight {
            best_idx = idx;
        }
    }
    if candidates[best_idx].weight <= 0.0 {
        return selected;
    }
    selected.push(candidates.remove(best_idx).item);

    // Remaining slots: weighted draw without replacement.
    while selected.len() < k && !candidates.is_empty() {
        let total: f64 = candidates
            .iter()
            .map(|c| c.weight.max(0.0))
            .sum();
        if total <= 0.0 {
            break;
        }

        let mut roll = rng.gen_range(0.0..total);
        let mut chosen = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            let w = candidate.weight.max(0.0);
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                chosen = Some(idx);
                break;
            }
            roll -= w;
        }

        // Floating-point edge: the roll can land past the last positive
        // weight; fall back to it.
        let idx = match chosen.or_else(|| {
            candidates
                .iter()
                .rposition(|c| c.weight > 0.0)
        }) {
            Some(idx) => idx,
            None => break,
        };

        selected.push(candidates.remove(idx).item);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(weights: &[f64]) -> Vec<WeightedCandidate<usize>> {
        weights
            .iter()
            .enumerate()
            .map(|(item, &weight)| WeightedCandidate { item, weight })
            .collect()
    }

    #[test]
    fn test_top_weight_always_included() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = sample_diverse(pool(&[0.5, 3.0, 1.0, 0.2]), 2, &mut rng);
            assert_eq!(picked[0], 1, "seed {}", seed);
        }
    }

    #[test]
    fn test_no_duplicates() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked = sample_diverse(pool(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3, &mut rng);
            picked.sort();
            picked.dedup();
            assert_eq!(picked.len(), 3, "seed {}", seed);
        }
    }

    #[test]
    fn test_small_pool_returned_whole() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample_diverse(pool(&[1.0, 2.0]), 5, &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = sample_diverse(pool(&[0.0, 2.0, 0.0, 1.0]), 4, &mut rng);
            assert!(!picked.contains(&0), "seed {}", seed);
            assert!(!picked.contains(&2), "seed {}", seed);
            assert_eq!(picked.len(), 2, "seed {}", seed);
        }
    }

    #[test]
    fn test_all_zero_pool_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_diverse(pool(&[0.0, 0.0]), 3, &mut rng).is_empty());
    }

    #[test]
    fn test_k_zero_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_diverse(pool(&[1.0, 2.0]), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_draws_vary_across_seeds() {
        // With many equal-weight candidates, different seeds should not all
        // produce the same second pick.
        let weights = vec![10.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let mut second_picks = std::collections::HashSet::new();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = sample_diverse(pool(&weights), 2, &mut rng);
            second_picks.insert(picked[1]);
        }
        assert!(second_picks.len() > 1);
    }
}
