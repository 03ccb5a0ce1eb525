//! Mastery-weighted item selection
//!
//! Candidates are weighted inversely by mastery score so weaker letters
//! come up more often, but selection stays random rather than
//! lowest-first to avoid predictable drilling. The immediately-previous
//! item is excluded whenever at least two candidates exist.

use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Weight floor so well-mastered items stay in rotation
const WEIGHT_FLOOR: f32 = 0.1;

/// Pick an index from `candidates` weighted by `1 - score(c)`
///
/// `previous` is excluded unless it is the only candidate. Returns
/// `None` only for an empty candidate list.
pub fn weighted_pick<T, R, S, P>(
    rng: &mut R,
    candidates: &[T],
    mut score: S,
    mut is_previous: P,
) -> Option<usize>
where
    R: Rng,
    S: FnMut(&T) -> f32,
    P: FnMut(&T) -> bool,
{
    if candidates.is_empty() {
        return None;
    }

    let eligible: Vec<usize> = if candidates.len() >= 2 {
        (0..candidates.len())
            .filter(|&i| !is_previous(&candidates[i]))
            .collect()
    } else {
        vec![0]
    };
    // Exclusion can only ever remove one item, so this stays non-empty
    let eligible = if eligible.is_empty() {
        (0..candidates.len()).collect()
    } else {
        eligible
    };

    let weights: Vec<f32> = eligible
        .iter()
        .map(|&i| (1.0 - score(&candidates[i]).clamp(0.0, 1.0)) + WEIGHT_FLOOR)
        .collect();

    match WeightedIndex::new(&weights) {
        Ok(dist) => Some(eligible[dist.sample(rng)]),
        // All-zero weights cannot happen with the floor, but fall back
        // to uniform rather than panic
        Err(_) => eligible.choose(rng).copied(),
    }
}
