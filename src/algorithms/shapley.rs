// src/algorithms/shapley.rs

//! Shapley value: the average marginal contribution of a feature over all
//! orderings of the players.

use rand::Rng;

use crate::algorithms::coalition::{random_permutation, Coalition};
use crate::algorithms::game::{estimate_by_sampling, Game, SampledEstimate, SamplingPlan};
use crate::core::Result;
use crate::progress::ProgressReporter;
use crate::utils::{shapley_weight, Executor};

/// Exact Shapley values from the arena of `v(S)` indexed by bitmask.
///
/// `φ_i = Σ_{S ∌ i} |S|! (m-|S|-1)! / m! · (v(S ∪ {i}) − v(S))`
pub fn exact(values: &[f64], n_players: usize) -> Vec<f64> {
    debug_assert_eq!(values.len(), 1 << n_players);
    let weights: Vec<f64> = (0..n_players)
        .map(|size| shapley_weight(size, n_players))
        .collect();

    (0..n_players)
        .map(|player| {
            let bit = 1usize << player;
            (0..values.len())
                .filter(|mask| mask & bit == 0)
                .map(|mask| {
                    let size = mask.count_ones() as usize;
                    weights[size] * (values[mask | bit] - values[mask])
                })
                .sum()
        })
        .collect()
}

/// Marginal contribution of every player along one ordering.
pub fn permutation_contributions(game: &Game<'_>, order: &[usize]) -> Result<Vec<f64>> {
    let m = game.n_players();
    let mut contributions = vec![0.0; m];
    let mut coalition = Coalition::empty(m);
    let mut previous = game.value(&coalition)?;
    for &player in order {
        coalition.insert(player);
        let current = game.value(&coalition)?;
        contributions[player] = current - previous;
        previous = current;
    }
    Ok(contributions)
}

/// Monte-Carlo Shapley estimate over random permutations.
pub fn sampled<R: Rng>(
    game: &Game<'_>,
    executor: &Executor,
    reporter: &mut ProgressReporter,
    plan: &SamplingPlan,
    rng: &mut R,
) -> Result<SampledEstimate> {
    let m = game.n_players();
    estimate_by_sampling(
        executor,
        reporter,
        plan,
        m,
        || random_permutation(m, rng),
        |order| permutation_contributions(game, order),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Glove game on three players: v(S) = 1 iff S contains player 0 and one of {1, 2}.
    fn glove_values() -> Vec<f64> {
        (0..8usize)
            .map(|mask| {
                if mask & 1 == 1 && mask & 0b110 != 0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn glove_game() {
        let phi = exact(&glove_values(), 3);
        assert_abs_diff_eq!(phi[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phi[1], 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phi[2], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn additive_game_returns_weights() {
        let w = [0.5, -1.0, 2.0, 0.25];
        let values: Vec<f64> = (0..16usize)
            .map(|mask| (0..4).filter(|j| mask >> j & 1 == 1).map(|j| w[j]).sum())
            .collect();
        let phi = exact(&values, 4);
        for j in 0..4 {
            assert_abs_diff_eq!(phi[j], w[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn single_player() {
        let phi = exact(&[0.2, 0.9], 1);
        assert_abs_diff_eq!(phi[0], 0.7, epsilon = 1e-12);
    }
}
