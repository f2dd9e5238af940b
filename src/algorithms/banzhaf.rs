// src/algorithms/banzhaf.rs

//! Banzhaf index: the unweighted average marginal contribution of a feature
//! over all coalitions that exclude it.

use rand::Rng;

use crate::algorithms::coalition::{Coalition, CoalitionSampler};
use crate::algorithms::game::{estimate_by_sampling, Game, SampledEstimate, SamplingPlan};
use crate::core::Result;
use crate::progress::ProgressReporter;
use crate::utils::Executor;

/// Exact Banzhaf indices from the arena of `v(S)` indexed by bitmask.
///
/// `β_i = Σ_{S ∌ i} (v(S ∪ {i}) − v(S)) / 2^(m-1)`
pub fn exact(values: &[f64], n_players: usize) -> Vec<f64> {
    debug_assert_eq!(values.len(), 1 << n_players);
    let denominator = (1usize << (n_players - 1)) as f64;

    (0..n_players)
        .map(|player| {
            let bit = 1usize << player;
            let total: f64 = (0..values.len())
                .filter(|mask| mask & bit == 0)
                .map(|mask| values[mask | bit] - values[mask])
                .sum();
            total / denominator
        })
        .collect()
}

/// One random coalition `S` yields, for every player `i`, the marginal
/// contribution `v(S ∪ {i}) − v(S \ {i})`.
///
/// `S \ {i}` is uniform over the coalitions excluding `i`, so each entry is
/// an unbiased single-sample Banzhaf estimate. Costs `m + 1` evaluations.
pub fn coalition_contributions(game: &Game<'_>, coalition: &Coalition) -> Result<Vec<f64>> {
    let v_s = game.value(coalition)?;
    (0..game.n_players())
        .map(|player| {
            if coalition.contains(player) {
                Ok(v_s - game.value(&coalition.without(player))?)
            } else {
                Ok(game.value(&coalition.with(player))? - v_s)
            }
        })
        .collect()
}

/// Monte-Carlo Banzhaf estimate over uniformly random coalitions.
pub fn sampled<R: Rng>(
    game: &Game<'_>,
    executor: &Executor,
    reporter: &mut ProgressReporter,
    plan: &SamplingPlan,
    rng: &mut R,
) -> Result<SampledEstimate> {
    let sampler = CoalitionSampler::new(game.n_players())?;
    estimate_by_sampling(
        executor,
        reporter,
        plan,
        game.n_players(),
        || sampler.sample(rng),
        |coalition| coalition_contributions(game, coalition),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn glove_game() {
        // v(S) = 1 iff S contains player 0 and one of {1, 2}
        let values: Vec<f64> = (0..8usize)
            .map(|mask| f64::from(u8::from(mask & 1 == 1 && mask & 0b110 != 0)))
            .collect();
        let beta = exact(&values, 3);
        // player 0 swings in {1}, {2}, {1,2}: 3 / 4
        assert_abs_diff_eq!(beta[0], 0.75, epsilon = 1e-12);
        // player 1 swings only in {0}: 1 / 4
        assert_abs_diff_eq!(beta[1], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(beta[2], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn differs_from_shapley_on_non_additive_games() {
        // Unanimity game on two players: v({0,1}) = 1, else 0.
        let values = [0.0, 0.0, 0.0, 1.0];
        let beta = exact(&values, 2);
        assert_abs_diff_eq!(beta[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(beta[1], 0.5, epsilon = 1e-12);

        // Three-player unanimity: Shapley gives 1/3 each, Banzhaf 1/4 each.
        let mut values = vec![0.0; 8];
        values[7] = 1.0;
        let beta = exact(&values, 3);
        assert_abs_diff_eq!(beta[0], 0.25, epsilon = 1e-12);
        let phi = crate::algorithms::shapley::exact(&values, 3);
        assert_abs_diff_eq!(phi[0], 1.0 / 3.0, epsilon = 1e-12);
    }
}
