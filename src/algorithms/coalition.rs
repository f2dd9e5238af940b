// src/algorithms/coalition.rs

//! Coalition generation.
//!
//! A coalition is a subset of the *variable* feature positions `0..m`.
//! Exhaustive mode walks integer bitmasks `0..2^m`; sampled mode draws random
//! permutations (Shapley) or uniform random subsets (Banzhaf).

use ndarray::{ArrayView2, Axis};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::core::{Dataset, FeatureIndex, QiiError, Result};

const WORD_BITS: usize = 64;

/// Set of variable positions held at the focal instance's values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coalition {
    words: Vec<u64>,
    n_players: usize,
}

impl Coalition {
    pub fn empty(n_players: usize) -> Self {
        Coalition {
            words: vec![0; n_players.div_ceil(WORD_BITS)],
            n_players,
        }
    }

    pub fn full(n_players: usize) -> Self {
        let mut coalition = Coalition::empty(n_players);
        for position in 0..n_players {
            coalition.insert(position);
        }
        coalition
    }

    /// Coalition whose bit `j` of `mask` marks position `j` as present.
    pub fn from_mask(mask: usize, n_players: usize) -> Self {
        let mut coalition = Coalition::empty(n_players);
        for position in 0..n_players.min(usize::BITS as usize) {
            if (mask >> position) & 1 == 1 {
                coalition.insert(position);
            }
        }
        coalition
    }

    pub fn n_players(&self) -> usize {
        self.n_players
    }

    pub fn contains(&self, position: usize) -> bool {
        position < self.n_players && (self.words[position / WORD_BITS] >> (position % WORD_BITS)) & 1 == 1
    }

    pub fn insert(&mut self, position: usize) {
        assert!(position < self.n_players, "position {} out of range", position);
        self.words[position / WORD_BITS] |= 1 << (position % WORD_BITS);
    }

    pub fn remove(&mut self, position: usize) {
        if position < self.n_players {
            self.words[position / WORD_BITS] &= !(1 << (position % WORD_BITS));
        }
    }

    #[must_use]
    pub fn with(&self, position: usize) -> Self {
        let mut next = self.clone();
        next.insert(position);
        next
    }

    #[must_use]
    pub fn without(&self, position: usize) -> Self {
        let mut next = self.clone();
        next.remove(position);
        next
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_players).filter(move |&p| self.contains(p))
    }
}

/// Maps coalitions over variable positions to the feature indices held at
/// the focal instance.
///
/// Features outside the evaluated set are permanently present.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    evaluated: Vec<FeatureIndex>,
    fixed: Vec<FeatureIndex>,
}

impl FeatureSpace {
    /// `evaluated` must be sorted, unique and within `0..n_features`.
    pub fn new(evaluated: Vec<FeatureIndex>, n_features: usize) -> Self {
        let fixed = (0..n_features)
            .filter(|f| evaluated.binary_search(f).is_err())
            .collect();
        FeatureSpace { evaluated, fixed }
    }

    /// Number of players in the coalition game.
    pub fn n_players(&self) -> usize {
        self.evaluated.len()
    }

    pub fn evaluated(&self) -> &[FeatureIndex] {
        &self.evaluated
    }

    /// Sorted feature indices held at the focal instance for `coalition`.
    pub fn present_features(&self, coalition: &Coalition) -> Vec<FeatureIndex> {
        let mut present: Vec<FeatureIndex> = self
            .fixed
            .iter()
            .copied()
            .chain(coalition.iter().map(|p| self.evaluated[p]))
            .collect();
        present.sort_unstable();
        present
    }
}

/// Number of coalitions in the exhaustive enumeration of `n_players`.
pub fn coalition_count(n_players: usize) -> usize {
    1usize << n_players
}

/// Every coalition of `n_players`, indexed by bitmask.
pub fn enumerate(n_players: usize) -> impl Iterator<Item = Coalition> {
    (0..coalition_count(n_players)).map(move |mask| Coalition::from_mask(mask, n_players))
}

/// A uniformly random ordering of `0..n_players`.
pub fn random_permutation<R: Rng + ?Sized>(n_players: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_players).collect();
    order.shuffle(rng);
    order
}

/// Draws coalitions uniformly from all `2^n_players` subsets.
#[derive(Debug, Clone)]
pub struct CoalitionSampler {
    n_players: usize,
    coin: Bernoulli,
}

impl CoalitionSampler {
    pub fn new(n_players: usize) -> Result<Self> {
        let coin = Bernoulli::new(0.5)
            .map_err(|e| QiiError::Internal(format!("invalid inclusion probability: {}", e)))?;
        Ok(CoalitionSampler { n_players, coin })
    }

    /// Each position is included independently with probability 1/2.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Coalition {
        let mut coalition = Coalition::empty(self.n_players);
        for position in 0..self.n_players {
            if self.coin.sample(rng) {
                coalition.insert(position);
            }
        }
        coalition
    }
}

/// Rows of the pool used for empirical substitution.
///
/// Exhaustive mode, or a pool no larger than `sample_size`, keeps every row.
/// Otherwise `sample_size` rows are drawn without replacement.
pub fn sample_pool<R: Rng + ?Sized>(
    pool: ArrayView2<f64>,
    exhaustive: bool,
    sample_size: usize,
    rng: &mut R,
) -> Result<Dataset> {
    if pool.nrows() == 0 {
        return Err(QiiError::InvalidInput("data pool has no rows".to_string()));
    }
    if exhaustive || pool.nrows() <= sample_size {
        return Ok(pool.to_owned());
    }
    let mut rows = index::sample(rng, pool.nrows(), sample_size).into_vec();
    rows.sort_unstable();
    Ok(pool.select(Axis(0), &rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn mask_round_trip_positions() {
        let c = Coalition::from_mask(0b1010, 4);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(c.len(), 2);
        assert!(c.contains(1) && !c.contains(0));
        assert!(!c.contains(10));
    }

    #[test]
    fn with_and_without() {
        let c = Coalition::empty(3).with(2);
        assert_eq!(c.len(), 1);
        assert!(c.without(2).is_empty());
        assert_eq!(Coalition::full(3).len(), 3);
    }

    #[test]
    fn wide_coalitions_span_words() {
        let mut c = Coalition::empty(130);
        c.insert(0);
        c.insert(64);
        c.insert(129);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
        assert_eq!(Coalition::full(130).len(), 130);
    }

    #[test]
    fn enumeration_covers_every_subset_once() {
        let all: Vec<_> = enumerate(4).collect();
        assert_eq!(all.len(), 16);
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(unique.len(), 16);
        assert!(all[0].is_empty());
        assert_eq!(all[15], Coalition::full(4));
    }

    #[test]
    fn present_features_include_fixed() {
        let space = FeatureSpace::new(vec![1, 3], 5);
        assert_eq!(space.n_players(), 2);
        assert_eq!(space.present_features(&Coalition::empty(2)), vec![0, 2, 4]);
        assert_eq!(space.present_features(&Coalition::from_mask(0b10, 2)), vec![0, 2, 3, 4]);
    }

    #[test]
    fn permutation_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut order = random_permutation(6, &mut rng);
        order.sort_unstable();
        assert_eq!(order, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn random_coalitions_are_roughly_half_full() {
        let mut rng = StdRng::seed_from_u64(11);
        let sampler = CoalitionSampler::new(10).unwrap();
        let total: usize = (0..2000).map(|_| sampler.sample(&mut rng).len()).sum();
        let mean = total as f64 / 2000.0;
        assert!((mean - 5.0).abs() < 0.3, "mean size {}", mean);
    }

    #[test]
    fn pool_sampling() {
        let pool = Array2::from_shape_fn((50, 2), |(i, j)| (i * 2 + j) as f64);
        let mut rng = StdRng::seed_from_u64(1);

        let full = sample_pool(pool.view(), true, 10, &mut rng).unwrap();
        assert_eq!(full, pool);

        let sampled = sample_pool(pool.view(), false, 10, &mut rng).unwrap();
        assert_eq!(sampled.dim(), (10, 2));
        // Rows are copied whole, never mixed.
        for row in sampled.rows() {
            assert_eq!(row[1], row[0] + 1.0);
        }

        let empty = Array2::<f64>::zeros((0, 2));
        assert!(sample_pool(empty.view(), true, 10, &mut rng).is_err());
    }
}
