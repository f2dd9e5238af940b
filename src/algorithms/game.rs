// src/algorithms/game.rs

//! The coalition game shared by both power indices.

use ndarray::{ArrayView1, ArrayView2};
use std::collections::VecDeque;

use crate::algorithms::coalition::{coalition_count, Coalition, FeatureSpace};
use crate::algorithms::qoi::QuantityOfInterest;
use crate::core::Result;
use crate::progress::ProgressReporter;
use crate::traits::Predictor;
use crate::utils::Executor;

/// Characteristic function `v(S)`: the active QoI with the coalition's
/// features held at the focal instance.
pub struct Game<'a> {
    x_0: ArrayView1<'a, f64>,
    pool: ArrayView2<'a, f64>,
    space: &'a FeatureSpace,
    qoi: &'a QuantityOfInterest,
    predictor: &'a dyn Predictor,
}

impl<'a> Game<'a> {
    pub fn new(
        x_0: ArrayView1<'a, f64>,
        pool: ArrayView2<'a, f64>,
        space: &'a FeatureSpace,
        qoi: &'a QuantityOfInterest,
        predictor: &'a dyn Predictor,
    ) -> Self {
        Game {
            x_0,
            pool,
            space,
            qoi,
            predictor,
        }
    }

    pub fn n_players(&self) -> usize {
        self.space.n_players()
    }

    /// Evaluates `v(coalition)`. Predictor failures carry the present features.
    pub fn value(&self, coalition: &Coalition) -> Result<f64> {
        let present = self.space.present_features(coalition);
        self.qoi
            .evaluate(self.x_0, self.pool, &present, self.predictor)
            .map_err(|e| e.with_coalition(&present))
    }

    /// `v(S)` for every mask `S` in `0..2^m`, indexed by mask.
    pub fn exhaustive_values(
        &self,
        executor: &Executor,
        reporter: &mut ProgressReporter,
        chunk_size: usize,
    ) -> Result<Vec<f64>> {
        let m = self.n_players();
        let total = coalition_count(m);
        let masks: Vec<usize> = (0..total).collect();
        let mut values = Vec::with_capacity(total);
        for chunk in masks.chunks(chunk_size.max(1)) {
            let chunk_values =
                executor.map(chunk, |&mask| self.value(&Coalition::from_mask(mask, m)))?;
            values.extend(chunk_values);
            reporter.update(values.len());
        }
        log::trace!("evaluated {} coalitions", values.len());
        Ok(values)
    }
}

/// Running per-feature mean of sampled marginal contributions, plus a
/// windowed mean over the most recent samples.
#[derive(Debug, Clone)]
pub struct RunningEstimate {
    sums: Vec<f64>,
    count: usize,
    window: VecDeque<Vec<f64>>,
    window_sums: Vec<f64>,
    window_size: usize,
}

impl RunningEstimate {
    pub fn new(n_players: usize, window_size: usize) -> Self {
        RunningEstimate {
            sums: vec![0.0; n_players],
            count: 0,
            window: VecDeque::with_capacity(window_size.max(1)),
            window_sums: vec![0.0; n_players],
            window_size: window_size.max(1),
        }
    }

    pub fn push(&mut self, sample: Vec<f64>) {
        debug_assert_eq!(sample.len(), self.sums.len());
        for (i, &x) in sample.iter().enumerate() {
            self.sums[i] += x;
            self.window_sums[i] += x;
        }
        self.count += 1;
        self.window.push_back(sample);
        if self.window.len() > self.window_size {
            if let Some(old) = self.window.pop_front() {
                for (i, x) in old.into_iter().enumerate() {
                    self.window_sums[i] -= x;
                }
            }
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sums.iter().map(|s| s / n).collect()
    }

    /// Max absolute gap between the running and windowed means.
    ///
    /// `None` until the window has filled.
    pub fn convergence(&self) -> Option<f64> {
        if self.window.len() < self.window_size || self.count <= self.window_size {
            return None;
        }
        let n = self.count as f64;
        let w = self.window.len() as f64;
        let gap = self
            .sums
            .iter()
            .zip(&self.window_sums)
            .map(|(s, ws)| (s / n - ws / w).abs())
            .fold(0.0, f64::max);
        Some(gap)
    }

    /// `true` once the indicator is below `threshold` after `min_samples`.
    pub fn has_converged(&self, threshold: Option<f64>, min_samples: usize) -> bool {
        match (threshold, self.convergence()) {
            (Some(threshold), Some(gap)) => self.count >= min_samples && gap < threshold,
            _ => false,
        }
    }
}

/// Result of a sampled estimation.
#[derive(Debug, Clone)]
pub struct SampledEstimate {
    pub scores: Vec<f64>,
    pub samples: usize,
    pub convergence: Option<f64>,
    pub stopped_early: bool,
}

impl SampledEstimate {
    pub(crate) fn from_running(estimate: &RunningEstimate, stopped_early: bool) -> Self {
        SampledEstimate {
            scores: estimate.mean(),
            samples: estimate.count(),
            convergence: estimate.convergence(),
            stopped_early,
        }
    }
}

/// Sampling controls shared by the Shapley and Banzhaf estimators.
#[derive(Debug, Clone, Copy)]
pub struct SamplingPlan {
    pub budget: usize,
    pub chunk_size: usize,
    pub window: usize,
    pub threshold: Option<f64>,
    pub min_samples: usize,
}

/// Draws samples in chunks on the calling thread, evaluates each chunk on the
/// executor, and folds the per-sample marginal contributions in draw order.
///
/// The stopping point depends only on the draw order, so seeded runs agree
/// across thread counts.
pub fn estimate_by_sampling<S, D, E>(
    executor: &Executor,
    reporter: &mut ProgressReporter,
    plan: &SamplingPlan,
    n_players: usize,
    mut draw: D,
    evaluate: E,
) -> Result<SampledEstimate>
where
    S: Send + Sync,
    D: FnMut() -> S,
    E: Fn(&S) -> Result<Vec<f64>> + Sync + Send,
{
    let mut estimate = RunningEstimate::new(n_players, plan.window);
    let mut drawn = 0;
    while drawn < plan.budget {
        let n = plan.chunk_size.max(1).min(plan.budget - drawn);
        let samples: Vec<S> = (0..n).map(|_| draw()).collect();
        drawn += n;
        let contributions = executor.map(&samples, &evaluate)?;
        for sample in contributions {
            estimate.push(sample);
            if estimate.has_converged(plan.threshold, plan.min_samples) {
                log::debug!(
                    "converged after {} samples (gap {:?})",
                    estimate.count(),
                    estimate.convergence()
                );
                return Ok(SampledEstimate::from_running(&estimate, true));
            }
        }
        reporter.update(estimate.count());
        log::trace!("folded {}/{} samples", estimate.count(), plan.budget);
    }
    Ok(SampledEstimate::from_running(&estimate, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn running_mean_and_window() {
        let mut est = RunningEstimate::new(2, 2);
        est.push(vec![1.0, 0.0]);
        est.push(vec![3.0, 0.0]);
        assert_eq!(est.convergence(), None);
        est.push(vec![5.0, 0.0]);

        assert_eq!(est.count(), 3);
        assert_abs_diff_eq!(est.mean()[0], 3.0);
        // running 3.0, window mean (3 + 5) / 2 = 4.0
        assert_abs_diff_eq!(est.convergence().unwrap(), 1.0);
        assert!(!est.has_converged(Some(0.5), 1));
        assert!(est.has_converged(Some(1.5), 1));
        assert!(!est.has_converged(Some(1.5), 10));
        assert!(!est.has_converged(None, 1));
    }

    #[test]
    fn constant_samples_converge_to_zero_gap() {
        let mut est = RunningEstimate::new(3, 5);
        for _ in 0..20 {
            est.push(vec![0.25, -0.5, 0.0]);
        }
        assert_abs_diff_eq!(est.convergence().unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(est.mean(), vec![0.25, -0.5, 0.0]);
    }
}
