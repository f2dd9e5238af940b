// src/algorithms/qii.rs

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;

use crate::algorithms::coalition::{coalition_count, sample_pool, FeatureSpace};
use crate::algorithms::game::{Game, SamplingPlan};
use crate::algorithms::qoi::QuantityOfInterest;
use crate::algorithms::{banzhaf, shapley};
use crate::core::{
    Dataset, FeatureIndex, InfluenceScores, Instance, Method, QiiConfig, QiiError, Result,
    SampleBudget,
};
use crate::progress::{NoProgress, ProgressReporter, ProgressSink};
use crate::traits::Predictor;
use crate::utils::{estimate_sample_count, Executor};

/// Width of the range a marginal contribution can span when the QoI lies in `[0, 1]`.
/// QoIs outside that range void the Hoeffding guarantee of `SampleBudget::Auto`.
const MARGINAL_RANGE: f64 = 2.0;

/// Options for one [`QiiExplainer::compute_with`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeOptions {
    /// Features to score. `None` scores every feature.
    pub evaluated_features: Option<Vec<FeatureIndex>>,
    /// Substitute from the whole data pool instead of a sample of it.
    pub data_exhaustive: bool,
    /// Enumerate every coalition instead of sampling.
    pub feature_exhaustive: bool,
    pub method: Method,
}

impl ComputeOptions {
    /// Exhaustive in both dimensions over every feature.
    pub fn new(method: Method) -> Self {
        ComputeOptions {
            evaluated_features: None,
            data_exhaustive: true,
            feature_exhaustive: true,
            method,
        }
    }

    #[must_use]
    pub fn features(mut self, features: Vec<FeatureIndex>) -> Self {
        self.evaluated_features = Some(features);
        self
    }

    #[must_use]
    pub fn data_exhaustive(mut self, exhaustive: bool) -> Self {
        self.data_exhaustive = exhaustive;
        self
    }

    #[must_use]
    pub fn feature_exhaustive(mut self, exhaustive: bool) -> Self {
        self.feature_exhaustive = exhaustive;
        self
    }
}

/// Computes Quantitative Input Influence of each feature on one prediction.
pub struct QiiExplainer<P: Predictor> {
    predictor: P,
    data_pool: Dataset,
    num_features: usize,
    qoi: QuantityOfInterest,
    config: QiiConfig,
    executor: Executor,
    progress: Arc<dyn ProgressSink>,
}

impl<P: Predictor> QiiExplainer<P> {
    pub fn new(predictor: P, data_pool: Dataset, config: Option<QiiConfig>) -> Result<Self> {
        let num_features = predictor.num_features();

        if data_pool.nrows() == 0 || num_features == 0 {
            return Err(QiiError::InvalidInput(
                "Data pool cannot be empty.".to_string(),
            ));
        }

        if data_pool.ncols() != num_features {
            return Err(QiiError::IncompatibleDimensions(format!(
                "Data pool has {} features, but predictor expects {}.",
                data_pool.ncols(),
                num_features
            )));
        }

        let resolved_config = config.unwrap_or_default();
        resolved_config.validate()?;
        let executor = Executor::new(resolved_config.parallelism)?;

        Ok(QiiExplainer {
            predictor,
            data_pool,
            num_features,
            qoi: QuantityOfInterest::new(),
            config: resolved_config,
            executor,
            progress: Arc::new(NoProgress),
        })
    }

    #[must_use]
    pub fn with_qoi(mut self, qoi: QuantityOfInterest) -> Self {
        self.qoi = qoi;
        self
    }

    #[must_use]
    pub fn with_progress<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.progress = Arc::new(sink);
        self
    }

    pub fn qoi(&self) -> &QuantityOfInterest {
        &self.qoi
    }

    pub fn qoi_mut(&mut self) -> &mut QuantityOfInterest {
        &mut self.qoi
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn data_pool(&self) -> &Dataset {
        &self.data_pool
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn config(&self) -> &QiiConfig {
        &self.config
    }

    /// Worker threads used for coalition evaluation.
    pub fn n_threads(&self) -> usize {
        self.executor.n_threads()
    }

    /// Scores `evaluated_features` (all features when `None`) with `method`,
    /// either `"shapley"` or `"banzhaf"`.
    ///
    /// Unlisted features stay at the focal instance's values in every coalition.
    pub fn compute(
        &self,
        x_0: &Instance,
        evaluated_features: Option<&[FeatureIndex]>,
        data_exhaustive: bool,
        feature_exhaustive: bool,
        method: &str,
    ) -> Result<InfluenceScores> {
        let method: Method = method.parse()?;
        let options = ComputeOptions {
            evaluated_features: evaluated_features.map(<[FeatureIndex]>::to_vec),
            data_exhaustive,
            feature_exhaustive,
            method,
        };
        self.compute_with(x_0, &options)
    }

    pub fn compute_with(&self, x_0: &Instance, options: &ComputeOptions) -> Result<InfluenceScores> {
        if x_0.len() != self.num_features {
            return Err(QiiError::IncompatibleDimensions(format!(
                "Instance to explain has {} features, but explainer expects {}.",
                x_0.len(),
                self.num_features
            )));
        }

        let evaluated = self.resolve_features(options.evaluated_features.as_deref())?;
        let space = FeatureSpace::new(evaluated, self.num_features);
        let m = space.n_players();

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = sample_pool(
            self.data_pool.view(),
            options.data_exhaustive,
            self.config.data_sample_size,
            &mut rng,
        )?;
        let executor = &self.executor;
        let game = Game::new(x_0.view(), pool.view(), &space, &self.qoi, &self.predictor);
        let chunk_size = (executor.n_threads() * 4).max(self.config.report_every);

        let exhaustive = if options.feature_exhaustive && m > self.config.max_exhaustive_features {
            log::warn!(
                "{} features exceed the exhaustive limit of {}; sampling coalitions instead",
                m,
                self.config.max_exhaustive_features
            );
            false
        } else {
            options.feature_exhaustive
        };

        log::debug!(
            "computing {} over {} features ({}, {} pool rows, qoi `{}`, {} threads)",
            options.method,
            m,
            if exhaustive { "exact" } else { "sampled" },
            pool.nrows(),
            self.qoi.active(),
            executor.n_threads()
        );

        let scores = if exhaustive {
            let total = coalition_count(m);
            let mut reporter =
                ProgressReporter::new(self.progress.clone(), total, false, self.config.report_every);
            let values = game.exhaustive_values(executor, &mut reporter, chunk_size)?;
            reporter.finish(values.len());

            let scores = match options.method {
                Method::Shapley => shapley::exact(&values, m),
                Method::Banzhaf => banzhaf::exact(&values, m),
            };
            InfluenceScores {
                scores: space.evaluated().iter().copied().zip(scores).collect(),
                method: options.method,
                exact: true,
                samples: values.len(),
                convergence: None,
                stopped_early: false,
                baseline: values.first().copied(),
                full: values.last().copied(),
            }
        } else {
            let plan = SamplingPlan {
                budget: self.sample_budget(),
                chunk_size,
                window: self.config.convergence_window,
                threshold: self.config.convergence_threshold,
                min_samples: self.config.min_samples,
            };
            let mut reporter =
                ProgressReporter::new(self.progress.clone(), plan.budget, true, self.config.report_every);
            let estimate = match options.method {
                Method::Shapley => shapley::sampled(&game, executor, &mut reporter, &plan, &mut rng)?,
                Method::Banzhaf => banzhaf::sampled(&game, executor, &mut reporter, &plan, &mut rng)?,
            };
            reporter.finish(estimate.samples);

            InfluenceScores {
                scores: space.evaluated().iter().copied().zip(estimate.scores).collect(),
                method: options.method,
                exact: false,
                samples: estimate.samples,
                convergence: estimate.convergence,
                stopped_early: estimate.stopped_early,
                baseline: None,
                full: None,
            }
        };

        Ok(scores)
    }

    /// Approximate sample count: fixed, or the Hoeffding estimate for the
    /// configured tolerance and confidence.
    pub fn sample_budget(&self) -> usize {
        match self.config.n_samples {
            SampleBudget::Fixed(n) => n,
            SampleBudget::Auto => {
                estimate_sample_count(self.config.tolerance, self.config.confidence, MARGINAL_RANGE)
            }
        }
    }

    /// Sorted, deduplicated evaluated features.
    fn resolve_features(&self, requested: Option<&[FeatureIndex]>) -> Result<Vec<FeatureIndex>> {
        let Some(requested) = requested else {
            return Ok((0..self.num_features).collect());
        };
        if requested.is_empty() {
            return Err(QiiError::EmptyFeatureSet);
        }
        if let Some(&bad) = requested.iter().find(|&&f| f >= self.num_features) {
            return Err(QiiError::InvalidInput(format!(
                "Feature index {} out of range for {} features.",
                bad, self.num_features
            )));
        }
        let mut features = requested.to_vec();
        features.sort_unstable();
        features.dedup();
        Ok(features)
    }
}

impl<P: Predictor> fmt::Debug for QiiExplainer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QiiExplainer")
            .field("data_pool", &self.data_pool.dim())
            .field("num_features", &self.num_features)
            .field("qoi", &self.qoi)
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
