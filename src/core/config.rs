// src/core/config.rs
use crate::utils::Parallelism;

/// How many samples the approximate modes draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleBudget {
    /// Derived from `tolerance` and `confidence` with a Hoeffding bound.
    ///
    /// The bound assumes the QoI lies in `[0, 1]`, as `label_unchanged_ratio`
    /// and `label_probability` do. For `average_output` or a custom QoI with
    /// a wider range the count carries no error guarantee, and the sampled
    /// progress total is only a nominal budget. Use `Fixed` there.
    Auto,
    Fixed(usize),
}

/// Configuration for the QII explainer.
#[derive(Debug, Clone)]
pub struct QiiConfig {
    /// Permutations (Shapley) or coalitions (Banzhaf) drawn in sampled mode.
    pub n_samples: SampleBudget,
    /// Target absolute error used by [`SampleBudget::Auto`].
    pub tolerance: f64,
    /// Target confidence used by [`SampleBudget::Auto`].
    pub confidence: f64,
    /// Rows drawn from the data pool when the data dimension is sampled.
    pub data_sample_size: usize,
    /// Largest evaluated feature count enumerated exhaustively.
    pub max_exhaustive_features: usize,
    pub parallelism: Parallelism,
    /// Seed for every random draw of one compute call. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Stop sampling once the convergence indicator drops below this value.
    pub convergence_threshold: Option<f64>,
    /// Number of most recent samples in the windowed mean.
    pub convergence_window: usize,
    /// Samples folded before early stopping is considered.
    pub min_samples: usize,
    /// Emit a progress update every this many items.
    pub report_every: usize,
}

impl Default for QiiConfig {
    fn default() -> Self {
        QiiConfig {
            n_samples: SampleBudget::Auto,
            tolerance: 0.05,
            confidence: 0.95,
            data_sample_size: 200,
            max_exhaustive_features: 16,
            parallelism: Parallelism::Sequential,
            seed: None,
            convergence_threshold: None,
            convergence_window: 100,
            min_samples: 100,
            report_every: 64,
        }
    }
}

impl QiiConfig {
    #[must_use]
    pub fn with_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = SampleBudget::Fixed(n_samples);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn with_data_sample_size(mut self, size: usize) -> Self {
        self.data_sample_size = size;
        self
    }

    #[must_use]
    pub fn with_convergence(mut self, threshold: f64, window: usize) -> Self {
        self.convergence_threshold = Some(threshold);
        self.convergence_window = window;
        self
    }

    #[must_use]
    pub fn with_report_every(mut self, every: usize) -> Self {
        self.report_every = every;
        self
    }

    pub(crate) fn validate(&self) -> crate::core::Result<()> {
        use crate::core::QiiError;

        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(QiiError::InvalidInput(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(QiiError::InvalidInput(format!(
                "confidence must lie in (0, 1), got {}",
                self.confidence
            )));
        }
        if self.n_samples == SampleBudget::Fixed(0) {
            return Err(QiiError::InvalidInput(
                "sample budget must be at least 1".to_string(),
            ));
        }
        if self.data_sample_size == 0 {
            return Err(QiiError::InvalidInput(
                "data_sample_size must be at least 1".to_string(),
            ));
        }
        if self.max_exhaustive_features > 30 {
            return Err(QiiError::InvalidInput(format!(
                "max_exhaustive_features above 30 is not supported, got {}",
                self.max_exhaustive_features
            )));
        }
        Ok(())
    }
}
