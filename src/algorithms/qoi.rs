// src/algorithms/qoi.rs

//! Quantities of interest.
//!
//! A quantity of interest (QoI) is a scalar describing predictor behavior on
//! the focal instance when the features outside a coalition are replaced by
//! rows of the data pool. [`QuantityOfInterest`] is a registry of named QoI
//! functions with exactly one active entry.

use ndarray::{s, Array1, ArrayView1, ArrayView2};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::{Dataset, FeatureIndex, PredictError, QiiError, Result};
use crate::traits::Predictor;

/// Registered QoI function: (focal instance, data pool, present features, predictor) → scalar.
pub type QoiFunction = Arc<
    dyn Fn(ArrayView1<f64>, ArrayView2<f64>, &[FeatureIndex], &dyn Predictor) -> Result<f64>
        + Send
        + Sync,
>;

pub const LABEL_UNCHANGED_RATIO: &str = "label_unchanged_ratio";
pub const AVERAGE_OUTPUT: &str = "average_output";
pub const LABEL_PROBABILITY: &str = "label_probability";

/// Labels closer than this are considered equal.
const LABEL_TOLERANCE: f64 = 1e-9;

/// Registry of named QoI functions with one active entry.
///
/// Duplicate names are rejected; a failed `add` or `set` leaves the registry
/// unchanged.
#[derive(Clone)]
pub struct QuantityOfInterest {
    functions: BTreeMap<String, QoiFunction>,
    active: String,
}

impl QuantityOfInterest {
    /// Registry holding the built-in functions, with `label_unchanged_ratio` active.
    pub fn new() -> Self {
        let mut functions: BTreeMap<String, QoiFunction> = BTreeMap::new();
        functions.insert(LABEL_UNCHANGED_RATIO.to_string(), Arc::new(label_unchanged_ratio));
        functions.insert(AVERAGE_OUTPUT.to_string(), Arc::new(average_output));
        functions.insert(LABEL_PROBABILITY.to_string(), Arc::new(label_probability));
        QuantityOfInterest {
            functions,
            active: LABEL_UNCHANGED_RATIO.to_string(),
        }
    }

    /// Registers `function` under `name`. Fails with `DuplicateName` if taken.
    pub fn add<F>(&mut self, name: &str, function: F) -> Result<()>
    where
        F: Fn(ArrayView1<f64>, ArrayView2<f64>, &[FeatureIndex], &dyn Predictor) -> Result<f64>
            + Send
            + Sync
            + 'static,
    {
        if self.functions.contains_key(name) {
            return Err(QiiError::DuplicateName(name.to_string()));
        }
        self.functions.insert(name.to_string(), Arc::new(function));
        Ok(())
    }

    /// Makes `name` the active function. Fails with `UnknownName` if not registered.
    pub fn set(&mut self, name: &str) -> Result<()> {
        if !self.functions.contains_key(name) {
            return Err(QiiError::UnknownName(name.to_string()));
        }
        log::debug!("active quantity of interest: {}", name);
        self.active = name.to_string();
        Ok(())
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Runs the active function with `feature_idxs` held at `x_0`.
    pub fn evaluate(
        &self,
        x_0: ArrayView1<f64>,
        x_pool: ArrayView2<f64>,
        feature_idxs: &[FeatureIndex],
        predictor: &dyn Predictor,
    ) -> Result<f64> {
        let function = self
            .functions
            .get(&self.active)
            .ok_or_else(|| QiiError::UnknownName(self.active.clone()))?;
        function(x_0, x_pool, feature_idxs, predictor)
    }
}

impl Default for QuantityOfInterest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuantityOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantityOfInterest")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

/// Synthetic batch with one row per pool row.
///
/// Row `r` equals `x_0` on `feature_idxs` and row `r` of `x_pool` on every
/// other column, so each synthetic row is one coherent draw from the pool.
pub fn sample_empirical_data(
    x_0: ArrayView1<f64>,
    x_pool: ArrayView2<f64>,
    feature_idxs: &[FeatureIndex],
) -> Result<Dataset> {
    if x_0.len() != x_pool.ncols() {
        return Err(QiiError::IncompatibleDimensions(format!(
            "Focal instance has {} features, but data pool has {}.",
            x_0.len(),
            x_pool.ncols()
        )));
    }
    let mut batch = x_pool.to_owned();
    for &feature in feature_idxs {
        if feature >= x_0.len() {
            return Err(QiiError::InvalidInput(format!(
                "Feature index {} out of range for {} features.",
                feature,
                x_0.len()
            )));
        }
        batch.column_mut(feature).fill(x_0[feature]);
    }
    Ok(batch)
}

/// Substituted batch with `x_0` appended as the last row, so the focal
/// prediction rides along in the same predictor call.
fn batch_with_focal(
    x_0: ArrayView1<f64>,
    x_pool: ArrayView2<f64>,
    feature_idxs: &[FeatureIndex],
) -> Result<Dataset> {
    let mut batch = sample_empirical_data(x_0, x_pool, feature_idxs)?;
    batch.push_row(x_0)?;
    Ok(batch)
}

fn check_output_len(actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(PredictError::new(format!(
            "predictor returned {} outputs for {} rows",
            actual, expected
        ))
        .into());
    }
    Ok(())
}

fn split_focal(outputs: Array1<f64>) -> Result<(f64, Array1<f64>)> {
    let n = outputs.len();
    if n < 2 {
        return Err(QiiError::Internal("substituted batch is empty".to_string()));
    }
    Ok((outputs[n - 1], outputs.slice(s![..n - 1]).to_owned()))
}

/// Fraction of the substituted batch whose predicted label matches the
/// label the predictor assigns to `x_0`.
pub fn label_unchanged_ratio(
    x_0: ArrayView1<f64>,
    x_pool: ArrayView2<f64>,
    feature_idxs: &[FeatureIndex],
    predictor: &dyn Predictor,
) -> Result<f64> {
    let batch = batch_with_focal(x_0, x_pool, feature_idxs)?;
    let outputs = predictor.predict(&batch)?;
    check_output_len(outputs.len(), batch.nrows())?;
    let (target, labels) = split_focal(outputs)?;
    let unchanged = labels
        .iter()
        .filter(|&&label| (label - target).abs() <= LABEL_TOLERANCE)
        .count();
    Ok(unchanged as f64 / labels.len() as f64)
}

/// Mean predictor output over the substituted batch.
pub fn average_output(
    x_0: ArrayView1<f64>,
    x_pool: ArrayView2<f64>,
    feature_idxs: &[FeatureIndex],
    predictor: &dyn Predictor,
) -> Result<f64> {
    let batch = sample_empirical_data(x_0, x_pool, feature_idxs)?;
    let outputs = predictor.predict(&batch)?;
    check_output_len(outputs.len(), batch.nrows())?;
    outputs
        .mean()
        .ok_or_else(|| QiiError::Internal("substituted batch is empty".to_string()))
}

/// Mean probability the predictor assigns, over the substituted batch, to
/// the most likely class of `x_0`.
pub fn label_probability(
    x_0: ArrayView1<f64>,
    x_pool: ArrayView2<f64>,
    feature_idxs: &[FeatureIndex],
    predictor: &dyn Predictor,
) -> Result<f64> {
    let batch = batch_with_focal(x_0, x_pool, feature_idxs)?;
    let proba = predictor.predict_proba(&batch)?;
    check_output_len(proba.nrows(), batch.nrows())?;
    if proba.ncols() == 0 {
        return Err(PredictError::new("predict_proba returned no classes").into());
    }
    let n = proba.nrows() - 1;
    if n == 0 {
        return Err(QiiError::Internal("substituted batch is empty".to_string()));
    }
    let focal = proba.row(n);
    let label = focal
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(class, _)| class)
        .unwrap_or(0);
    let total: f64 = proba.slice(s![..n, label]).sum();
    Ok(total / n as f64)
}
