// src/traits.rs

use ndarray::{Array1, Array2};
use std::sync::Arc;

use crate::core::{Dataset, PredictError};

/// Result type returned by predictors.
pub type PredictResult<T> = std::result::Result<T, PredictError>;

/// A trained model the engine can query.
///
/// The engine only calls these methods and never inspects the model. Every
/// call receives a whole batch of synthetic rows, so implementations should
/// vectorize over rows where they can.
pub trait Predictor: Send + Sync {
    /// One output per row: a class label for classifiers, a score otherwise.
    fn predict(&self, instances: &Dataset) -> PredictResult<Array1<f64>>;

    /// Class probabilities, one row per instance and one column per class.
    fn predict_proba(&self, _instances: &Dataset) -> PredictResult<Array2<f64>> {
        Err(PredictError::unsupported("predict_proba"))
    }

    fn num_features(&self) -> usize;
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn predict(&self, instances: &Dataset) -> PredictResult<Array1<f64>> {
        (**self).predict(instances)
    }

    fn predict_proba(&self, instances: &Dataset) -> PredictResult<Array2<f64>> {
        (**self).predict_proba(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, instances: &Dataset) -> PredictResult<Array1<f64>> {
        (**self).predict(instances)
    }

    fn predict_proba(&self, instances: &Dataset) -> PredictResult<Array2<f64>> {
        (**self).predict_proba(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

impl<P: Predictor + ?Sized> Predictor for Arc<P> {
    fn predict(&self, instances: &Dataset) -> PredictResult<Array1<f64>> {
        (**self).predict(instances)
    }

    fn predict_proba(&self, instances: &Dataset) -> PredictResult<Array2<f64>> {
        (**self).predict_proba(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

/// Adapts a closure over whole batches into a [`Predictor`].
///
/// ```
/// use qii_rs::{FnPredictor, Predictor};
/// use ndarray::Axis;
///
/// let model = FnPredictor::new(2, |batch: &ndarray::Array2<f64>| Ok(batch.sum_axis(Axis(1))));
/// assert_eq!(model.num_features(), 2);
/// ```
pub struct FnPredictor<F> {
    num_features: usize,
    predict_fn: F,
}

impl<F> FnPredictor<F>
where
    F: Fn(&Dataset) -> PredictResult<Array1<f64>> + Send + Sync,
{
    pub fn new(num_features: usize, predict_fn: F) -> Self {
        FnPredictor {
            num_features,
            predict_fn,
        }
    }
}

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&Dataset) -> PredictResult<Array1<f64>> + Send + Sync,
{
    fn predict(&self, instances: &Dataset) -> PredictResult<Array1<f64>> {
        (self.predict_fn)(instances)
    }

    fn num_features(&self) -> usize {
        self.num_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    #[test]
    fn fn_predictor_delegates() {
        let model = FnPredictor::new(2, |batch: &Dataset| Ok(batch.sum_axis(Axis(1))));
        let out = model.predict(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(out, array![3.0, 7.0]);
        assert!(model.predict_proba(&array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn wrappers_forward_calls() {
        let model = Arc::new(FnPredictor::new(1, |batch: &Dataset| Ok(batch.column(0).to_owned())));
        let boxed: Box<dyn Predictor> = Box::new(model.clone());
        assert_eq!(boxed.num_features(), 1);
        assert_eq!(boxed.predict(&array![[5.0]]).unwrap(), array![5.0]);
    }
}
