// src/lib.rs

//! `qii_rs` computes Quantitative Input Influence: how much each input feature
//! of a black-box predictor drives a quantity of interest on one instance,
//! measured with the Shapley value or the Banzhaf index.
//!
//! Absent features are replaced row by row with values from a reference data
//! pool. Both indices can be computed exactly, by enumerating every coalition,
//! or estimated by sampling.
//!
//! ```
//! use ndarray::{array, Array2};
//! use qii_rs::{FnPredictor, QiiExplainer};
//!
//! // Label 1 iff feature 2 exceeds 0.5.
//! let model = FnPredictor::new(4, |batch: &Array2<f64>| {
//!     Ok(batch.column(2).mapv(|v| if v > 0.5 { 1.0 } else { 0.0 }))
//! });
//! let pool = Array2::from_shape_fn((8, 4), |(i, _)| i as f64 / 8.0);
//! let explainer = QiiExplainer::new(model, pool, None)?;
//!
//! let x_0 = array![0.1, 0.2, 0.9, 0.3];
//! let scores = explainer.compute(&x_0, None, true, true, "shapley")?;
//! assert!(scores.get(2).unwrap() > 0.0);
//! assert_eq!(scores.get(0), Some(0.0));
//! # Ok::<(), qii_rs::QiiError>(())
//! ```

pub mod algorithms;
pub mod core;
pub mod progress;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{ComputeOptions, QiiExplainer, QuantityOfInterest};
pub use crate::core::{
    Dataset, FeatureIndex, InfluenceScores, Instance, Method, PredictError, QiiConfig, QiiError,
    Result, SampleBudget,
};
pub use crate::progress::{LogProgress, NoProgress, ProgressSink, ProgressUpdate};
pub use crate::traits::{FnPredictor, PredictResult, Predictor};
pub use crate::utils::Parallelism;
