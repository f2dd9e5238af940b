// src/core/errors.rs
use thiserror::Error;

use crate::core::FeatureIndex;

/// Failure raised by a [`Predictor`](crate::traits::Predictor).
///
/// The engine treats predictors as opaque, so this only carries a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PredictError {
    message: String,
}

impl PredictError {
    pub fn new(message: impl Into<String>) -> Self {
        PredictError {
            message: message.into(),
        }
    }

    /// The predictor does not implement the requested capability.
    pub fn unsupported(capability: &str) -> Self {
        PredictError::new(format!("predictor does not support `{}`", capability))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum QiiError {
    #[error("Unknown quantity of interest: `{0}`")]
    UnknownName(String),

    #[error("Quantity of interest `{0}` is already registered")]
    DuplicateName(String),

    #[error("Invalid method `{0}`: expected `shapley` or `banzhaf`")]
    InvalidMethod(String),

    #[error("Evaluated feature list is empty")]
    EmptyFeatureSet,

    #[error("Predictor failed{}: {source}", coalition_suffix(.coalition))]
    Predictor {
        /// Features held at the focal instance when the failure happened.
        coalition: Option<Vec<FeatureIndex>>,
        #[source]
        source: PredictError,
    },

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),

    #[error("Internal Error: {0}")]
    Internal(String),
}

fn coalition_suffix(coalition: &Option<Vec<FeatureIndex>>) -> String {
    match coalition {
        Some(features) => format!(" on coalition {:?}", features),
        None => String::new(),
    }
}

impl QiiError {
    /// Attaches coalition context to a predictor failure. Other variants pass through.
    pub fn with_coalition(self, features: &[FeatureIndex]) -> Self {
        match self {
            QiiError::Predictor {
                coalition: None,
                source,
            } => QiiError::Predictor {
                coalition: Some(features.to_vec()),
                source,
            },
            other => other,
        }
    }
}

impl From<PredictError> for QiiError {
    fn from(source: PredictError) -> Self {
        QiiError::Predictor {
            coalition: None,
            source,
        }
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, QiiError>;
