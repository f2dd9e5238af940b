pub mod banzhaf;
pub mod coalition;
pub mod game;
pub mod qii;
pub mod qoi;
pub mod shapley;

pub use coalition::{Coalition, CoalitionSampler, FeatureSpace};
pub use qii::{ComputeOptions, QiiExplainer};
pub use qoi::{sample_empirical_data, QoiFunction, QuantityOfInterest};
