pub mod combinatorics;
pub mod parallelism;

pub use combinatorics::{estimate_sample_count, n_choose_k, shapley_weight};
pub use parallelism::{Executor, Parallelism};
