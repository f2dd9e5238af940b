//! Parallelism configuration and the coalition worker pool.
//!
//! [`Parallelism`] is a hint; [`Executor`] turns it into a rayon pool that
//! maps a batch of work items to results in input order.

use rayon::prelude::*;

use crate::core::{QiiError, Result};

/// How many threads evaluate coalitions.
///
/// Only the worker count changes; random draws stay on the calling thread,
/// so a seeded explainer returns the same scores under either variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Parallelism {
    #[default]
    Sequential,
    /// A private pool of `n` workers. One worker runs inline.
    Parallel(usize),
}

impl Parallelism {
    /// `0` sizes the pool like rayon's global pool, `1` is inline.
    pub fn from_threads(n_threads: usize) -> Self {
        match n_threads {
            0 => Self::Parallel(rayon::current_num_threads()),
            1 => Self::Sequential,
            n => Self::Parallel(n),
        }
    }

    /// Whether a worker pool is worth building.
    pub fn allows_parallel(self) -> bool {
        matches!(self, Self::Parallel(n) if n > 1)
    }

    pub fn n_threads(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel(n) => n.max(1),
        }
    }
}

/// Runs batches of independent work items, sequentially or on a private rayon pool.
///
/// Built once per explainer; the pool lives as long as the executor.
pub struct Executor {
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("n_threads", &self.n_threads())
            .finish()
    }
}

impl Executor {
    pub fn new(parallelism: Parallelism) -> Result<Self> {
        if !parallelism.allows_parallel() {
            return Ok(Executor { pool: None });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.n_threads())
            .build()
            .map_err(|e| QiiError::Internal(format!("failed to build worker pool: {}", e)))?;
        Ok(Executor { pool: Some(pool) })
    }

    pub fn n_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, |pool| pool.current_num_threads())
    }

    /// Maps `f` over `items`, keeping input order. The first error aborts the batch.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_counts_map_to_variants() {
        assert_eq!(Parallelism::from_threads(1), Parallelism::Sequential);
        assert_eq!(Parallelism::from_threads(6), Parallelism::Parallel(6));
        match Parallelism::from_threads(0) {
            Parallelism::Parallel(n) => assert_eq!(n, rayon::current_num_threads()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn single_worker_runs_inline() {
        for parallelism in [Parallelism::Sequential, Parallelism::Parallel(1), Parallelism::Parallel(0)] {
            assert!(!parallelism.allows_parallel());
            assert_eq!(parallelism.n_threads(), 1);
            assert_eq!(Executor::new(parallelism).unwrap().n_threads(), 1);
        }
        let executor = Executor::new(Parallelism::Parallel(2)).unwrap();
        assert_eq!(executor.n_threads(), 2);
        assert_eq!(format!("{:?}", executor), "Executor { n_threads: 2 }");
    }

    #[test]
    fn executor_preserves_order() {
        let items: Vec<usize> = (0..100).collect();
        for parallelism in [Parallelism::Sequential, Parallelism::Parallel(4)] {
            let executor = Executor::new(parallelism).unwrap();
            let out = executor.map(&items, |&i| Ok(i * 2)).unwrap();
            assert_eq!(out, items.iter().map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn executor_propagates_errors() {
        let items: Vec<usize> = (0..10).collect();
        let executor = Executor::new(Parallelism::Parallel(2)).unwrap();
        let out = executor.map(&items, |&i| {
            if i == 7 {
                Err(QiiError::Internal("seven".to_string()))
            } else {
                Ok(i)
            }
        });
        assert!(matches!(out, Err(QiiError::Internal(_))));
    }
}
