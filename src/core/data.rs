// src/core/data.rs
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::QiiError;

/// Represents a single data instance (a row of features).
pub type Instance = Array1<f64>;

/// Represents a dataset (multiple instances, e.g., the data pool).
pub type Dataset = Array2<f64>;

/// Column position of a feature in an [`Instance`].
pub type FeatureIndex = usize;

/// Power index used to aggregate marginal contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Permutation-weighted average marginal contribution.
    Shapley,
    /// Unweighted average marginal contribution over all coalitions.
    Banzhaf,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Shapley => "shapley",
            Method::Banzhaf => "banzhaf",
        }
    }
}

impl FromStr for Method {
    type Err = QiiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shapley" => Ok(Method::Shapley),
            "banzhaf" => Ok(Method::Banzhaf),
            _ => Err(QiiError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Influence of each evaluated feature on one focal instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceScores {
    /// Score per evaluated feature.
    pub scores: BTreeMap<FeatureIndex, f64>,
    pub method: Method,
    /// `true` when every coalition was enumerated.
    pub exact: bool,
    /// Coalitions evaluated (exact) or samples folded (sampled).
    pub samples: usize,
    /// Max gap between running and windowed means; `None` in exact mode.
    pub convergence: Option<f64>,
    /// `true` when sampling stopped on convergence before the budget ran out.
    pub stopped_early: bool,
    /// QoI with only the non-evaluated features present. Exact mode only.
    pub baseline: Option<f64>,
    /// QoI on the unmodified instance. Exact mode only.
    pub full: Option<f64>,
}

impl InfluenceScores {
    pub fn get(&self, feature: FeatureIndex) -> Option<f64> {
        self.scores.get(&feature).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureIndex, f64)> + '_ {
        self.scores.iter().map(|(&k, &v)| (k, v))
    }

    pub fn features(&self) -> Vec<FeatureIndex> {
        self.scores.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of all scores.
    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    /// Features ordered by descending absolute score.
    pub fn ranked(&self) -> Vec<(FeatureIndex, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
        ranked
    }
}

impl fmt::Display for InfluenceScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.exact { "exact" } else { "sampled" };
        let stop = if self.stopped_early { ", converged early" } else { "" };
        writeln!(
            f,
            "Influence ({}, {}, {} samples{}):",
            self.method, mode, self.samples, stop
        )?;
        if let (Some(baseline), Some(full)) = (self.baseline, self.full) {
            writeln!(f, "  QoI(empty): {:.4}", baseline)?;
            writeln!(f, "  QoI(full):  {:.4}", full)?;
        }
        if let Some(delta) = self.convergence {
            writeln!(f, "  Convergence: {:.6}", delta)?;
        }
        for (feature, score) in self.iter() {
            writeln!(f, "    Feature {}: {:.4}", feature, score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[(FeatureIndex, f64)]) -> InfluenceScores {
        InfluenceScores {
            scores: values.iter().copied().collect(),
            method: Method::Shapley,
            exact: true,
            samples: 16,
            convergence: None,
            stopped_early: false,
            baseline: Some(0.0),
            full: Some(1.0),
        }
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("shapley".parse::<Method>().unwrap(), Method::Shapley);
        assert_eq!(" Banzhaf ".parse::<Method>().unwrap(), Method::Banzhaf);
        match "owen".parse::<Method>() {
            Err(QiiError::InvalidMethod(name)) => assert_eq!(name, "owen"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ranked_orders_by_magnitude() {
        let s = scores(&[(0, 0.1), (1, -0.7), (2, 0.4)]);
        let order: Vec<_> = s.ranked().into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!((s.total() - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn display_lists_features() {
        let s = scores(&[(3, 0.5)]);
        let text = s.to_string();
        assert!(text.contains("shapley, exact"));
        assert!(text.contains("Feature 3: 0.5000"));
        assert!(!text.contains("converged early"));
    }

    #[test]
    fn display_marks_early_stop() {
        let s = InfluenceScores {
            exact: false,
            samples: 100,
            convergence: Some(0.0),
            stopped_early: true,
            baseline: None,
            full: None,
            ..scores(&[(0, 0.25)])
        };
        let text = s.to_string();
        assert!(text.contains("Influence (shapley, sampled, 100 samples, converged early):"));
    }
}
