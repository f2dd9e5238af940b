// src/utils/combinatorics.rs

/// Binomial coefficient C(n, k) = n! / (k! * (n-k)!) as `f64`.
pub fn n_choose_k(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 || k == n {
        return 1.0;
    }
    // Exploit symmetry C(n, k) = C(n, n-k) to keep k small
    let eff_k = if k > n / 2 { n - k } else { k };

    let mut res = 1.0;
    for i in 0..eff_k {
        res *= (n - i) as f64;
        res /= (i + 1) as f64;
    }
    res
}

/// Shapley weight of a coalition of size `s` out of `m` players, i.e.
/// `s! (m-s-1)! / m!`, computed as `1 / (m * C(m-1, s))`.
pub fn shapley_weight(s: usize, m: usize) -> f64 {
    debug_assert!(s < m);
    1.0 / (m as f64 * n_choose_k(m - 1, s))
}

/// Hoeffding estimate of the samples needed for a mean of values in a
/// range of width `value_range` to land within `tolerance` of its
/// expectation with probability `confidence`.
pub fn estimate_sample_count(tolerance: f64, confidence: f64, value_range: f64) -> usize {
    let delta = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let n = value_range * value_range * (2.0 / delta).ln() / (2.0 * tolerance * tolerance);
    (n.ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn binomials() {
        assert_eq!(n_choose_k(4, 0), 1.0);
        assert_eq!(n_choose_k(4, 2), 6.0);
        assert_eq!(n_choose_k(10, 7), 120.0);
        assert_eq!(n_choose_k(3, 5), 0.0);
    }

    #[test]
    fn shapley_weights_sum_to_one_per_feature() {
        // Σ_s C(m-1, s) * w(s) = 1 for every feature.
        for m in 1..8 {
            let total: f64 = (0..m)
                .map(|s| n_choose_k(m - 1, s) * shapley_weight(s, m))
                .sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn shapley_weight_matches_factorials() {
        // m = 4, s = 1: 1! * 2! / 4! = 2 / 24
        assert_abs_diff_eq!(shapley_weight(1, 4), 2.0 / 24.0, epsilon = 1e-12);
    }

    #[test]
    fn sample_estimate_grows_with_precision() {
        let loose = estimate_sample_count(0.1, 0.95, 2.0);
        let tight = estimate_sample_count(0.05, 0.95, 2.0);
        assert!(tight > loose);
        // 4 * ln(40) / (2 * 0.0025) = 2951.1
        assert_eq!(tight, 2952);
    }
}
