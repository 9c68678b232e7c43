//! Normal-distribution helpers shared by the head-to-head projection.

use statrs::function::erf::erf;

/// Two-tailed critical value of the standard normal at 95% confidence.
pub const Z_95: f64 = 1.959_963_984_540_05;

/// Standard normal cumulative distribution function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Arithmetic mean; 0 for an empty sample.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation; 0 for fewer than two samples.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.max(0.0).sqrt()
}

/// Half-width of the 95% confidence interval around a sample mean.
pub fn margin_of_error(std_dev: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    Z_95 * std_dev / (n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normal_cdf_matches_reference_values() {
        let cases = [
            (0.5, 0.691_462_461_274_013_1),
            (1.0, 0.841_344_746_068_542_9),
            (2.5, 0.993_790_334_674_223_8),
            (-1.0, 0.158_655_253_931_457_07),
        ];
        for (z, expected) in cases {
            assert_relative_eq!(normal_cdf(z), expected, epsilon = 1e-12);
        }
        assert_relative_eq!(normal_cdf(Z_95), 0.975, epsilon = 1e-12);
    }

    #[test]
    fn normal_cdf_is_symmetric() {
        assert_relative_eq!(normal_cdf(0.0), 0.5);
        for z in [0.3, 1.0, 1.96, 2.5] {
            assert_relative_eq!(normal_cdf(z) + normal_cdf(-z), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(normal_cdf(40.0), 1.0);
        assert_relative_eq!(normal_cdf(-40.0), 0.0);
    }

    #[test]
    fn mean_and_std_dev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[0.7]), 0.0);
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&xs), 5.0);
        assert_relative_eq!(std_dev(&xs), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn margin_of_error_shrinks_with_sample_size() {
        assert_eq!(margin_of_error(0.4, 0), 0.0);
        assert_relative_eq!(margin_of_error(0.4, 1), Z_95 * 0.4, epsilon = 1e-12);
        assert_relative_eq!(margin_of_error(0.4, 4), Z_95 * 0.2, epsilon = 1e-12);
    }
}
