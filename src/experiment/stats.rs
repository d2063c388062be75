//! Replicate statistics: sample moments, Student-t confidence intervals, and
//! the Shapiro-Wilk normality test (Royston's AS R94 approximation).

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Aggregated statistics of one sweep point's replicate values.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    /// Number of values aggregated.
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n-1 denominator); 0 for fewer than two values.
    pub std: f64,
    pub std_error: f64,
    /// Lower bound of the 95% confidence interval.
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval.
    pub ci_upper: f64,
    /// Shapiro-Wilk p-value, present when the test ran (n >= 3, non-constant
    /// sample). Low values flag non-normal replicate distributions.
    pub normality_p: Option<f64>,
}

/// Aggregates replicate values: moments, a 95% Student-t confidence interval,
/// and the normality p-value where the sample supports the test.
pub fn aggregate(values: &[f64]) -> Aggregate {
    let n = values.len();
    let mean = mean(values);
    let std = sample_std(values);
    let std_error = if n > 1 { std / (n as f64).sqrt() } else { 0.0 };
    let half_width = if n > 1 {
        t_quantile(0.975, (n - 1) as f64) * std_error
    } else {
        0.0
    };

    let constant = values.iter().all(|&v| v == values[0]);
    let normality_p = if n >= 3 && !constant {
        shapiro_wilk(values).map(|test| test.p_value)
    } else {
        None
    };

    Aggregate {
        n,
        mean,
        std,
        std_error,
        ci_lower: mean - half_width,
        ci_upper: mean + half_width,
        normality_p,
    }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with n-1 denominator; 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ssq: f64 = values.iter().map(|&v| (v - m) * (v - m)).sum();
    (ssq / (n - 1) as f64).sqrt()
}

/// The `p`-quantile of the Student-t distribution with `df` degrees of
/// freedom. Falls back to the standard-normal quantile on degenerate input.
pub fn t_quantile(p: f64, df: f64) -> f64 {
    StudentsT::new(0.0, 1.0, df)
        .map(|t| t.inverse_cdf(p))
        .unwrap_or(1.959_964)
}

/// Result of the Shapiro-Wilk test.
#[derive(Debug, Clone, Copy)]
pub struct ShapiroWilk {
    /// The W statistic, in (0, 1]; values near 1 are consistent with normality.
    pub w: f64,
    /// Right-tail p-value of the normalized statistic.
    pub p_value: f64,
}

/// Shapiro-Wilk normality test per Royston (1995), AS R94.
///
/// Supports samples of 3 to 5000 values. Returns `None` for samples outside
/// that range or with zero variance, where the statistic is undefined.
pub fn shapiro_wilk(values: &[f64]) -> Option<ShapiroWilk> {
    let n = values.len();
    if !(3..=5000).contains(&n) {
        return None;
    }

    let mut x: Vec<f64> = values.to_vec();
    x.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let range = x[n - 1] - x[0];
    if range <= 0.0 || !range.is_finite() {
        return None;
    }

    let normal = Normal::new(0.0, 1.0).ok()?;

    // Expected normal order statistics (Blom scores).
    let m: Vec<f64> = (0..n)
        .map(|i| normal.inverse_cdf((i as f64 + 1.0 - 0.375) / (n as f64 + 0.25)))
        .collect();
    let ssq_m: f64 = m.iter().map(|&v| v * v).sum();
    let rsqrt_ssq = 1.0 / ssq_m.sqrt();
    let u = 1.0 / (n as f64).sqrt();

    // Weights: Royston's polynomial corrections for the tail coefficients.
    let mut a = vec![0.0; n];
    if n > 5 {
        let a_n = -2.706056 * u.powi(5) + 4.434685 * u.powi(4) - 2.071190 * u.powi(3)
            - 0.147981 * u.powi(2)
            + 0.221157 * u
            + m[n - 1] * rsqrt_ssq;
        let a_n1 = -3.582633 * u.powi(5) + 5.682633 * u.powi(4) - 1.752461 * u.powi(3)
            - 0.293762 * u.powi(2)
            + 0.042981 * u
            + m[n - 2] * rsqrt_ssq;
        let phi = (ssq_m - 2.0 * m[n - 1] * m[n - 1] - 2.0 * m[n - 2] * m[n - 2])
            / (1.0 - 2.0 * a_n * a_n - 2.0 * a_n1 * a_n1);
        let scale = 1.0 / phi.sqrt();
        for i in 2..n - 2 {
            a[i] = m[i] * scale;
        }
        a[n - 1] = a_n;
        a[n - 2] = a_n1;
        a[0] = -a_n;
        a[1] = -a_n1;
    } else {
        let a_n = if n == 3 {
            std::f64::consts::FRAC_1_SQRT_2
        } else {
            -2.706056 * u.powi(5) + 4.434685 * u.powi(4) - 2.071190 * u.powi(3)
                - 0.147981 * u.powi(2)
                + 0.221157 * u
                + m[n - 1] * rsqrt_ssq
        };
        let phi = (ssq_m - 2.0 * m[n - 1] * m[n - 1]) / (1.0 - 2.0 * a_n * a_n);
        let scale = 1.0 / phi.sqrt();
        for i in 1..n - 1 {
            a[i] = m[i] * scale;
        }
        a[n - 1] = a_n;
        a[0] = -a_n;
    }

    let mean_x = mean(&x);
    let numerator: f64 = x.iter().zip(&a).map(|(&xi, &ai)| ai * xi).sum::<f64>().powi(2);
    let denominator: f64 = x.iter().map(|&xi| (xi - mean_x) * (xi - mean_x)).sum();
    let w = (numerator / denominator).clamp(0.0, 1.0);

    // Normalize W and read the p-value off the standard normal tail.
    let p_value = if n == 3 {
        let p = std::f64::consts::FRAC_2_PI * 3.0
            * (w.sqrt().asin() - (0.75f64).sqrt().asin());
        p.clamp(0.0, 1.0)
    } else {
        let nf = n as f64;
        let z = if n <= 11 {
            let gamma = -2.273 + 0.459 * nf;
            let mu = 0.5440 - 0.39978 * nf + 0.025054 * nf * nf - 0.0006714 * nf * nf * nf;
            let sigma = (1.3822 - 0.77857 * nf + 0.062767 * nf * nf - 0.0020322 * nf * nf * nf).exp();
            (-((gamma - (1.0 - w).ln()).ln()) - mu) / sigma
        } else {
            let ln_n = nf.ln();
            let mu = 0.0038915 * ln_n.powi(3) - 0.083751 * ln_n * ln_n - 0.31082 * ln_n - 1.5861;
            let sigma = (0.0030302 * ln_n * ln_n - 0.082676 * ln_n - 0.4803).exp();
            ((1.0 - w).ln() - mu) / sigma
        };
        (1.0 - normal.cdf(z)).clamp(0.0, 1.0)
    };

    Some(ShapiroWilk { w, p_value })
}
