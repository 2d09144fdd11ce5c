// src/process/skew.rs

/// Sample skewness (adjusted Fisher-Pearson G1) of the non-NaN values.
///
/// - Positive: longer right tail
/// - Negative: longer left tail
///
/// `NaN` when fewer than three values are present, `0.0` for a constant
/// column.
pub fn skewness(values: &[f64]) -> f64 {
    let xs: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = xs.len() as f64;
    if n < 3.0 {
        return f64::NAN;
    }

    let mean = xs.iter().sum::<f64>() / n;
    let m2 = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let m3 = xs.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;

    // relative tolerance keeps float noise on a constant column from
    // reading as huge skew
    if m2 <= f64::EPSILON * mean.abs().max(1.0).powi(2) * 1e2 {
        return 0.0;
    }

    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// `ln(1 + x)` element-wise. Inputs at or below -1 are the caller's problem
/// and come out as `-inf`/`NaN`.
pub fn log1p_column(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.ln_1p()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_is_zero() {
        let s = skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn test_matches_reference_value() {
        // pandas.Series([1, 2, 3, 10]).skew() == 1.7636326...
        let s = skewness(&[1.0, 2.0, 3.0, 10.0]);
        assert!((s - 1.763_632_6).abs() < 1e-6, "{}", s);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(skewness(&[1.0, 2.0]).is_nan());
        assert!(skewness(&[1.0, f64::NAN, 2.0]).is_nan());
        assert_eq!(skewness(&[7.0; 10]), 0.0);
    }

    #[test]
    fn test_log1p() {
        let out = log1p_column(&[0.0, std::f64::consts::E - 1.0]);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 1.0).abs() < 1e-12);
    }
}
