/// Arithmetic mean of the non-NaN values. `None` when every value is NaN
/// or the slice is empty.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sum of the non-NaN values.
pub fn nan_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// `part` as a percentage of `total`, or 0.0 when `total` is zero.
pub fn pct(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean_skips_nan() {
        assert_eq!(nan_mean(&[10.0, f64::NAN, 20.0]), Some(15.0));
    }

    #[test]
    fn test_nan_mean_all_nan() {
        assert_eq!(nan_mean(&[f64::NAN, f64::NAN]), None);
        assert_eq!(nan_mean(&[]), None);
    }

    #[test]
    fn test_nan_sum() {
        assert_eq!(nan_sum([1.0, f64::NAN, 2.5]), 3.5);
        assert_eq!(nan_sum(Vec::new()), 0.0);
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10.0, 0.0), 0.0);
        assert_eq!(pct(25.0, 100.0), 25.0);
    }
}
