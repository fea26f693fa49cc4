//! Метрики качества регрессии

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// R² = 1 - RSS / TSS. При константных фактических значениях:
/// 1.0 если предсказание точное, иначе 0.0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let rss: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let tss: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if tss == 0.0 {
        return if rss == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - rss / tss
}

/// RMSE с поправкой на число параметров: sqrt(RSS / max(1, n - n_params))
pub fn residual_std(actual: &[f64], predicted: &[f64], n_params: usize) -> f64 {
    let rss: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let dof = actual.len().saturating_sub(n_params).max(1);
    (rss / dof as f64).sqrt()
}

/// Медиана (для пустого среза - NaN)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Эмпирический квантиль с линейной интерполяцией; `sorted` упорядочен.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]), 1.0);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }

    #[test]
    fn test_r2() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(r2_score(&actual, &actual), 1.0);
        assert_eq!(r2_score(&actual, &[2.5; 4]), 0.0);
        assert_eq!(r2_score(&[3.0, 3.0], &[3.0, 3.0]), 1.0);
        assert_eq!(r2_score(&[3.0], &[2.0]), 0.0);
    }

    #[test]
    fn test_residual_std() {
        let rmse = residual_std(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 6.0], 2);
        assert!((rmse - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(residual_std(&[1.0], &[3.0], 5), 2.0);
    }

    #[test]
    fn test_median_and_quantile() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(median(&[]).is_nan());

        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&sorted, 0.0), 0.0);
        assert_eq!(quantile(&sorted, 1.0), 40.0);
        assert_eq!(quantile(&sorted, 0.5), 20.0);
        assert!((quantile(&sorted, 0.1) - 4.0).abs() < 1e-12);
    }
}
