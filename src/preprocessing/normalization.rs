//! Нормализация данных

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{ModelError, Result};

/// Порог, ниже которого признак считается константным
const MIN_STD: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct DataNormalizer {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl DataNormalizer {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    /// Восстановление из сохраненных параметров
    pub fn from_params(mean: Array1<f64>, std: Array1<f64>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(ModelError::DimensionMismatch {
                expected: mean.len(),
                actual: std.len(),
            });
        }
        if mean.iter().any(|m| !m.is_finite()) || std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelError::InvalidInput(
                "means must be finite and stds positive".to_string(),
            ));
        }

        Ok(Self {
            mean: Some(mean),
            std: Some(std),
            is_fitted: true,
        })
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(ModelError::InvalidInput("Empty dataset".to_string()));
        }
        if X.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput(
                "numeric features contain non-finite values".to_string(),
            ));
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::InvalidInput("Failed to compute mean".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < MIN_STD {
                *val = 1.0;
            }
        }

        self.mean = Some(mean);
        self.std = Some(std);
        self.is_fitted = true;
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = self.params()?;
        if X.ncols() != mean.len() {
            return Err(ModelError::DimensionMismatch {
                expected: mean.len(),
                actual: X.ncols(),
            });
        }

        // Нормализация: (X - mean) / std
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    /// Нормализация одной строки
    pub fn transform_row(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        let (mean, std) = self.params()?;
        if x.len() != mean.len() {
            return Err(ModelError::DimensionMismatch {
                expected: mean.len(),
                actual: x.len(),
            });
        }

        Ok(x.iter()
            .zip(mean.iter().zip(std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted("DataNormalizer"));
        }
        match (self.mean.as_ref(), self.std.as_ref()) {
            (Some(mean), Some(std)) => Ok((mean, std)),
            _ => Err(ModelError::NotFitted("DataNormalizer")),
        }
    }
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_standardizes_columns() {
        let X = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut normalizer = DataNormalizer::new();
        let Z = normalizer.fit_transform(&X).unwrap();

        for col in Z.columns() {
            let mean = col.sum() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var.sqrt() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_uses_unit_std() {
        let X = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let mut normalizer = DataNormalizer::new();
        normalizer.fit(&X).unwrap();

        assert_eq!(normalizer.std().unwrap()[0], 1.0);
        let Z = normalizer.transform(&X).unwrap();
        assert!(Z.column(0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let normalizer = DataNormalizer::new();
        let err = normalizer.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
    }

    #[test]
    fn test_rejects_non_finite_and_empty() {
        let mut normalizer = DataNormalizer::new();
        assert!(normalizer.fit(&array![[1.0], [f64::NAN]]).is_err());
        assert!(normalizer.fit(&Array2::zeros((0, 2))).is_err());
        assert!(!normalizer.is_fitted());
    }

    #[test]
    fn test_from_params_rejects_zero_std() {
        assert!(DataNormalizer::from_params(array![0.0], array![0.0]).is_err());
        assert!(DataNormalizer::from_params(array![0.0, 1.0], array![1.0]).is_err());
        assert!(DataNormalizer::from_params(array![0.0], array![2.0]).is_ok());
    }
}
