//! Feature engineering для ML моделей

use ndarray::{Array1, Array2};

use crate::error::{ModelError, Result};
use crate::types::{JobFeatures, RawRecord, NUMERIC_FEATURES};

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Матрица сырых числовых признаков (до стандартизации)
    pub fn extract_numeric_features<'a, I>(jobs: I) -> Array2<f64>
    where
        I: ExactSizeIterator<Item = &'a JobFeatures>,
    {
        let n_samples = jobs.len();
        let mut features = Array2::zeros((n_samples, NUMERIC_FEATURES.len()));

        for (i, job) in jobs.enumerate() {
            for (j, value) in job.numeric_values().into_iter().enumerate() {
                features[[i, j]] = value;
            }
        }

        features
    }

    /// Целевая переменная
    pub fn extract_targets(records: &[RawRecord]) -> Result<Array1<f64>> {
        if records.is_empty() {
            return Err(ModelError::InvalidInput("No records provided".to_string()));
        }

        let targets: Array1<f64> = records.iter().map(|r| r.labor_hours).collect();
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(ModelError::InvalidInput(
                "labor_hours contains non-finite values".to_string(),
            ));
        }

        Ok(targets)
    }
}
