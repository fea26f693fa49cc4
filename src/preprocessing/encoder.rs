//! Кодирование признаков: стандартизация, бинарные признаки, one-hot

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};

use crate::error::{ModelError, Result};
use crate::preprocessing::{DataNormalizer, FeatureEngineer};
use crate::types::{JobFeatures, RawRecord, BINARY_FEATURES, NUMERIC_FEATURES};

/// Словарь категорий. Первый уровень (лексикографически) - опорный,
/// для него индикатор не создается.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalVocabulary {
    levels: Vec<String>,
}

impl CategoricalVocabulary {
    pub fn fit<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let levels: BTreeSet<&str> = values.into_iter().collect();
        if levels.is_empty() {
            return Err(ModelError::InvalidInput("No categorical values".to_string()));
        }

        Ok(Self {
            levels: levels.into_iter().map(str::to_string).collect(),
        })
    }

    /// Восстановление словаря в сохраненном порядке (первый - опорный)
    pub fn from_levels(levels: Vec<String>) -> Result<Self> {
        if levels.is_empty() {
            return Err(ModelError::InvalidInput("Empty vocabulary".to_string()));
        }
        let unique: BTreeSet<&String> = levels.iter().collect();
        if unique.len() != levels.len() {
            return Err(ModelError::InvalidInput(
                "Vocabulary contains duplicate levels".to_string(),
            ));
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn reference(&self) -> &str {
        &self.levels[0]
    }

    /// Уровни, для которых есть индикаторные столбцы
    pub fn indicator_levels(&self) -> &[String] {
        &self.levels[1..]
    }

    /// Индекс индикатора; None для опорного и неизвестных уровней
    pub fn indicator_index(&self, level: &str) -> Option<usize> {
        self.indicator_levels().iter().position(|l| l == level)
    }
}

/// Кодировщик строки в вектор признаков.
/// Порядок: числовые (стандартизованные), бинарные, индикаторы категорий.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureEncoder {
    normalizer: DataNormalizer,
    vocabulary: Option<CategoricalVocabulary>,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fitted(records: &[RawRecord]) -> Result<Self> {
        let mut encoder = Self::new();
        encoder.fit(records)?;
        Ok(encoder)
    }

    pub fn from_parts(
        normalizer: DataNormalizer,
        vocabulary: CategoricalVocabulary,
    ) -> Result<Self> {
        if !normalizer.is_fitted() {
            return Err(ModelError::NotFitted("DataNormalizer"));
        }
        match normalizer.mean() {
            Some(mean) if mean.len() == NUMERIC_FEATURES.len() => {}
            Some(mean) => {
                return Err(ModelError::DimensionMismatch {
                    expected: NUMERIC_FEATURES.len(),
                    actual: mean.len(),
                })
            }
            None => return Err(ModelError::NotFitted("DataNormalizer")),
        }

        Ok(Self {
            normalizer,
            vocabulary: Some(vocabulary),
        })
    }

    pub fn fit(&mut self, records: &[RawRecord]) -> Result<()> {
        if records.is_empty() {
            return Err(ModelError::InvalidInput("No records provided".to_string()));
        }

        // Сначала считаем все параметры, состояние меняем только при успехе
        let numeric =
            FeatureEngineer::extract_numeric_features(records.iter().map(|r| &r.features));
        let mut normalizer = DataNormalizer::new();
        normalizer.fit(&numeric)?;

        let vocabulary =
            CategoricalVocabulary::fit(records.iter().map(|r| r.features.clutter.as_str()))?;

        tracing::debug!(
            "Encoder fitted on {} records, clutter levels: {:?}",
            records.len(),
            vocabulary.levels()
        );

        self.normalizer = normalizer;
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.normalizer.is_fitted() && self.vocabulary.is_some()
    }

    pub fn n_features(&self) -> Result<usize> {
        let vocabulary = self.vocabulary()?;
        Ok(NUMERIC_FEATURES.len() + BINARY_FEATURES.len() + vocabulary.indicator_levels().len())
    }

    pub fn feature_names(&self) -> Result<Vec<String>> {
        let vocabulary = self.vocabulary()?;
        Ok(NUMERIC_FEATURES
            .iter()
            .chain(BINARY_FEATURES.iter())
            .map(|s| s.to_string())
            .chain(vocabulary.indicator_levels().iter().cloned())
            .collect())
    }

    pub fn transform(&self, job: &JobFeatures) -> Result<Array1<f64>> {
        let vocabulary = self.vocabulary()?;
        let n_features = self.n_features()?;

        let numeric = Array1::from(job.numeric_values().to_vec());
        let scaled = self.normalizer.transform_row(numeric.view())?;

        let mut features = Array1::zeros(n_features);
        let mut feature_idx = 0;

        for value in scaled.iter() {
            features[feature_idx] = *value;
            feature_idx += 1;
        }

        for value in job.binary_values() {
            features[feature_idx] = value;
            feature_idx += 1;
        }

        // Неизвестная категория кодируется как опорная (все нули)
        if let Some(idx) = vocabulary.indicator_index(&job.clutter) {
            features[feature_idx + idx] = 1.0;
        }

        Ok(features)
    }

    pub fn transform_batch<'a, I>(&self, jobs: I) -> Result<Array2<f64>>
    where
        I: ExactSizeIterator<Item = &'a JobFeatures>,
    {
        let n_samples = jobs.len();
        let mut features = Array2::zeros((n_samples, self.n_features()?));

        for (i, job) in jobs.enumerate() {
            features.row_mut(i).assign(&self.transform(job)?);
        }

        Ok(features)
    }

    pub fn transform_records(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        self.transform_batch(records.iter().map(|r| &r.features))
    }

    pub fn normalizer(&self) -> &DataNormalizer {
        &self.normalizer
    }

    pub fn vocabulary(&self) -> Result<&CategoricalVocabulary> {
        self.vocabulary
            .as_ref()
            .ok_or(ModelError::NotFitted("FeatureEncoder"))
    }
}
