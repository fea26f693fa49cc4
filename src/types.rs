/// Типы данных для ML модуля

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ModelError, Result};

/// Числовые признаки (стандартизуются)
pub const NUMERIC_FEATURES: [&str; 3] = ["sqft", "bedrooms", "bathrooms"];
/// Бинарные признаки (0/1 без изменений)
pub const BINARY_FEATURES: [&str; 3] = ["deep_clean", "fridge", "oven"];
/// Категориальный признак
pub const CATEGORICAL_FEATURE: &str = "clutter";
/// Стандартные уровни захламленности
pub const CLUTTER_LEVELS: [&str; 3] = ["low", "medium", "high"];

/// Нормализация категории: trim + lowercase
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn deserialize_category<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_category(&raw))
}

/// Параметры работы (без целевой переменной)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFeatures {
    pub sqft: f64,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub deep_clean: bool,
    pub fridge: bool,
    pub oven: bool,
    #[serde(deserialize_with = "deserialize_category")]
    pub clutter: String, // "low" | "medium" | "high"
}

impl JobFeatures {
    pub fn new(
        sqft: f64,
        bedrooms: i32,
        bathrooms: f64,
        deep_clean: bool,
        fridge: bool,
        oven: bool,
        clutter: &str,
    ) -> Self {
        Self {
            sqft,
            bedrooms,
            bathrooms,
            deep_clean,
            fridge,
            oven,
            clutter: normalize_category(clutter),
        }
    }

    /// Числовые значения в порядке NUMERIC_FEATURES
    pub fn numeric_values(&self) -> [f64; 3] {
        [self.sqft, self.bedrooms as f64, self.bathrooms]
    }

    /// Бинарные значения в порядке BINARY_FEATURES
    pub fn binary_values(&self) -> [f64; 3] {
        [
            if self.deep_clean { 1.0 } else { 0.0 },
            if self.fridge { 1.0 } else { 0.0 },
            if self.oven { 1.0 } else { 0.0 },
        ]
    }
}

/// Обучающий пример
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(flatten)]
    pub features: JobFeatures,
    pub labor_hours: f64,
}

impl RawRecord {
    pub fn new(features: JobFeatures, labor_hours: f64) -> Result<Self> {
        let record = Self { features, labor_hours };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        if !f.sqft.is_finite() || f.sqft <= 0.0 {
            return Err(ModelError::InvalidInput(format!(
                "sqft must be positive and finite, got {}",
                f.sqft
            )));
        }
        if !f.bathrooms.is_finite() {
            return Err(ModelError::InvalidInput(format!(
                "bathrooms must be finite, got {}",
                f.bathrooms
            )));
        }
        if !self.labor_hours.is_finite() || self.labor_hours < 0.0 {
            return Err(ModelError::InvalidInput(format!(
                "labor_hours must be non-negative and finite, got {}",
                self.labor_hours
            )));
        }
        Ok(())
    }
}

/// Оценка на одном фолде
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub mean_absolute_error: f64,
    pub r_squared: f64,
    pub n_test: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub mean_absolute_error: f64,
    pub r_squared: f64,
    pub n_samples: usize,
    pub n_folds: usize,
    #[serde(default)]
    pub folds: Vec<FoldScore>,
}

/// Метрики финальной модели на обучающей выборке
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub r_squared: f64,
    pub mean_absolute_error: f64,
    pub rmse: f64,
}

/// Bootstrap интервал предсказания
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub lower: f64,
    pub upper: f64,
    pub median: f64,
    pub resamples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobFeatures {
        JobFeatures::new(1800.0, 3, 2.0, false, true, false, "  Medium ")
    }

    #[test]
    fn test_clutter_normalized_on_construction() {
        assert_eq!(job().clutter, "medium");
    }

    #[test]
    fn test_clutter_normalized_on_deserialize() {
        let json = r#"{"sqft":900,"bedrooms":1,"bathrooms":1,"deep_clean":true,
            "fridge":false,"oven":false,"clutter":" HIGH","labor_hours":3.5}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.features.clutter, "high");
        assert_eq!(record.labor_hours, 3.5);
        assert!(record.features.deep_clean);
    }

    #[test]
    fn test_feature_values_order() {
        let j = job();
        assert_eq!(j.numeric_values(), [1800.0, 3.0, 2.0]);
        assert_eq!(j.binary_values(), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_record_validation() {
        assert!(RawRecord::new(job(), 4.0).is_ok());
        assert!(RawRecord::new(job(), -1.0).is_err());
        assert!(RawRecord::new(job(), f64::NAN).is_err());

        let mut bad = job();
        bad.sqft = 0.0;
        assert!(matches!(RawRecord::new(bad, 2.0), Err(ModelError::InvalidInput(_))));
    }
}
