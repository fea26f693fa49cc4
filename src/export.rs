//! Экспорт модели в JSON для фронтенда и обратный импорт

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::models::RidgeModel;
use crate::pipeline::FittedPipeline;
use crate::preprocessing::{CategoricalVocabulary, DataNormalizer, FeatureEncoder};
use crate::types::{
    CrossValidationResult, JobFeatures, BINARY_FEATURES, CATEGORICAL_FEATURE, NUMERIC_FEATURES,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFeatures {
    pub names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    pub categories: Vec<String>,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetrics {
    pub cv_mae: f64,
    pub cv_r2: f64,
    pub n_samples: usize,
}

/// Документ обмена. Потребитель: стандартизует числовые признаки,
/// передает бинарные, кодирует категории (неизвестные -> нули),
/// собирает вектор в порядке feature_order, dot(vector, coefficients) + intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedModel {
    pub intercept: f64,
    pub alpha: f64,
    pub numeric_features: NumericFeatures,
    pub binary_features: Vec<String>,
    pub categorical_features: BTreeMap<String, CategoricalFeature>,
    pub coefficients: Vec<f64>,
    pub feature_order: Vec<String>,
    pub metrics: ExportMetrics,
}

impl ExportedModel {
    pub fn predict(&self, job: &JobFeatures) -> Result<f64> {
        ModelExporter::import_pipeline(self)?.predict(job)
    }
}

pub struct ModelExporter;

impl ModelExporter {
    pub fn export(
        encoder: &FeatureEncoder,
        model: &RidgeModel,
        cv_result: &CrossValidationResult,
    ) -> Result<ExportedModel> {
        let normalizer = encoder.normalizer();
        let (means, stds) = match (normalizer.mean(), normalizer.std()) {
            (Some(mean), Some(std)) => (mean.to_vec(), std.to_vec()),
            _ => return Err(ModelError::NotFitted("FeatureEncoder")),
        };
        let vocabulary = encoder.vocabulary()?;
        let feature_order = encoder.feature_names()?;

        if feature_order.len() != model.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: feature_order.len(),
                actual: model.n_features(),
            });
        }

        let mut categorical_features = BTreeMap::new();
        categorical_features.insert(
            CATEGORICAL_FEATURE.to_string(),
            CategoricalFeature {
                categories: vocabulary.levels().to_vec(),
                reference: vocabulary.reference().to_string(),
            },
        );

        Ok(ExportedModel {
            intercept: model.intercept(),
            alpha: model.alpha(),
            numeric_features: NumericFeatures {
                names: NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect(),
                means,
                stds,
            },
            binary_features: BINARY_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical_features,
            coefficients: model.coefficients().to_vec(),
            feature_order,
            metrics: ExportMetrics {
                cv_mae: cv_result.mean_absolute_error,
                cv_r2: cv_result.r_squared,
                n_samples: cv_result.n_samples,
            },
        })
    }

    /// Восстановление кодировщика и модели. Любое нарушение схемы -
    /// ошибка сериализации, частично собранная модель не возвращается.
    pub fn import(blob: &ExportedModel) -> Result<(FeatureEncoder, RidgeModel)> {
        let numeric = &blob.numeric_features;
        if numeric.names != NUMERIC_FEATURES {
            return Err(schema_error(format!(
                "numeric feature names {:?} do not match {:?}",
                numeric.names, NUMERIC_FEATURES
            )));
        }
        if numeric.means.len() != NUMERIC_FEATURES.len()
            || numeric.stds.len() != NUMERIC_FEATURES.len()
        {
            return Err(schema_error(format!(
                "expected {} numeric means and stds, got {} and {}",
                NUMERIC_FEATURES.len(),
                numeric.means.len(),
                numeric.stds.len()
            )));
        }
        if blob.binary_features != BINARY_FEATURES {
            return Err(schema_error(format!(
                "binary feature names {:?} do not match {:?}",
                blob.binary_features, BINARY_FEATURES
            )));
        }

        if blob.categorical_features.len() != 1 {
            return Err(schema_error(format!(
                "expected exactly one categorical feature, got {}",
                blob.categorical_features.len()
            )));
        }
        let categorical = blob
            .categorical_features
            .get(CATEGORICAL_FEATURE)
            .ok_or_else(|| {
                schema_error(format!(
                    "missing categorical feature '{}'",
                    CATEGORICAL_FEATURE
                ))
            })?;
        if categorical.categories.first() != Some(&categorical.reference) {
            return Err(schema_error(format!(
                "reference '{}' must be the first category",
                categorical.reference
            )));
        }

        let normalizer = DataNormalizer::from_params(
            Array1::from(numeric.means.clone()),
            Array1::from(numeric.stds.clone()),
        )
        .map_err(into_schema_error)?;
        let vocabulary = CategoricalVocabulary::from_levels(categorical.categories.clone())
            .map_err(into_schema_error)?;
        let encoder =
            FeatureEncoder::from_parts(normalizer, vocabulary).map_err(into_schema_error)?;

        let expected_order = encoder.feature_names()?;
        if blob.feature_order != expected_order {
            return Err(schema_error(format!(
                "feature_order {:?} does not match {:?}",
                blob.feature_order, expected_order
            )));
        }
        if blob.coefficients.len() != blob.feature_order.len() {
            return Err(schema_error(format!(
                "{} coefficients for {} features",
                blob.coefficients.len(),
                blob.feature_order.len()
            )));
        }

        let coefficients = Array1::from(blob.coefficients.clone());
        let model = RidgeModel::new(coefficients, blob.intercept, blob.alpha)
            .map_err(into_schema_error)?;

        Ok((encoder, model))
    }

    pub fn import_pipeline(blob: &ExportedModel) -> Result<FittedPipeline> {
        let (encoder, model) = Self::import(blob)?;
        FittedPipeline::new(encoder, model).map_err(into_schema_error)
    }

    pub fn to_json(blob: &ExportedModel) -> Result<String> {
        Ok(serde_json::to_string_pretty(blob)?)
    }

    pub fn from_json(json: &str) -> Result<ExportedModel> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(blob: &ExportedModel, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, Self::to_json(blob)?)?;
        tracing::info!("Model exported to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<FittedPipeline> {
        let json = std::fs::read_to_string(path)?;
        Self::import_pipeline(&Self::from_json(&json)?)
    }

    /// Проверка: JSON -> импорт дает побитово те же предсказания
    pub fn verify_round_trip(
        json: &str,
        fitted: &FittedPipeline,
        probes: &[JobFeatures],
    ) -> Result<()> {
        let restored = Self::import_pipeline(&Self::from_json(json)?)?;

        for (i, job) in probes.iter().enumerate() {
            let expected = fitted.predict(job)?;
            let actual = restored.predict(job)?;
            if expected.to_bits() != actual.to_bits() {
                return Err(ModelError::Serialization(format!(
                    "round-trip mismatch on probe {}: {} vs {}",
                    i, expected, actual
                )));
            }
        }

        Ok(())
    }
}

fn schema_error(message: String) -> ModelError {
    ModelError::Serialization(message)
}

fn into_schema_error(err: ModelError) -> ModelError {
    match err {
        ModelError::Serialization(_) => err,
        other => ModelError::Serialization(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LaborHoursPipeline;
    use crate::types::RawRecord;

    fn records() -> Vec<RawRecord> {
        let clutter = ["medium", "low", "high"];
        (0..9)
            .map(|i| {
                let sqft = 1000.0 + 333.3 * i as f64;
                let job = JobFeatures::new(
                    sqft,
                    1 + (i % 4) as i32,
                    1.0 + 0.5 * (i % 3) as f64,
                    i % 2 == 0,
                    i % 3 == 1,
                    i % 4 == 2,
                    clutter[i % 3],
                );
                RawRecord::new(job, 1.0 + sqft / 700.0 + 0.1 * (i % 2) as f64).unwrap()
            })
            .collect()
    }

    fn exported() -> (FittedPipeline, ExportedModel) {
        let data = records();
        let pipeline = LaborHoursPipeline::default();
        let fitted = pipeline.fit(&data).unwrap();
        let cv = pipeline.cross_validate(&data, Some(3), 42).unwrap();
        let blob = ModelExporter::export(&fitted.encoder, &fitted.model, &cv).unwrap();
        (fitted, blob)
    }

    #[test]
    fn test_export_layout() {
        let (_, blob) = exported();
        assert_eq!(blob.coefficients.len(), blob.feature_order.len());
        assert_eq!(
            blob.feature_order,
            ["sqft", "bedrooms", "bathrooms", "deep_clean", "fridge", "oven", "low", "medium"]
        );
        let clutter = &blob.categorical_features["clutter"];
        assert_eq!(clutter.categories, ["high", "low", "medium"]);
        assert_eq!(clutter.reference, "high");
        assert_eq!(blob.metrics.n_samples, 9);
    }

    #[test]
    fn test_json_field_names() {
        let (_, blob) = exported();
        let value: serde_json::Value =
            serde_json::from_str(&ModelExporter::to_json(&blob).unwrap()).unwrap();

        for key in [
            "intercept",
            "alpha",
            "numeric_features",
            "binary_features",
            "categorical_features",
            "coefficients",
            "feature_order",
            "metrics",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value["metrics"]["cv_mae"].is_f64());
        assert!(value["metrics"]["n_samples"].is_u64());
        assert!(value["numeric_features"]["stds"].is_array());
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let (fitted, blob) = exported();
        let json = ModelExporter::to_json(&blob).unwrap();

        let probes = vec![
            JobFeatures::new(2390.0, 4, 2.0, true, false, false, "medium"),
            JobFeatures::new(777.7, 1, 1.0, false, true, true, "low"),
            JobFeatures::new(4100.0, 6, 4.5, true, true, true, "unheard-of"),
        ];
        ModelExporter::verify_round_trip(&json, &fitted, &probes).unwrap();

        let restored = ModelExporter::from_json(&json).unwrap();
        assert_eq!(restored, blob);
    }

    #[test]
    fn test_import_rejects_malformed() {
        let (_, blob) = exported();

        let mut bad = blob.clone();
        bad.coefficients.pop();
        assert!(matches!(ModelExporter::import(&bad), Err(ModelError::Serialization(_))));

        let mut bad = blob.clone();
        bad.numeric_features.stds[1] = 0.0;
        assert!(matches!(ModelExporter::import(&bad), Err(ModelError::Serialization(_))));

        let mut bad = blob.clone();
        bad.feature_order.swap(0, 1);
        assert!(ModelExporter::import(&bad).is_err());

        let mut bad = blob.clone();
        if let Some(clutter) = bad.categorical_features.get_mut("clutter") {
            clutter.reference = "medium".to_string();
        }
        assert!(ModelExporter::import(&bad).is_err());

        let mut bad = blob;
        bad.alpha = -1.0;
        assert!(matches!(ModelExporter::import(&bad), Err(ModelError::Serialization(_))));

        assert!(matches!(
            ModelExporter::from_json("{\"intercept\": 1.0}"),
            Err(ModelError::Serialization(_))
        ));
    }

    #[test]
    fn test_export_requires_fitted_encoder() {
        let (fitted, _) = exported();
        let cv = CrossValidationResult {
            mean_absolute_error: 0.0,
            r_squared: 0.0,
            n_samples: 0,
            n_folds: 0,
            folds: Vec::new(),
        };
        let err = ModelExporter::export(&FeatureEncoder::new(), &fitted.model, &cv).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
    }
}
