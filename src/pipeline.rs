//! Полный цикл: кодирование признаков + Ridge регрессия

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{ModelError, Result};
use crate::export::{ExportedModel, ModelExporter};
use crate::models::metrics::{mean_absolute_error, r2_score, residual_std};
use crate::models::ridge::{AlphaCriterion, RidgeModel, RidgeRegressor};
use crate::models::CrossValidator;
use crate::preprocessing::{FeatureEncoder, FeatureEngineer};
use crate::types::{CrossValidationResult, JobFeatures, RawRecord, TrainingMetrics};

/// Необученный конвейер: набор alpha и критерий выбора
#[derive(Debug, Clone, PartialEq)]
pub struct LaborHoursPipeline {
    regressor: RidgeRegressor,
}

impl LaborHoursPipeline {
    pub fn new(regressor: RidgeRegressor) -> Self {
        Self { regressor }
    }

    /// Сетка 10^-3 .. 10^3, 50 значений
    pub fn with_default_alphas() -> Self {
        Self::new(RidgeRegressor::default())
    }

    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        let regressor =
            RidgeRegressor::new(&config.alpha_grid.values())?.with_criterion(config.criterion);
        Ok(Self::new(regressor))
    }

    pub fn regressor(&self) -> &RidgeRegressor {
        &self.regressor
    }

    pub fn criterion(&self) -> AlphaCriterion {
        self.regressor.criterion()
    }

    /// Обучение кодировщика и регрессии на одних и тех же данных
    pub fn fit(&self, records: &[RawRecord]) -> Result<FittedPipeline> {
        let encoder = FeatureEncoder::fitted(records)?;
        let design = encoder.transform_records(records)?;
        let targets = FeatureEngineer::extract_targets(records)?;
        let model = self.regressor.fit(&design, &targets)?;

        Ok(FittedPipeline { encoder, model })
    }

    /// K-fold оценка с переобучением всего конвейера на каждом фолде
    pub fn cross_validate(
        &self,
        records: &[RawRecord],
        folds: Option<usize>,
        seed: u64,
    ) -> Result<CrossValidationResult> {
        let validator = CrossValidator::for_samples(records.len(), folds, seed)?;
        let targets: Vec<f64> = records.iter().map(|r| r.labor_hours).collect();

        validator.evaluate(
            records,
            &targets,
            |train, _| self.fit(train),
            |fitted, test| fitted.predict_records(test),
        )
    }
}

impl Default for LaborHoursPipeline {
    fn default() -> Self {
        Self::with_default_alphas()
    }
}

/// Обученный конвейер (неизменяемый)
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPipeline {
    pub encoder: FeatureEncoder,
    pub model: RidgeModel,
}

impl FittedPipeline {
    pub fn new(encoder: FeatureEncoder, model: RidgeModel) -> Result<Self> {
        let n_features = encoder.n_features()?;
        if n_features != model.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                actual: model.n_features(),
            });
        }
        Ok(Self { encoder, model })
    }

    pub fn predict(&self, job: &JobFeatures) -> Result<f64> {
        let x = self.encoder.transform(job)?;
        self.model.predict_row(&x)
    }

    pub fn predict_batch(&self, jobs: &[JobFeatures]) -> Result<Vec<f64>> {
        jobs.iter().map(|job| self.predict(job)).collect()
    }

    pub fn predict_records(&self, records: &[RawRecord]) -> Result<Vec<f64>> {
        records.iter().map(|r| self.predict(&r.features)).collect()
    }

    /// Метрики на обучающей выборке
    pub fn training_metrics(&self, records: &[RawRecord]) -> Result<TrainingMetrics> {
        let predictions = self.predict_records(records)?;
        let actual: Vec<f64> = records.iter().map(|r| r.labor_hours).collect();
        // Коэффициенты + свободный член
        let n_params = self.model.n_features() + 1;

        Ok(TrainingMetrics {
            r_squared: r2_score(&actual, &predictions),
            mean_absolute_error: mean_absolute_error(&actual, &predictions),
            rmse: residual_std(&actual, &predictions, n_params),
        })
    }

    pub fn coefficients_by_name(&self) -> Result<Vec<(String, f64)>> {
        let names = self.encoder.feature_names()?;
        let coefficients: &Array1<f64> = self.model.coefficients();
        Ok(names.into_iter().zip(coefficients.iter().copied()).collect())
    }
}

/// Результат обучения: модель, метрики, экспорт
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model: ExportedModel,
    pub cross_validation: CrossValidationResult,
    pub training: TrainingMetrics,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

/// CV метрики, финальное обучение на всех данных, экспорт
pub fn train(
    records: &[RawRecord],
    config: &TrainingConfig,
) -> Result<(FittedPipeline, TrainingReport)> {
    for record in records {
        record.validate()?;
    }

    let pipeline = LaborHoursPipeline::from_config(config)?;
    let cross_validation = pipeline.cross_validate(records, config.folds, config.cv_seed)?;

    let fitted = pipeline.fit(records)?;
    let training = fitted.training_metrics(records)?;
    let model = ModelExporter::export(&fitted.encoder, &fitted.model, &cross_validation)?;

    tracing::info!(
        "Model trained on {} records: alpha={:.4}, intercept={:.4}, CV MAE={:.2}h, CV R2={:.3}",
        records.len(),
        fitted.model.alpha(),
        fitted.model.intercept(),
        cross_validation.mean_absolute_error,
        cross_validation.r_squared
    );

    Ok((
        fitted,
        TrainingReport {
            model,
            cross_validation,
            training,
            trained_at: chrono::Utc::now(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RawRecord> {
        let clutter = ["low", "medium", "high", "medium"];
        (0..12)
            .map(|i| {
                let sqft = 900.0 + 210.0 * i as f64;
                let bedrooms = 1 + (i % 5) as i32;
                let job = JobFeatures::new(
                    sqft,
                    bedrooms,
                    1.0 + (i % 3) as f64,
                    i % 3 == 0,
                    i % 4 == 0,
                    i % 2 == 1,
                    clutter[i % 4],
                );
                RawRecord::new(job, 2.0 + 0.001 * sqft + 0.5 * bedrooms as f64).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_fit_and_predict() {
        let data = records();
        let fitted = LaborHoursPipeline::default().fit(&data).unwrap();
        let predictions = fitted.predict_records(&data).unwrap();

        for (p, r) in predictions.iter().zip(data.iter()) {
            assert!((p - r.labor_hours).abs() < 0.1, "{} vs {}", p, r.labor_hours);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = records();
        let a = LaborHoursPipeline::default().fit(&data).unwrap();
        let b = LaborHoursPipeline::default().fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_metrics() {
        let data = records();
        let fitted = LaborHoursPipeline::default().fit(&data).unwrap();
        let metrics = fitted.training_metrics(&data).unwrap();
        assert!(metrics.r_squared > 0.99);
        assert!(metrics.mean_absolute_error < 0.1);
        assert!(metrics.rmse >= 0.0);
    }

    #[test]
    fn test_coefficients_by_name() {
        let fitted = LaborHoursPipeline::default().fit(&records()).unwrap();
        let named = fitted.coefficients_by_name().unwrap();
        assert_eq!(named[0].0, "sqft");
        assert!(named[0].1 > 0.0);
        assert_eq!(named.len(), 8);
    }

    #[test]
    fn test_train_report() {
        let data = records();
        let (fitted, report) = train(&data, &TrainingConfig::default()).unwrap();

        assert_eq!(report.cross_validation.n_samples, 12);
        assert_eq!(report.cross_validation.n_folds, 5);
        assert_eq!(report.model.metrics.n_samples, 12);
        assert_eq!(report.model.alpha, fitted.model.alpha());
    }

    #[test]
    fn test_fitted_pipeline_rejects_mismatched_parts() {
        let fitted = LaborHoursPipeline::default().fit(&records()).unwrap();
        let model = RidgeModel::new(Array1::zeros(3), 1.0, 1.0).unwrap();
        assert!(matches!(
            FittedPipeline::new(fitted.encoder, model),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
