//! Bootstrap интервал предсказания

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::{ModelError, Result};
use crate::models::metrics::{median, quantile};
use crate::pipeline::LaborHoursPipeline;
use crate::types::{JobFeatures, PredictionInterval, RawRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapEstimator {
    resamples: usize,
    lower_quantile: f64,
    upper_quantile: f64,
    seed: u64,
}

impl BootstrapEstimator {
    pub fn new(resamples: usize, quantiles: (f64, f64), seed: u64) -> Result<Self> {
        let (lower_quantile, upper_quantile) = quantiles;
        if resamples == 0 {
            return Err(ModelError::InvalidConfig(
                "number of bootstrap resamples must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&lower_quantile) || !(0.0..=1.0).contains(&upper_quantile) {
            return Err(ModelError::InvalidConfig(format!(
                "quantiles must lie in [0, 1], got ({}, {})",
                lower_quantile, upper_quantile
            )));
        }
        if lower_quantile > upper_quantile {
            return Err(ModelError::InvalidConfig(format!(
                "lower quantile {} exceeds upper quantile {}",
                lower_quantile, upper_quantile
            )));
        }

        Ok(Self {
            resamples,
            lower_quantile,
            upper_quantile,
            seed,
        })
    }

    pub fn resamples(&self) -> usize {
        self.resamples
    }

    /// Индексы ресэмпла `b`: свой поток ChaCha8 на каждый ресэмпл,
    /// поэтому результат не зависит от порядка выполнения потоками.
    pub fn resample_indices(&self, b: usize, n_samples: usize) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(b as u64);
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }

    /// Предсказания по всем ресэмплам (в порядке ресэмплов).
    /// Кодировщик и регрессия переобучаются на каждом ресэмпле.
    pub fn resample_predictions(
        &self,
        pipeline: &LaborHoursPipeline,
        records: &[RawRecord],
        new_job: &JobFeatures,
    ) -> Result<Vec<f64>> {
        let n_samples = records.len();
        if n_samples == 0 {
            return Err(ModelError::InvalidInput("No records provided".to_string()));
        }

        (0..self.resamples)
            .into_par_iter()
            .map(|b| {
                let sample: Vec<RawRecord> = self
                    .resample_indices(b, n_samples)
                    .into_iter()
                    .map(|i| records[i].clone())
                    .collect();
                let fitted = pipeline.fit(&sample)?;
                fitted.predict(new_job)
            })
            .collect()
    }

    pub fn predict_interval(
        &self,
        pipeline: &LaborHoursPipeline,
        records: &[RawRecord],
        new_job: &JobFeatures,
    ) -> Result<PredictionInterval> {
        let mut predictions = self.resample_predictions(pipeline, records, new_job)?;
        predictions.sort_by(f64::total_cmp);

        let interval = PredictionInterval {
            lower: quantile(&predictions, self.lower_quantile),
            upper: quantile(&predictions, self.upper_quantile),
            median: median(&predictions),
            resamples: predictions.len(),
        };

        tracing::info!(
            "Bootstrap interval ({} resamples): [{:.2}, {:.2}], median {:.2}",
            interval.resamples,
            interval.lower,
            interval.upper,
            interval.median
        );
        Ok(interval)
    }
}
