//! K-fold кросс-валидация

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{ModelError, Result};
use crate::models::metrics::{mean_absolute_error, r2_score};
use crate::types::{CrossValidationResult, FoldScore};

/// Разбиение: индексы обучения и теста
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Число фолдов для n примеров: явное значение или min(5, n) (не меньше 2)
pub fn resolve_folds(n_samples: usize, requested: Option<usize>) -> Result<usize> {
    if n_samples < 2 {
        return Err(ModelError::InsufficientData {
            required: 2,
            actual: n_samples,
        });
    }

    match requested {
        None if n_samples > 2 => Ok(n_samples.min(5)),
        None => Ok(2),
        Some(k) if k < 2 => Err(ModelError::InvalidConfig(format!(
            "number of folds must be at least 2, got {}",
            k
        ))),
        Some(k) if k > n_samples => Err(ModelError::InvalidConfig(format!(
            "number of folds ({}) exceeds number of samples ({})",
            k, n_samples
        ))),
        Some(k) => Ok(k),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Перемешивание (Fisher-Yates, ChaCha8) и нарезка на k подряд идущих
    /// частей; первые n % k частей на один элемент больше.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        let k = resolve_folds(n_samples, Some(self.n_splits))?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let fold_size = n_samples / k;
        let remainder = n_samples % k;

        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for fold_idx in 0..k {
            let size = fold_size + usize::from(fold_idx < remainder);
            let test = indices[start..start + size].to_vec();
            let train = indices[..start]
                .iter()
                .chain(indices[start + size..].iter())
                .copied()
                .collect();
            folds.push(Fold { train, test });
            start += size;
        }

        Ok(folds)
    }
}

/// Оценка обобщающей ошибки. Модель (включая кодировщик) переобучается
/// на каждом фолде; MAE и R² усредняются по фолдам.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossValidator {
    kfold: KFold,
}

impl CrossValidator {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            kfold: KFold::new(n_splits, seed),
        }
    }

    /// Число фолдов выбирается автоматически (см. resolve_folds)
    pub fn for_samples(n_samples: usize, requested: Option<usize>, seed: u64) -> Result<Self> {
        Ok(Self::new(resolve_folds(n_samples, requested)?, seed))
    }

    pub fn n_splits(&self) -> usize {
        self.kfold.n_splits()
    }

    pub fn evaluate<T, M, F, P>(
        &self,
        samples: &[T],
        targets: &[f64],
        fit_fn: F,
        predict_fn: P,
    ) -> Result<CrossValidationResult>
    where
        T: Clone,
        F: Fn(&[T], &[f64]) -> Result<M>,
        P: Fn(&M, &[T]) -> Result<Vec<f64>>,
    {
        let n_samples = samples.len();
        if targets.len() != n_samples {
            return Err(ModelError::InvalidInput(format!(
                "{} samples but {} targets",
                n_samples,
                targets.len()
            )));
        }

        let folds = self.kfold.split(n_samples)?;
        let mut scores = Vec::with_capacity(folds.len());

        for (fold_idx, fold) in folds.iter().enumerate() {
            let train_x: Vec<T> = fold.train.iter().map(|&i| samples[i].clone()).collect();
            let train_y: Vec<f64> = fold.train.iter().map(|&i| targets[i]).collect();
            let test_x: Vec<T> = fold.test.iter().map(|&i| samples[i].clone()).collect();
            let test_y: Vec<f64> = fold.test.iter().map(|&i| targets[i]).collect();

            let model = fit_fn(&train_x, &train_y)?;
            let predictions = predict_fn(&model, &test_x)?;
            if predictions.len() != test_y.len() {
                return Err(ModelError::DimensionMismatch {
                    expected: test_y.len(),
                    actual: predictions.len(),
                });
            }

            let score = FoldScore {
                mean_absolute_error: mean_absolute_error(&test_y, &predictions),
                r_squared: r2_score(&test_y, &predictions),
                n_test: test_y.len(),
            };
            tracing::debug!(
                "Fold {}/{}: MAE={:.4}, R2={:.4}",
                fold_idx + 1,
                folds.len(),
                score.mean_absolute_error,
                score.r_squared
            );
            scores.push(score);
        }

        let n_folds = scores.len() as f64;
        let result = CrossValidationResult {
            mean_absolute_error: scores.iter().map(|s| s.mean_absolute_error).sum::<f64>()
                / n_folds,
            r_squared: scores.iter().map(|s| s.r_squared).sum::<f64>() / n_folds,
            n_samples,
            n_folds: scores.len(),
            folds: scores,
        };

        tracing::info!(
            "Cross-validation ({} folds): MAE={:.3}, R2={:.3}",
            result.n_folds,
            result.mean_absolute_error,
            result.r_squared
        );
        Ok(result)
    }
}
