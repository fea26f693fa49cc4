//! Ridge регрессия с подбором alpha через leave-one-out / GCV

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::models::linalg::solve_spd;

/// Порог, при котором 1 - h_i считается нулем
const LEVERAGE_EPS: f64 = 1e-12;
/// Относительный допуск при сравнении оценок alpha
const SCORE_TIE_TOL: f64 = 1e-12;

/// Логарифмическая сетка 10^start .. 10^end
pub fn logspace(start_exp: f64, end_exp: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![10f64.powf(start_exp)],
        _ => {
            let step = (end_exp - start_exp) / (num - 1) as f64;
            (0..num)
                .map(|i| 10f64.powf(start_exp + step * i as f64))
                .collect()
        }
    }
}

/// Критерий выбора alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaCriterion {
    /// Средний квадрат LOO ошибки через leverage: e_i / (1 - h_i)
    #[default]
    LeaveOneOut,
    /// Generalized cross-validation: RSS / n / (1 - tr(H) / n)^2
    Generalized,
}

/// Обученная модель: y = X·w + b
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeModel {
    coefficients: Array1<f64>,
    intercept: f64,
    alpha: f64,
}

impl RidgeModel {
    pub fn new(coefficients: Array1<f64>, intercept: f64, alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ModelError::InvalidInput(format!(
                "alpha must be positive and finite, got {}",
                alpha
            )));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::InvalidInput(
                "coefficients must be finite".to_string(),
            ));
        }

        Ok(Self {
            coefficients,
            intercept,
            alpha,
        })
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: X.ncols(),
            });
        }

        Ok(X.dot(&self.coefficients) + self.intercept)
    }

    pub fn predict_row(&self, x: &Array1<f64>) -> Result<f64> {
        if x.len() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: x.len(),
            });
        }

        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Центрированные данные для закрытой формы
struct CenteredDesign {
    Xc: Array2<f64>,
    yc: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
    gram: Array2<f64>,
    xty: Array1<f64>,
}

impl CenteredDesign {
    fn new(X: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(ModelError::InvalidInput("Empty dataset".to_string()));
        }
        if y.len() != n_samples {
            return Err(ModelError::InvalidInput(format!(
                "X has {} rows but y has {} values",
                n_samples,
                y.len()
            )));
        }
        if X.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput(
                "design matrix or target contains non-finite values".to_string(),
            ));
        }

        let x_mean = X
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(X.ncols()));
        let y_mean = y.sum() / n_samples as f64;

        let Xc = X - &x_mean;
        let yc = y - y_mean;
        let gram = Xc.t().dot(&Xc);
        let xty = Xc.t().dot(&yc);

        Ok(Self {
            Xc,
            yc,
            x_mean,
            y_mean,
            gram,
            xty,
        })
    }

    fn n_samples(&self) -> usize {
        self.Xc.nrows()
    }

    fn penalized_gram(&self, alpha: f64) -> Array2<f64> {
        let mut A = self.gram.clone();
        for i in 0..A.nrows() {
            A[[i, i]] += alpha;
        }
        A
    }

    /// Веса для фиксированного alpha
    fn solve(&self, alpha: f64) -> Result<Array1<f64>> {
        let rhs = self.xty.clone().insert_axis(Axis(1));
        let w = solve_spd(&self.penalized_gram(alpha), &rhs)?;
        Ok(w.column(0).to_owned())
    }

    /// Веса и диагональ hat-матрицы (с учетом свободного члена)
    /// за одно решение системы с правыми частями [X'y | Xc'].
    fn solve_with_leverage(&self, alpha: f64) -> Result<(Array1<f64>, Array1<f64>)> {
        let n_samples = self.n_samples();
        let n_features = self.Xc.ncols();

        let mut rhs = Array2::zeros((n_features, n_samples + 1));
        rhs.column_mut(0).assign(&self.xty);
        for (i, row) in self.Xc.rows().into_iter().enumerate() {
            rhs.column_mut(i + 1).assign(&row);
        }

        let solution = solve_spd(&self.penalized_gram(alpha), &rhs)?;
        let w = solution.column(0).to_owned();

        let base = 1.0 / n_samples as f64;
        let leverage: Array1<f64> = self
            .Xc
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| base + row.dot(&solution.column(i + 1)))
            .collect();

        Ok((w, leverage))
    }

    fn intercept(&self, w: &Array1<f64>) -> f64 {
        self.y_mean - self.x_mean.dot(w)
    }
}

/// Подбор alpha и обучение Ridge регрессии
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegressor {
    alphas: Vec<f64>,
    criterion: AlphaCriterion,
}

impl RidgeRegressor {
    pub fn new(alpha_candidates: &[f64]) -> Result<Self> {
        if alpha_candidates.is_empty() {
            return Err(ModelError::InvalidConfig(
                "alpha candidate set is empty".to_string(),
            ));
        }
        if let Some(bad) = alpha_candidates.iter().find(|a| !a.is_finite() || **a <= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "alpha candidates must be positive and finite, got {}",
                bad
            )));
        }

        // По возрастанию: при равенстве оценок выигрывает меньший alpha
        let mut alphas = alpha_candidates.to_vec();
        alphas.sort_by(f64::total_cmp);
        alphas.dedup();

        Ok(Self {
            alphas,
            criterion: AlphaCriterion::default(),
        })
    }

    pub fn with_criterion(mut self, criterion: AlphaCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn criterion(&self) -> AlphaCriterion {
        self.criterion
    }

    pub fn fit(&self, X: &Array2<f64>, y: &Array1<f64>) -> Result<RidgeModel> {
        let design = CenteredDesign::new(X, y)?;

        // Один пример: Xc = 0, решение одинаково для любого alpha
        if design.n_samples() < 2 || self.alphas.len() == 1 {
            return Self::finish(&design, self.alphas[0]);
        }

        let mut best: Option<(f64, f64, Array1<f64>)> = None;
        for &alpha in &self.alphas {
            let (w, score) = match self.candidate_score(&design, alpha) {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!("alpha={:.3e} skipped: {}", alpha, e);
                    continue;
                }
            };
            tracing::debug!("alpha={:.6e} score={:.6e}", alpha, score);

            if !score.is_finite() {
                continue;
            }
            let improves = match &best {
                None => true,
                Some((_, best_score, _)) => {
                    score < *best_score && (best_score - score) > SCORE_TIE_TOL * best_score.abs()
                }
            };
            if improves {
                best = Some((alpha, score, w));
            }
        }

        let (alpha, score, w) = best.ok_or_else(|| {
            ModelError::InvalidInput("no alpha candidate produced a finite score".to_string())
        })?;
        let intercept = design.intercept(&w);

        tracing::debug!(
            "Ridge fitted: alpha={:.6}, score={:.6}, n_samples={}",
            alpha,
            score,
            design.n_samples()
        );
        RidgeModel::new(w, intercept, alpha)
    }

    /// Обучение с фиксированным alpha
    pub fn fit_with_alpha(X: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<RidgeModel> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "alpha must be positive and finite, got {}",
                alpha
            )));
        }
        let design = CenteredDesign::new(X, y)?;
        Self::finish(&design, alpha)
    }

    fn finish(design: &CenteredDesign, alpha: f64) -> Result<RidgeModel> {
        let w = design.solve(alpha)?;
        let intercept = design.intercept(&w);
        RidgeModel::new(w, intercept, alpha)
    }

    /// Веса и оценка ошибки для одного кандидата
    fn candidate_score(&self, design: &CenteredDesign, alpha: f64) -> Result<(Array1<f64>, f64)> {
        let (w, leverage) = design.solve_with_leverage(alpha)?;
        let score = match self.criterion {
            AlphaCriterion::LeaveOneOut => self.loo_score(design, alpha, &w, &leverage)?,
            AlphaCriterion::Generalized => gcv_score(design, &w, &leverage),
        };
        Ok((w, score))
    }

    fn loo_score(
        &self,
        design: &CenteredDesign,
        alpha: f64,
        w: &Array1<f64>,
        leverage: &Array1<f64>,
    ) -> Result<f64> {
        let n_samples = design.n_samples();
        let fitted = design.Xc.dot(w);

        let mut total = 0.0;
        for i in 0..n_samples {
            let residual = design.yc[i] - fitted[i];
            let denom = 1.0 - leverage[i];
            let loo_residual = if denom > LEVERAGE_EPS {
                residual / denom
            } else {
                tracing::warn!(
                    "leverage of sample {} is ~1 at alpha={:.3e}, refitting without it",
                    i,
                    alpha
                );
                refit_residual(design, alpha, i)?
            };
            total += loo_residual * loo_residual;
        }

        Ok(total / n_samples as f64)
    }
}

fn gcv_score(design: &CenteredDesign, w: &Array1<f64>, leverage: &Array1<f64>) -> f64 {
    let n = design.n_samples() as f64;
    let residuals = &design.yc - &design.Xc.dot(w);
    let rss = residuals.mapv(|r| r * r).sum();
    let denom = 1.0 - leverage.sum() / n;
    if denom <= LEVERAGE_EPS {
        return f64::INFINITY;
    }
    rss / n / (denom * denom)
}

impl Default for RidgeRegressor {
    /// Сетка 10^-3 .. 10^3, 50 значений, leave-one-out
    fn default() -> Self {
        Self {
            alphas: logspace(-3.0, 3.0, 50),
            criterion: AlphaCriterion::default(),
        }
    }
}

/// Остаток на примере i при обучении без него (явное переобучение)
fn refit_residual(design: &CenteredDesign, alpha: f64, skip: usize) -> Result<f64> {
    let keep: Vec<usize> = (0..design.n_samples()).filter(|&i| i != skip).collect();
    let X = design.Xc.select(Axis(0), &keep);
    let y = design.yc.select(Axis(0), &keep);

    let model = RidgeRegressor::fit_with_alpha(&X, &y, alpha)?;
    let prediction = model.predict_row(&design.Xc.row(skip).to_owned())?;
    Ok(design.yc[skip] - prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let X = array![
            [0.0, 1.0],
            [1.0, 0.5],
            [2.0, -1.0],
            [3.0, 0.0],
            [4.0, 2.0],
            [5.0, 1.5],
            [6.0, -0.5],
            [7.0, 0.25],
        ];
        let y = X.column(0).mapv(|v| 3.0 + 2.0 * v) - X.column(1).mapv(|v| 1.5 * v);
        (X, y)
    }

    /// Прямой leave-one-out через переобучение
    fn brute_force_loo(X: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> f64 {
        let n = X.nrows();
        let mut total = 0.0;
        for i in 0..n {
            let keep: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            let model = RidgeRegressor::fit_with_alpha(
                &X.select(Axis(0), &keep),
                &y.select(Axis(0), &keep),
                alpha,
            )
            .unwrap();
            let e = y[i] - model.predict_row(&X.row(i).to_owned()).unwrap();
            total += e * e;
        }
        total / n as f64
    }

    #[test]
    fn test_logspace() {
        let grid = logspace(-3.0, 3.0, 7);
        assert_eq!(grid.len(), 7);
        assert!((grid[0] - 1e-3).abs() < 1e-15);
        assert!((grid[3] - 1.0).abs() < 1e-12);
        assert!((grid[6] - 1e3).abs() < 1e-9);
        assert!(logspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_invalid_candidates() {
        assert!(matches!(RidgeRegressor::new(&[]), Err(ModelError::InvalidConfig(_))));
        assert!(RidgeRegressor::new(&[1.0, 0.0]).is_err());
        assert!(RidgeRegressor::new(&[-1.0]).is_err());
        assert!(RidgeRegressor::new(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_candidates_sorted_and_deduplicated() {
        let ridge = RidgeRegressor::new(&[10.0, 0.1, 1.0, 0.1]).unwrap();
        assert_eq!(ridge.alphas(), [0.1, 1.0, 10.0]);
    }

    #[test]
    fn test_closed_form_loo_matches_refit() {
        let (X, mut y) = linear_data();
        y[2] += 0.7;
        y[5] -= 0.4;
        let design = CenteredDesign::new(&X, &y).unwrap();
        let ridge = RidgeRegressor::new(&[0.5]).unwrap();

        for alpha in [0.01, 0.5, 3.0] {
            let (w, leverage) = design.solve_with_leverage(alpha).unwrap();
            let fast = ridge.loo_score(&design, alpha, &w, &leverage).unwrap();
            let slow = brute_force_loo(&X, &y, alpha);
            assert!((fast - slow).abs() < 1e-9 * slow.max(1.0), "{} vs {}", fast, slow);
        }
    }

    #[test]
    fn test_recovers_linear_relationship() {
        let (X, y) = linear_data();
        let ridge = RidgeRegressor::new(&logspace(-6.0, 2.0, 20)).unwrap();
        let model = ridge.fit(&X, &y).unwrap();

        assert!((model.coefficients()[0] - 2.0).abs() < 1e-3);
        assert!((model.coefficients()[1] + 1.5).abs() < 1e-3);
        assert!((model.intercept() - 3.0).abs() < 1e-3);
        assert!((model.alpha() - 1e-6).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_smallest_alpha() {
        // Константный X: все alpha дают одинаковое решение
        let X = array![[1.0], [1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let model = RidgeRegressor::new(&[5.0, 0.5, 50.0]).unwrap().fit(&X, &y).unwrap();
        assert_eq!(model.alpha(), 0.5);
        assert_eq!(model.coefficients()[0], 0.0);
        assert!((model.intercept() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_shrinkage_with_large_alpha() {
        let (X, y) = linear_data();
        let model = RidgeRegressor::fit_with_alpha(&X, &y, 1e12).unwrap();
        assert!(model.coefficients().iter().all(|c| c.abs() < 1e-6));

        let y_mean = y.sum() / y.len() as f64;
        assert!((model.intercept() - y_mean).abs() < 1e-4);
    }

    #[test]
    fn test_gcv_criterion_fits() {
        let (X, y) = linear_data();
        let model = RidgeRegressor::new(&logspace(-4.0, 4.0, 9))
            .unwrap()
            .with_criterion(AlphaCriterion::Generalized)
            .fit(&X, &y)
            .unwrap();
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_single_sample() {
        let X = array![[3.0, 1.0]];
        let y = array![7.0];
        let model = RidgeRegressor::new(&[0.1, 1.0]).unwrap().fit(&X, &y).unwrap();
        assert_eq!(model.alpha(), 0.1);
        assert_eq!(model.predict(&X).unwrap()[0], 7.0);
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let (X, y) = linear_data();
        let model = RidgeRegressor::fit_with_alpha(&X, &y, 1.0).unwrap();
        let err = model.predict(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch { expected: 2, actual: 3 }
        ));
        assert!(model.predict_row(&array![1.0]).is_err());
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let ridge = RidgeRegressor::new(&[1.0]).unwrap();
        assert!(ridge.fit(&Array2::zeros((0, 2)), &Array1::zeros(0)).is_err());
        assert!(ridge.fit(&array![[1.0], [2.0]], &array![1.0]).is_err());
        assert!(ridge.fit(&array![[1.0], [f64::INFINITY]], &array![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_duplicated_column_with_tiny_alpha() {
        // Вырожденная X'X: alpha > 0 все равно дает единственное решение
        let X = Array2::from_shape_fn((10, 2), |(i, _)| (i + 1) as f64);
        let y = X.column(0).mapv(|v| 1.0 + 3.0 * v);

        let model = RidgeRegressor::new(&[1e-12, 1.0]).unwrap().fit(&X, &y).unwrap();
        for (p, t) in model.predict(&X).unwrap().iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.1, "{} vs {}", p, t);
        }

        let exact = RidgeRegressor::fit_with_alpha(&X, &y, 1e-12).unwrap();
        for (p, t) in exact.predict(&X).unwrap().iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "{} vs {}", p, t);
        }
        // Вес делится между одинаковыми столбцами
        let total: f64 = exact.coefficients().sum();
        assert!((total - 3.0).abs() < 1e-6);
    }
}
