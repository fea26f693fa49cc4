//! Решение линейных систем для небольших матриц

#![allow(non_snake_case)]

use ndarray::Array2;

use crate::error::{ModelError, Result};

/// Разложение Холецкого A = L L' для симметричной положительно определенной A.
/// Читается только нижний треугольник A.
pub fn cholesky(A: &Array2<f64>) -> Result<Array2<f64>> {
    let n = A.nrows();
    if A.ncols() != n {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: A.ncols(),
        });
    }

    let mut L = Array2::zeros((n, n));
    for j in 0..n {
        let mut diag = A[[j, j]];
        for k in 0..j {
            diag -= L[[j, k]] * L[[j, k]];
        }
        // NaN тоже сюда
        if !(diag > 0.0) || !diag.is_finite() {
            return Err(ModelError::InvalidInput(format!(
                "matrix is not positive definite (pivot {} = {:e})",
                j, diag
            )));
        }
        let ljj = diag.sqrt();
        L[[j, j]] = ljj;

        for i in (j + 1)..n {
            let mut sum = A[[i, j]];
            for k in 0..j {
                sum -= L[[i, k]] * L[[j, k]];
            }
            L[[i, j]] = sum / ljj;
        }
    }

    Ok(L)
}

/// Решение A X = B для симметричной положительно определенной A
/// (например, X'X + alpha I при alpha > 0).
/// B может содержать несколько правых частей (столбцов).
pub fn solve_spd(A: &Array2<f64>, B: &Array2<f64>) -> Result<Array2<f64>> {
    let n = A.nrows();
    if B.nrows() != n {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: B.nrows(),
        });
    }
    let L = cholesky(A)?;

    let m = B.ncols();
    let mut X = B.to_owned();
    for c in 0..m {
        // L y = b
        for i in 0..n {
            let mut sum = X[[i, c]];
            for k in 0..i {
                sum -= L[[i, k]] * X[[k, c]];
            }
            X[[i, c]] = sum / L[[i, i]];
        }
        // L' x = y
        for i in (0..n).rev() {
            let mut sum = X[[i, c]];
            for k in (i + 1)..n {
                sum -= L[[k, i]] * X[[k, c]];
            }
            X[[i, c]] = sum / L[[i, i]];
        }
    }

    Ok(X)
}
