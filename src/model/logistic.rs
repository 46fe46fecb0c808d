//! Logistic regression fitted by iteratively reweighted least squares.
//!
//! Each IRLS step solves a weighted least-squares problem; rows are
//! scaled by `sqrt(w_i)` and the resulting system is solved with SVD,
//! which stays robust when WoE-encoded columns are nearly collinear.
//! Parameter dimension is tiny (one coefficient per feature), so SVD
//! cost is negligible.

use anyhow::Result;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Working weights below this are clamped to keep the solve stable.
const MIN_WORKING_WEIGHT: f64 = 1e-10;

/// Estimator hyperparameters, validated before fitting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Maximum IRLS iterations
    pub max_iter: usize,
    /// Convergence tolerance on the max coefficient update
    pub tol: f64,
    /// L2 penalty strength (0 disables; the intercept is never penalized)
    pub l2: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-8,
            l2: 0.0,
        }
    }
}

impl LogisticParams {
    pub fn validate(&self) -> Result<(), StageError> {
        if self.max_iter == 0 {
            return Err(StageError::InvalidConfig {
                message: "max_iter must be at least 1".to_string(),
            });
        }
        if !(self.tol > 0.0) {
            return Err(StageError::InvalidConfig {
                message: format!("tol must be positive, got {}", self.tol),
            });
        }
        if self.l2 < 0.0 {
            return Err(StageError::InvalidConfig {
                message: format!("l2 must be non-negative, got {}", self.l2),
            });
        }
        Ok(())
    }
}

/// A fitted logistic model: intercept plus one coefficient per feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
}

impl LogisticRegression {
    /// Fit on a design matrix (rows x features) and binary targets.
    pub fn fit(x: &DMatrix<f64>, y: &[i32], params: &LogisticParams) -> Result<Self> {
        params.validate()?;
        let n = x.nrows();
        let k = x.ncols();
        if n != y.len() {
            anyhow::bail!("design matrix has {} rows but target has {} values", n, y.len());
        }
        if n == 0 || k == 0 {
            anyhow::bail!("cannot fit logistic regression on an empty design matrix");
        }

        // Design with intercept column first
        let mut design = DMatrix::zeros(n, k + 1);
        for i in 0..n {
            design[(i, 0)] = 1.0;
            for j in 0..k {
                design[(i, j + 1)] = x[(i, j)];
            }
        }
        let y_vec = DVector::from_iterator(n, y.iter().map(|&t| t as f64));

        let mut beta = DVector::zeros(k + 1);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..params.max_iter {
            iterations = iter + 1;

            let eta = &design * &beta;
            let mu = eta.map(sigmoid);
            let w = mu.map(|m| (m * (1.0 - m)).max(MIN_WORKING_WEIGHT));

            // Working response z = eta + (y - mu) / w
            let z = &eta + (&y_vec - &mu).component_div(&w);

            // Scale rows by sqrt(w) and solve ordinary least squares
            let sqrt_w = w.map(f64::sqrt);
            let mut scaled = design.clone();
            for i in 0..n {
                for j in 0..=k {
                    scaled[(i, j)] *= sqrt_w[i];
                }
            }
            let scaled_z = z.component_mul(&sqrt_w);

            // Ridge penalty as augmented rows, skipping the intercept
            let (lhs, rhs) = if params.l2 > 0.0 {
                let mut aug = DMatrix::zeros(n + k, k + 1);
                aug.view_mut((0, 0), (n, k + 1)).copy_from(&scaled);
                let sqrt_l2 = params.l2.sqrt();
                for j in 0..k {
                    aug[(n + j, j + 1)] = sqrt_l2;
                }
                let mut aug_z = DVector::zeros(n + k);
                aug_z.rows_mut(0, n).copy_from(&scaled_z);
                (aug, aug_z)
            } else {
                (scaled, scaled_z)
            };

            let Some(next) = solve_least_squares(&lhs, &rhs) else {
                anyhow::bail!("IRLS inner least-squares solve failed at iteration {}", iterations);
            };

            let delta = (&next - &beta).amax();
            beta = next;

            if delta < params.tol {
                converged = true;
                break;
            }
        }

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            converged,
            iterations,
        })
    }

    /// Linear predictor (log-odds of the event) per row.
    pub fn decision_function(&self, x: &DMatrix<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| {
                let mut eta = self.intercept;
                for (j, coef) in self.coefficients.iter().enumerate() {
                    eta += coef * x[(i, j)];
                }
                eta
            })
            .collect()
    }

    /// Probability of the event (class 1) per row.
    pub fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<f64> {
        self.decision_function(x).into_iter().map(sigmoid).collect()
    }
}

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

/// Solve a least squares problem using SVD.
///
/// Tries progressively looser tolerances to handle near-singular
/// systems; returns `None` if no finite solution is found.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}
