//! Stationary covariance functions.
//!
//! Hyperparameters are exchanged in log space so the GP fitter can search
//! an unconstrained box.

use serde::{Deserialize, Serialize};

/// A positive-definite covariance function over real input rows.
pub trait Kernel: Clone + std::fmt::Debug {
    fn k(&self, x1: &[f64], x2: &[f64]) -> f64;

    /// Prior variance `k(x, x)`.
    fn variance(&self) -> f64;

    /// Log-space hyperparameters, variance first.
    fn log_params(&self) -> Vec<f64>;

    fn set_log_params(&mut self, params: &[f64]);

    /// Log-space search box for each hyperparameter, given the per-dimension
    /// span of the training inputs.
    fn log_bounds(&self, input_span: &[f64]) -> Vec<(f64, f64)>;

    fn name(&self) -> &str;
}

// ln(1e-2), ln(1e2)
const LOG_VARIANCE_BOUNDS: (f64, f64) = (-4.605_170_185_988_091, 4.605_170_185_988_091);

fn lengthscale_bounds(span: f64) -> (f64, f64) {
    let span = if span > 1e-12 { span } else { 1.0 };
    ((span * 1e-2).ln(), (span * 10.0).ln())
}

fn scaled_sq_dist(x1: &[f64], x2: &[f64], lengthscale: impl Fn(usize) -> f64) -> f64 {
    x1.iter()
        .zip(x2)
        .enumerate()
        .map(|(i, (a, b))| {
            let d = (a - b) / lengthscale(i);
            d * d
        })
        .sum()
}

/// Squared-exponential kernel with one shared lengthscale.
///
/// `k(x1, x2) = σ² exp(-r² / 2)` where `r = |x1 - x2| / l`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rbf {
    pub variance: f64,
    pub lengthscale: f64,
}

impl Default for Rbf {
    fn default() -> Self {
        Self {
            variance: 1.0,
            lengthscale: 1.0,
        }
    }
}

impl Kernel for Rbf {
    fn k(&self, x1: &[f64], x2: &[f64]) -> f64 {
        let r_sq = scaled_sq_dist(x1, x2, |_| self.lengthscale);
        self.variance * (-0.5 * r_sq).exp()
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn log_params(&self) -> Vec<f64> {
        vec![self.variance.ln(), self.lengthscale.ln()]
    }

    fn set_log_params(&mut self, params: &[f64]) {
        self.variance = params[0].exp();
        self.lengthscale = params[1].exp();
    }

    fn log_bounds(&self, input_span: &[f64]) -> Vec<(f64, f64)> {
        // Isotropic: bound by the widest dimension.
        let span = input_span.iter().copied().fold(0.0, f64::max);
        vec![LOG_VARIANCE_BOUNDS, lengthscale_bounds(span)]
    }

    fn name(&self) -> &str {
        "rbf"
    }
}

/// Matérn 5/2 kernel with ARD lengthscales.
///
/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matern52 {
    pub variance: f64,
    pub lengthscales: Vec<f64>,
}

impl Matern52 {
    pub fn new(input_dim: usize) -> Self {
        Self {
            variance: 1.0,
            lengthscales: vec![1.0; input_dim],
        }
    }
}

impl Kernel for Matern52 {
    fn k(&self, x1: &[f64], x2: &[f64]) -> f64 {
        let r_sq = scaled_sq_dist(x1, x2, |i| self.lengthscales[i]);
        let sqrt5_r = 5f64.sqrt() * r_sq.sqrt();
        self.variance * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn log_params(&self) -> Vec<f64> {
        std::iter::once(self.variance.ln())
            .chain(self.lengthscales.iter().map(|l| l.ln()))
            .collect()
    }

    fn set_log_params(&mut self, params: &[f64]) {
        self.variance = params[0].exp();
        for (l, p) in self.lengthscales.iter_mut().zip(&params[1..]) {
            *l = p.exp();
        }
    }

    fn log_bounds(&self, input_span: &[f64]) -> Vec<(f64, f64)> {
        std::iter::once(LOG_VARIANCE_BOUNDS)
            .chain(
                (0..self.lengthscales.len())
                    .map(|i| lengthscale_bounds(input_span.get(i).copied().unwrap_or(1.0))),
            )
            .collect()
    }

    fn name(&self) -> &str {
        "matern52"
    }
}
