//! Gaussian-process regression surrogate.
//!
//! The GP models the first output column. Targets are standardized before
//! fitting (zero mean, unit variance) and predictions are mapped back to
//! the original units. The covariance `K + σ²I` is factorized with a
//! Cholesky decomposition; when that fails a growing jitter is added to the
//! diagonal before giving up.
//!
//! [`GaussianProcess::optimize`] fits the kernel hyperparameters and the
//! noise variance by maximizing the log marginal likelihood with a
//! multi-start [`CompassSearch`] in log space. Restart points come from a
//! seeded RNG, so fitting is reproducible.

use nalgebra::{DMatrix, DVector, Dyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use bl_types::{BoResult, ModelError};

use crate::kernel::Kernel;
use crate::local_search::CompassSearch;

/// The seam between the optimization loop and its surrogate.
pub trait Model {
    /// Replace the training data. `x` and `y` must have equal row counts.
    fn set_data(&mut self, x: &[Vec<f64>], y: &[Vec<f64>]) -> BoResult<()>;

    /// Fit hyperparameters to the current data.
    fn optimize(&mut self) -> BoResult<()>;

    /// Posterior mean and variance at each row of `x`.
    fn predict(&self, x: &[Vec<f64>]) -> BoResult<(Vec<f64>, Vec<f64>)>;

    fn predict_point(&self, x: &[f64]) -> BoResult<(f64, f64)> {
        let (means, variances) = self.predict(&[x.to_vec()])?;
        Ok((means[0], variances[0]))
    }

    fn x(&self) -> &[Vec<f64>];

    fn y(&self) -> &[Vec<f64>];
}

/// Noise variance used when the model is declared noiseless.
pub const NOISELESS_VARIANCE: f64 = 1e-10;
/// Default observation noise (standardized units).
const DEFAULT_NOISE_VARIANCE: f64 = 1e-2;
/// Default number of random restarts for hyperparameter fitting.
const DEFAULT_RESTARTS: usize = 5;

const JITTER_LADDER: [f64; 5] = [0.0, 1e-10, 1e-8, 1e-6, 1e-4];
const LOG_NOISE_BOUNDS: (f64, f64) = (-18.420_680_743_952_367, 0.0); // ln(1e-8), ln(1)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Debug, Clone)]
struct Fit {
    cholesky: nalgebra::linalg::Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    log_likelihood: f64,
}

/// Exact GP regression with a configurable kernel.
#[derive(Debug, Clone)]
pub struct GaussianProcess<K: Kernel> {
    kernel: K,
    noise_variance: f64,
    noiseless: bool,
    restarts: usize,
    rng: StdRng,
    x: Vec<Vec<f64>>,
    y: Vec<Vec<f64>>,
    y_standardized: Vec<f64>,
    y_mean: f64,
    y_std: f64,
    fit: Option<Fit>,
}

impl<K: Kernel> GaussianProcess<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            noise_variance: DEFAULT_NOISE_VARIANCE,
            noiseless: false,
            restarts: DEFAULT_RESTARTS,
            rng: StdRng::seed_from_u64(0),
            x: Vec::new(),
            y: Vec::new(),
            y_standardized: Vec::new(),
            y_mean: 0.0,
            y_std: 1.0,
            fit: None,
        }
    }

    /// Pin the noise variance to [`NOISELESS_VARIANCE`] and exclude it from
    /// hyperparameter fitting.
    pub fn noiseless(mut self, noiseless: bool) -> Self {
        self.noiseless = noiseless;
        if noiseless {
            self.noise_variance = NOISELESS_VARIANCE;
        }
        self
    }

    pub fn with_noise_variance(mut self, noise_variance: f64) -> Self {
        self.noise_variance = noise_variance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    /// Log marginal likelihood of the standardized targets under the
    /// current hyperparameters.
    pub fn log_marginal_likelihood(&self) -> BoResult<f64> {
        self.fit
            .as_ref()
            .map(|f| f.log_likelihood)
            .ok_or_else(|| ModelError::NoData.into())
    }

    fn input_dim(&self) -> Option<usize> {
        self.x.first().map(Vec::len)
    }

    fn compute_fit(&self, kernel: &K, noise_variance: f64) -> Result<Fit, ModelError> {
        let n = self.x.len();
        if n == 0 {
            return Err(ModelError::NoData);
        }
        let k = DMatrix::from_fn(n, n, |i, j| {
            let v = kernel.k(&self.x[i], &self.x[j]);
            if i == j {
                v + noise_variance
            } else {
                v
            }
        });

        let y_vec = DVector::from_column_slice(&self.y_standardized);
        for jitter in JITTER_LADDER {
            let mut kj = k.clone();
            for i in 0..n {
                kj[(i, i)] += jitter;
            }
            let Some(cholesky) = nalgebra::linalg::Cholesky::new(kj) else {
                continue;
            };
            let alpha = cholesky.solve(&y_vec);
            let log_det_half: f64 = cholesky.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
            let log_likelihood =
                -0.5 * y_vec.dot(&alpha) - log_det_half - 0.5 * n as f64 * LN_2PI;
            if !log_likelihood.is_finite() {
                continue;
            }
            if jitter > 0.0 {
                debug!(jitter, "Cholesky needed diagonal jitter");
            }
            return Ok(Fit {
                cholesky,
                alpha,
                log_likelihood,
            });
        }

        Err(ModelError::NotPositiveDefinite {
            jitter: JITTER_LADDER[JITTER_LADDER.len() - 1],
        })
    }

    fn input_span(&self) -> Vec<f64> {
        let d = self.input_dim().unwrap_or(0);
        (0..d)
            .map(|j| {
                let (lo, hi) = self
                    .x
                    .iter()
                    .map(|row| row[j])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                hi - lo
            })
            .collect()
    }

    fn split_params(&self, params: &[f64]) -> (K, f64) {
        let n_kernel = self.kernel.log_params().len();
        let mut kernel = self.kernel.clone();
        kernel.set_log_params(&params[..n_kernel]);
        let noise = if self.noiseless {
            NOISELESS_VARIANCE
        } else {
            params[n_kernel].exp()
        };
        (kernel, noise)
    }
}

impl<K: Kernel> Model for GaussianProcess<K> {
    fn set_data(&mut self, x: &[Vec<f64>], y: &[Vec<f64>]) -> BoResult<()> {
        if x.len() != y.len() {
            return Err(ModelError::ShapeMismatch {
                message: format!("x has {} rows but y has {} rows", x.len(), y.len()),
            }
            .into());
        }
        if let Some(first) = x.first() {
            if first.is_empty() || x.iter().any(|row| row.len() != first.len()) {
                return Err(ModelError::ShapeMismatch {
                    message: "input rows must be non-empty and of equal length".to_string(),
                }
                .into());
            }
        }
        let mut targets = Vec::with_capacity(y.len());
        for row in y {
            match row.first() {
                Some(v) if v.is_finite() => targets.push(*v),
                Some(_) => {
                    return Err(ModelError::NonFinite {
                        message: "training target".to_string(),
                    }
                    .into())
                }
                None => {
                    return Err(ModelError::ShapeMismatch {
                        message: "output rows must be non-empty".to_string(),
                    }
                    .into())
                }
            }
        }

        self.x = x.to_vec();
        self.y = y.to_vec();

        let n = targets.len();
        if n == 0 {
            self.y_standardized.clear();
            self.fit = None;
            return Ok(());
        }
        self.y_mean = targets.iter().sum::<f64>() / n as f64;
        let var = targets.iter().map(|v| (v - self.y_mean).powi(2)).sum::<f64>() / n as f64;
        self.y_std = if n > 1 && var.sqrt() > 1e-12 {
            var.sqrt()
        } else {
            1.0
        };
        self.y_standardized = targets
            .iter()
            .map(|v| (v - self.y_mean) / self.y_std)
            .collect();

        self.fit = None;
        self.fit = Some(self.compute_fit(&self.kernel, self.noise_variance)?);
        Ok(())
    }

    fn optimize(&mut self) -> BoResult<()> {
        if self.x.is_empty() {
            return Err(ModelError::NoData.into());
        }

        let mut bounds = self.kernel.log_bounds(&self.input_span());
        let mut current = self.kernel.log_params();
        if !self.noiseless {
            bounds.push(LOG_NOISE_BOUNDS);
            current.push(self.noise_variance.ln());
        }

        let mut starts = vec![current];
        for _ in 0..self.restarts {
            starts.push(
                bounds
                    .iter()
                    .map(|(lo, hi)| self.rng.random_range(*lo..=*hi))
                    .collect(),
            );
        }

        let search = CompassSearch {
            initial_step: 1.0,
            min_step: 1e-3,
            max_evaluations: 400,
        };

        let mut best: Option<(Vec<f64>, f64)> = None;
        for start in &starts {
            let (params, lml) = search.maximize(start, &bounds, |p| {
                let (kernel, noise) = self.split_params(p);
                self.compute_fit(&kernel, noise)
                    .map(|f| f.log_likelihood)
                    .unwrap_or(f64::NEG_INFINITY)
            });
            if best.as_ref().map_or(true, |(_, b)| lml > *b) {
                best = Some((params, lml));
            }
        }

        let Some((params, lml)) = best.filter(|(_, lml)| lml.is_finite()) else {
            return Err(ModelError::NotPositiveDefinite {
                jitter: JITTER_LADDER[JITTER_LADDER.len() - 1],
            }
            .into());
        };

        let (kernel, noise) = self.split_params(&params);
        self.fit = Some(self.compute_fit(&kernel, noise)?);
        self.kernel = kernel;
        self.noise_variance = noise;
        debug!(
            kernel = self.kernel.name(),
            params = ?self.kernel.log_params(),
            noise = self.noise_variance,
            log_likelihood = lml,
            "Fitted GP hyperparameters"
        );
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> BoResult<(Vec<f64>, Vec<f64>)> {
        let fit = self.fit.as_ref().ok_or(ModelError::NoData)?;
        let dim = self.input_dim().unwrap_or(0);

        let mut means = Vec::with_capacity(x.len());
        let mut variances = Vec::with_capacity(x.len());
        for point in x {
            if point.len() != dim {
                return Err(ModelError::ShapeMismatch {
                    message: format!("expected {dim} inputs, got {}", point.len()),
                }
                .into());
            }
            let k_star =
                DVector::from_fn(self.x.len(), |i, _| self.kernel.k(point, &self.x[i]));

            // Mean: k*^T α
            let mean = k_star.dot(&fit.alpha);

            // Variance: k(x*, x*) - k*^T (K + σ²I)^{-1} k*
            let v = fit.cholesky.solve(&k_star);
            let var = (self.kernel.variance() - k_star.dot(&v)).max(0.0);

            means.push(mean * self.y_std + self.y_mean);
            variances.push(var * self.y_std * self.y_std);
        }
        Ok((means, variances))
    }

    fn x(&self) -> &[Vec<f64>] {
        &self.x
    }

    fn y(&self) -> &[Vec<f64>] {
        &self.y
    }
}
