//! One-object GP Bayesian optimization: RBF Gaussian process, configurable
//! acquisition (Expected Improvement by default) and a seeded acquisition
//! optimizer, built from a space and initial data.

use serde::{Deserialize, Serialize};

use bl_types::{validation_error, BoResult, LoopState, ParameterSpace, UserFunctionResult};

use crate::acquisition::AcquisitionKind;
use crate::acquisition_optimizer::AcquisitionOptimizer;
use crate::gp::{GaussianProcess, Model};
use crate::kernel::Rbf;
use crate::outer_loop::BayesianOptimizationLoop;
use crate::status::LoopStatus;
use crate::stopping::FixedIterationsStoppingCondition;
use crate::user_function::UserFunction;

/// Settings for [`GpBayesianOptimization`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpBoConfig {
    /// Pin the GP noise to a negligible value.
    pub noiseless: bool,
    pub batch_size: usize,
    pub seed: u64,
    pub acquisition: AcquisitionKind,
    pub num_anchor_points: usize,
}

impl Default for GpBoConfig {
    fn default() -> Self {
        Self {
            noiseless: false,
            batch_size: 1,
            seed: 0,
            acquisition: AcquisitionKind::default(),
            num_anchor_points: 1000,
        }
    }
}

pub struct GpBayesianOptimization {
    inner: BayesianOptimizationLoop<GaussianProcess<Rbf>, AcquisitionKind>,
}

impl GpBayesianOptimization {
    pub fn new(
        space: ParameterSpace,
        x_init: &[Vec<f64>],
        y_init: &[Vec<f64>],
        config: &GpBoConfig,
    ) -> BoResult<Self> {
        if x_init.is_empty() {
            return Err(validation_error!("at least one initial point is required"));
        }
        if x_init.len() != y_init.len() {
            return Err(validation_error!(
                "x_init has {} rows but y_init has {} rows",
                x_init.len(),
                y_init.len()
            ));
        }
        space.validate_points(x_init)?;

        let mut model = GaussianProcess::new(Rbf::default())
            .noiseless(config.noiseless)
            .with_seed(config.seed);
        model.set_data(x_init, y_init)?;

        let optimizer = AcquisitionOptimizer::new(config.seed.wrapping_add(1))
            .with_anchor_points(config.num_anchor_points);
        let inner = BayesianOptimizationLoop::new(space, model, config.acquisition)?
            .with_acquisition_optimizer(optimizer)
            .with_batch_size(config.batch_size);

        Ok(Self { inner })
    }

    /// Manual step: log `results`, refit, and return the next points.
    pub fn get_next_points(
        &mut self,
        results: Option<Vec<UserFunctionResult>>,
    ) -> BoResult<Vec<Vec<f64>>> {
        self.inner.get_next_points(results)
    }

    pub fn suggest_new_locations(&mut self) -> BoResult<Vec<Vec<f64>>> {
        self.inner.get_next_points(None)
    }

    pub fn record_results(&mut self, results: Vec<UserFunctionResult>) -> BoResult<()> {
        self.inner.record_results(results)
    }

    /// Built-in driver: run `num_iterations` suggest/evaluate steps.
    pub fn run_optimization<U>(
        &mut self,
        user_function: &mut U,
        num_iterations: usize,
    ) -> BoResult<()>
    where
        U: UserFunction + ?Sized,
    {
        let stopping = FixedIterationsStoppingCondition::new(num_iterations);
        self.inner.run_loop(user_function, &stopping)
    }

    pub fn loop_state(&self) -> &LoopState {
        self.inner.loop_state()
    }

    pub fn model(&self) -> &GaussianProcess<Rbf> {
        self.inner.model()
    }

    pub fn status(&self) -> &LoopStatus {
        self.inner.status()
    }

    pub fn space(&self) -> &ParameterSpace {
        self.inner.space()
    }

    pub fn subscribe_iteration_end(&mut self, observer: impl FnMut(&LoopState) + 'static) {
        self.inner.subscribe_iteration_end(observer);
    }

    /// Posterior mean and variance of the current model at `x`.
    pub fn predict(&self, x: &[Vec<f64>]) -> BoResult<(Vec<f64>, Vec<f64>)> {
        self.inner.model().predict(x)
    }
}
