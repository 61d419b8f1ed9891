//! Runs the same optimization twice: once stepped by hand with
//! externally evaluated points, once through the built-in driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bl_optimizer::{
    branin, forrester, forrester_low, six_hump_camel, ExperimentalDesign, GpBayesianOptimization,
    LatinDesign, TestFunction, UserFunction,
};
use bl_types::{BoResult, LoopState, ParameterSpace, UserFunctionResult};

use crate::config::{CompareConfig, ObjectiveName};

/// Default initial design for the one-dimensional Forrester objectives.
const FORRESTER_INITIAL_X: [f64; 3] = [0.2, 0.6, 0.9];

/// A benchmark usable both as a closed-form function and as a loop objective.
pub trait Benchmark: TestFunction + UserFunction {}

impl<T: TestFunction + UserFunction> Benchmark for T {}

pub fn load_objective(name: ObjectiveName) -> BoResult<(Box<dyn Benchmark>, ParameterSpace)> {
    Ok(match name {
        ObjectiveName::Forrester => boxed(forrester()?),
        ObjectiveName::ForresterLow => boxed(forrester_low()?),
        ObjectiveName::Branin => boxed(branin()?),
        ObjectiveName::SixHumpCamel => boxed(six_hump_camel()?),
    })
}

fn boxed<T: Benchmark + 'static>(
    (f, space): (T, ParameterSpace),
) -> (Box<dyn Benchmark>, ParameterSpace) {
    let f: Box<dyn Benchmark> = Box::new(f);
    (f, space)
}

/// Every point a run evaluated, initial design first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub best_x: Vec<f64>,
    pub best_y: f64,
}

impl SampleSet {
    fn from_state(state: &LoopState) -> Self {
        let (best_x, best_y) = state
            .best()
            .map(|b| (b.x.clone(), b.objective()))
            .unwrap_or((Vec::new(), f64::NAN));
        Self {
            x: state.x(),
            y: state.results().iter().map(UserFunctionResult::objective).collect(),
            best_x,
            best_y,
        }
    }
}

/// True objective sampled on a regular grid (one-dimensional objectives only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub function: ObjectiveName,
    pub parameter_names: Vec<String>,
    pub num_iterations: usize,
    pub initial_count: usize,
    pub global_minimum: (Vec<f64>, f64),
    pub manual: SampleSet,
    pub builtin: SampleSet,
    pub truth: Option<Curve>,
    pub generated_at: DateTime<Utc>,
}

impl Comparison {
    /// Whether both runs evaluated exactly the same points.
    pub fn runs_agree(&self) -> bool {
        self.manual.x == self.builtin.x && self.manual.y == self.builtin.y
    }
}

pub fn initial_points(config: &CompareConfig, space: &ParameterSpace) -> Vec<Vec<f64>> {
    if let Some(points) = &config.initial_points {
        return points.clone();
    }
    match config.function {
        ObjectiveName::Forrester | ObjectiveName::ForresterLow => {
            FORRESTER_INITIAL_X.iter().map(|x| vec![*x]).collect()
        }
        ObjectiveName::Branin | ObjectiveName::SixHumpCamel => {
            let count = 2 * space.dimension() + 1;
            LatinDesign::new(space.clone(), config.optimizer.seed).get_samples(count)
        }
    }
}

/// Step the optimizer by hand: ask for points, evaluate them here, and
/// hand the results back on the next call.
pub fn run_manual(
    bo: &mut GpBayesianOptimization,
    objective: &dyn Benchmark,
    num_iterations: usize,
) -> BoResult<()> {
    let mut results: Option<Vec<UserFunctionResult>> = None;
    for iteration in 0..num_iterations {
        let x_new = bo.get_next_points(results.take())?;
        let y_new = objective.evaluate_batch(&x_new);
        info!(iteration, x = ?x_new, y = ?y_new, "Manual step evaluated");
        results = Some(
            x_new
                .into_iter()
                .zip(y_new)
                .map(|(x, y)| UserFunctionResult::new(x, y))
                .collect::<BoResult<Vec<_>>>()?,
        );
    }
    // Log the final batch so both runs hold the same number of samples.
    if let Some(last) = results {
        bo.record_results(last)?;
    }
    Ok(())
}

pub fn run_comparison(config: &CompareConfig) -> BoResult<Comparison> {
    let (mut objective, space) = load_objective(config.function)?;
    let x_init = initial_points(config, &space);
    // The benchmarks index rows directly, so shape and bounds are checked first.
    space.validate_points(&x_init)?;
    let y_init = objective.evaluate_batch(&x_init);
    info!(
        function = %config.function,
        initial_points = x_init.len(),
        iterations = config.num_iterations,
        seed = config.optimizer.seed,
        "Starting comparison"
    );

    let mut manual =
        GpBayesianOptimization::new(space.clone(), &x_init, &y_init, &config.optimizer)?;
    run_manual(&mut manual, &*objective, config.num_iterations)?;

    let mut builtin =
        GpBayesianOptimization::new(space.clone(), &x_init, &y_init, &config.optimizer)?;
    builtin.run_optimization(&mut *objective, config.num_iterations)?;

    let truth = (space.dimension() == 1)
        .then(|| true_curve(&*objective, &space, config.grid_points));

    let comparison = Comparison {
        function: config.function,
        parameter_names: space.parameter_names().iter().map(|s| s.to_string()).collect(),
        num_iterations: config.num_iterations,
        initial_count: x_init.len(),
        global_minimum: objective.global_minimum(),
        manual: SampleSet::from_state(manual.loop_state()),
        builtin: SampleSet::from_state(builtin.loop_state()),
        truth,
        generated_at: Utc::now(),
    };

    info!(x = ?comparison.manual.best_x, y = comparison.manual.best_y, "Manual loop best");
    info!(x = ?comparison.builtin.best_x, y = comparison.builtin.best_y, "Built-in loop best");
    if !comparison.runs_agree() {
        warn!("Manual and built-in runs evaluated different points");
    }
    Ok(comparison)
}

fn true_curve(objective: &dyn Benchmark, space: &ParameterSpace, points: usize) -> Curve {
    let (lo, hi) = space.bounds()[0];
    let steps = points.max(2) - 1;
    let x: Vec<f64> = (0..=steps)
        .map(|i| lo + (hi - lo) * i as f64 / steps as f64)
        .collect();
    let y = x.iter().map(|v| objective.evaluate_point(&[*v])).collect();
    Curve { x, y }
}
