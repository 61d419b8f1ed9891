//! # bl-optimizer
//!
//! Gaussian-process Bayesian optimization with two ways of driving it.
//!
//! The outer loop can be stepped by hand with `get_next_points`, evaluating
//! the objective externally and feeding results back, or left to run its
//! own suggest/evaluate/update cycle with `run_loop`. Both paths share the
//! same model, acquisition and seeded optimizer, so for a fixed seed they
//! produce the same samples.

mod acquisition;
mod acquisition_optimizer;
mod design;
mod functions;
mod gp;
mod gp_bayesian_optimization;
mod kernel;
mod local_search;
mod outer_loop;
mod status;
mod stopping;
mod user_function;

pub use acquisition::{
    Acquisition, AcquisitionKind, ExpectedImprovement, NegativeLowerConfidenceBound,
    ProbabilityOfImprovement,
};
pub use acquisition_optimizer::AcquisitionOptimizer;
pub use design::{ExperimentalDesign, GridDesign, LatinDesign, RandomDesign};
pub use functions::{
    branin, forrester, forrester_low, six_hump_camel, Branin, Forrester, ForresterLow,
    SixHumpCamel, TestFunction,
};
pub use gp::{GaussianProcess, Model, NOISELESS_VARIANCE};
pub use gp_bayesian_optimization::{GpBayesianOptimization, GpBoConfig};
pub use kernel::{Kernel, Matern52, Rbf};
pub use local_search::CompassSearch;
pub use outer_loop::{BayesianOptimizationLoop, LoopObserver};
pub use status::{LoopStatus, RunId, RunState};
pub use stopping::{
    AnyStoppingCondition, ConvergenceStoppingCondition, FixedIterationsStoppingCondition,
    StoppingCondition,
};
pub use user_function::{UserFunction, UserFunctionWrapper};
